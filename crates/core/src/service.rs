//! Caller-facing entry point for profile assembly.

use std::sync::Arc;

use log::{info, warn};

use crate::aggregation::{Aggregator, CancellationToken};
use crate::language::Language;
use crate::profiles::{CompositeProfile, ProfileId, SimpleProfile};
use crate::translate::{to_external_error, ExternalError};

/// Validates raw request input, runs the aggregator and translates failures.
#[derive(Clone)]
pub struct ProfileService {
    aggregator: Arc<Aggregator>,
}

impl ProfileService {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self { aggregator }
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    /// Assemble the full profile for `raw_id`.
    ///
    /// `language` defaults to Czech when absent or unrecognized.
    pub async fn assemble_profile(
        &self,
        raw_id: &str,
        language: Option<&str>,
    ) -> Result<CompositeProfile, ExternalError> {
        self.assemble_profile_until(raw_id, language, CancellationToken::new())
            .await
    }

    pub async fn assemble_profile_until(
        &self,
        raw_id: &str,
        language: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<CompositeProfile, ExternalError> {
        let (id, language) = parse_request(raw_id, language)?;
        info!("Profile requested for {} ('{}')", id, language);

        self.aggregator
            .assemble_until(id, language, cancel)
            .await
            .map_err(|e| {
                warn!("Profile {} failed: {}", id, e);
                to_external_error(&e)
            })
    }

    /// Assemble the reduced profile (names, titles, gender) for `raw_id`.
    pub async fn assemble_simple_profile(
        &self,
        raw_id: &str,
        language: Option<&str>,
    ) -> Result<SimpleProfile, ExternalError> {
        let (id, language) = parse_request(raw_id, language)?;
        info!("Simple profile requested for {} ('{}')", id, language);

        self.aggregator
            .assemble_simple(id, language)
            .await
            .map_err(|e| {
                warn!("Simple profile {} failed: {}", id, e);
                to_external_error(&e)
            })
    }
}

fn parse_request(
    raw_id: &str,
    language: Option<&str>,
) -> Result<(ProfileId, Language), ExternalError> {
    let id = raw_id.parse::<ProfileId>().map_err(|e| to_external_error(&e))?;
    Ok((id, Language::parse_or_default(language)))
}

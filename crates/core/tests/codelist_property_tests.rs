//! Property-based tests for codelist batch resolution.
//!
//! These tests verify that completeness holds across arbitrary batches,
//! using the `proptest` crate for random test case generation.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use campus_core::codelist::{CodeKey, CodelistEntry, CodelistResolver, CodelistService};
use campus_core::{Error, Language};
use campus_remote::{RetryPolicy, SourceClientConfig};
use common::FakeCodelist;
use proptest::prelude::*;

// =============================================================================
// Generators
// =============================================================================

/// Generates a codelist domain from the ones the profile uses.
fn arb_domain() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("TITUL_PRED"),
        Just("TITUL_ZA"),
        Just("POHLAVI"),
        Just("STAV"),
        Just("CIS_BANK"),
    ]
}

fn arb_key() -> impl Strategy<Value = CodeKey> {
    (arb_domain(), "[A-Z0-9]{1,4}").prop_map(|(domain, code)| CodeKey::new(domain, code))
}

/// Distinct keys, each flagged as stored (true) or missing (false).
fn arb_batch() -> impl Strategy<Value = Vec<(CodeKey, bool)>> {
    prop::collection::btree_set(arb_key(), 1..20).prop_flat_map(|keys| {
        let len = keys.len();
        (
            Just(keys.into_iter().collect::<Vec<_>>()),
            prop::collection::vec(any::<bool>(), len),
        )
            .prop_map(|(keys, stored)| keys.into_iter().zip(stored).collect())
    })
}

// =============================================================================
// Helpers
// =============================================================================

fn stored_entries(batch: &[(CodeKey, bool)]) -> Vec<CodelistEntry> {
    batch
        .iter()
        .filter(|(_, stored)| *stored)
        .map(|(key, _)| CodelistEntry {
            key: key.clone(),
            meaning_cs: Some(format!("{} cs", key.code)),
            meaning_en: None,
            abbreviation: None,
        })
        .collect()
}

fn missing_keys(batch: &[(CodeKey, bool)]) -> BTreeSet<CodeKey> {
    batch
        .iter()
        .filter(|(_, stored)| !*stored)
        .map(|(key, _)| key.clone())
        .collect()
}

fn resolve(batch: &[(CodeKey, bool)], request: &[CodeKey]) -> campus_core::Result<usize> {
    let source = Arc::new(FakeCodelist::new(stored_entries(batch)));
    let config = SourceClientConfig {
        retry: RetryPolicy::none(),
        ..SourceClientConfig::default()
    };
    let resolver = CodelistResolver::new(source, &config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let meanings = resolver.resolve_batch(request, Language::En).await?;
        for key in request {
            assert_eq!(meanings.get(key), Some(format!("{} cs", key.code).as_str()));
        }
        Ok(meanings.len())
    })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// For N requested keys with M stored, exactly the N-M missing keys are reported.
    #[test]
    fn prop_reports_exactly_missing_keys(batch in arb_batch()) {
        let request: Vec<CodeKey> = batch.iter().map(|(key, _)| key.clone()).collect();
        let missing = missing_keys(&batch);

        match resolve(&batch, &request) {
            Ok(resolved) => {
                prop_assert!(missing.is_empty());
                prop_assert_eq!(resolved, request.len());
            }
            Err(Error::MissingCodelistEntries(reported)) => {
                prop_assert!(!missing.is_empty());
                prop_assert_eq!(reported, missing);
            }
            Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
        }
    }

    /// Repeating stored keys in a request cannot hide a missing one.
    #[test]
    fn prop_duplicates_do_not_mask_missing_keys(
        batch in arb_batch(),
        repeats in 1usize..4,
    ) {
        let missing = missing_keys(&batch);
        let mut request = Vec::new();
        for (key, stored) in &batch {
            let copies = if *stored { repeats + 1 } else { 1 };
            request.extend(std::iter::repeat(key.clone()).take(copies));
        }

        match resolve(&batch, &request) {
            Ok(_) => prop_assert!(missing.is_empty()),
            Err(Error::MissingCodelistEntries(reported)) => prop_assert_eq!(reported, missing),
            Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
        }
    }

    /// A key never resolves to more than one meaning, whatever the request order.
    #[test]
    fn prop_resolution_is_order_independent(batch in arb_batch()) {
        let stored: Vec<(CodeKey, bool)> =
            batch.iter().filter(|(_, s)| *s).cloned().collect();
        prop_assume!(!stored.is_empty());

        let forward: Vec<CodeKey> = stored.iter().map(|(k, _)| k.clone()).collect();
        let mut backward = forward.clone();
        backward.reverse();

        prop_assert_eq!(
            resolve(&stored, &forward).ok(),
            resolve(&stored, &backward).ok()
        );
    }
}

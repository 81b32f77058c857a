use std::time::Duration;

use campus_remote::config::env_millis;
use campus_remote::SourceClientConfig;

/// Default deadline for the local person store read.
const DEFAULT_LOCAL_DEADLINE: Duration = Duration::from_millis(500);

/// Default deadline for one whole aggregation, both phases included.
const DEFAULT_OVERALL_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct AggregatorConfig {
    /// Per-attempt deadline for the local store.
    pub local_deadline: Duration,
    /// Hard limit for a whole aggregation.
    pub overall_deadline: Duration,
    /// Settings for remote source and codelist clients.
    pub remote: SourceClientConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            local_deadline: DEFAULT_LOCAL_DEADLINE,
            overall_deadline: DEFAULT_OVERALL_DEADLINE,
            remote: SourceClientConfig::default(),
        }
    }
}

impl AggregatorConfig {
    /// Reads `CAMPUS_LOCAL_DEADLINE_MS` and `CAMPUS_AGGREGATION_DEADLINE_MS`,
    /// plus everything [`SourceClientConfig::from_env`] reads.
    pub fn from_env() -> Self {
        Self {
            local_deadline: env_millis("CAMPUS_LOCAL_DEADLINE_MS", DEFAULT_LOCAL_DEADLINE),
            overall_deadline: env_millis(
                "CAMPUS_AGGREGATION_DEADLINE_MS",
                DEFAULT_OVERALL_DEADLINE,
            ),
            remote: SourceClientConfig::from_env(),
        }
    }
}

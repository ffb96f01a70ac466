use std::time::Duration;

use envconfig::Envconfig;

use crate::executor::ScatterGatherOptions;

/// Environment-driven scatter-gather defaults.
///
/// `SHARDWAY_SG_MAX_PARALLELISM <= 0` means unlimited.
#[derive(Envconfig, Clone, Debug)]
pub struct ScatterGatherConfig {
    #[envconfig(from = "SHARDWAY_SG_MAX_PARALLELISM", default = "-1")]
    pub max_parallelism: i64,
    #[envconfig(from = "SHARDWAY_SG_TIMEOUT_MS", default = "30000")]
    pub timeout_ms: u64,
    #[envconfig(from = "SHARDWAY_SG_ALLOW_PARTIAL", default = "true")]
    pub allow_partial_results: bool,
}

impl ScatterGatherConfig {
    pub fn into_options(self) -> ScatterGatherOptions {
        ScatterGatherOptions {
            max_parallelism: if self.max_parallelism > 0 {
                Some(self.max_parallelism as usize)
            } else {
                None
            },
            timeout: Duration::from_millis(self.timeout_ms),
            allow_partial_results: self.allow_partial_results,
        }
    }
}

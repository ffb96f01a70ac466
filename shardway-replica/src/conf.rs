use std::time::Duration;

use envconfig::Envconfig;

use crate::router::ReplicaOptions;

/// Environment-driven replica selection defaults.
#[derive(Envconfig, Clone, Debug)]
pub struct ReplicaConfig {
    #[envconfig(from = "SHARDWAY_REPLICA_RECOVERY_DELAY_MS", default = "30000")]
    pub recovery_delay_ms: u64,
    #[envconfig(from = "SHARDWAY_REPLICA_MAX_STALENESS_MS")]
    pub max_staleness_ms: Option<u64>,
    #[envconfig(from = "SHARDWAY_REPLICA_FALLBACK_PRIMARY", default = "true")]
    pub fallback_to_primary_when_no_replicas: bool,
    #[envconfig(from = "SHARDWAY_REPLICA_FALLBACK_PRIMARY_STALE", default = "true")]
    pub fallback_to_primary_when_stale: bool,
}

impl ReplicaConfig {
    /// Recovery delay for the health tracker.
    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }

    pub fn into_options(self) -> ReplicaOptions {
        ReplicaOptions {
            max_staleness: self.max_staleness_ms.map(Duration::from_millis),
            fallback_to_primary_when_no_replicas: self
                .fallback_to_primary_when_no_replicas,
            fallback_to_primary_when_stale: self.fallback_to_primary_when_stale,
        }
    }
}

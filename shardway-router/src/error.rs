use std::error::Error;

use shardway_models::ShardId;

/// Routing errors
///
/// Construction-time validation (`InvalidRanges`, `FallbackCycle`,
/// `InvalidConfiguration`) and resolve-time lookups share one taxonomy so
/// callers can pattern-match without downcasting. Every variant carries a
/// stable string code for logging and telemetry.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("Shard key cannot be empty")]
    EmptyShardKey,
    #[error("Shard `{0}` not found")]
    ShardNotFound(ShardId),
    #[error("No active shard in topology")]
    NoActiveShards,
    #[error("No range matches key `{0}`")]
    NoMatchingRange(String),
    #[error("Region `{0}` not found")]
    RegionNotFound(String),
    #[error("Composite key `{key}` splits into {found} parts, expected {expected}")]
    CompositeKeyMismatch {
        key: String,
        expected: usize,
        found: usize,
    },
    #[error("Invalid range configuration: {0}")]
    InvalidRanges(String),
    #[error("Geo fallback cycle: {0}")]
    FallbackCycle(String),
    #[error("Invalid router configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Directory store error: {0}")]
    Store(#[from] Box<dyn Error + Send + Sync + 'static>),
}

impl RoutingError {
    pub fn code(&self) -> &'static str {
        match self {
            RoutingError::EmptyShardKey => "shard_key_empty",
            RoutingError::ShardNotFound(_) => "shard_not_found",
            RoutingError::NoActiveShards => "no_active_shards",
            RoutingError::NoMatchingRange(_) => "range_not_matched",
            RoutingError::RegionNotFound(_) => "region_not_found",
            RoutingError::CompositeKeyMismatch { .. } => "composite_key_mismatch",
            RoutingError::InvalidRanges(_) => "range_config_invalid",
            RoutingError::FallbackCycle(_) => "geo_fallback_cycle",
            RoutingError::InvalidConfiguration(_) => "router_config_invalid",
            RoutingError::Store(_) => "directory_store_error",
        }
    }
}

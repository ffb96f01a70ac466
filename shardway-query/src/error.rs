use std::time::Duration;

use crate::outcome::ShardFailure;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Per-shard query failure, recorded in the outcome's `failed_shards`.
#[derive(Debug, thiserror::Error)]
pub enum ShardQueryError {
    #[error("shard query failed: {0}")]
    Query(#[source] BoxError),
    #[error("shard query timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
    #[error("shard query cancelled")]
    Cancelled,
    #[error("shard query panicked: {0}")]
    Panicked(String),
}

impl ShardQueryError {
    pub fn code(&self) -> &'static str {
        match self {
            ShardQueryError::Query(_) => "shard_query_failed",
            ShardQueryError::Timeout { .. } => "scatter_gather_timeout",
            ShardQueryError::Cancelled => "scatter_gather_cancelled",
            ShardQueryError::Panicked(_) => "shard_query_panicked",
        }
    }
}

/// Whole-operation failure.
///
/// Raised only under `allow_partial_results = false`: a single aggregated
/// error so callers handle the operation as all-or-nothing. It carries the
/// per-shard failures and counts for inspection, never the partial data.
#[derive(Debug, thiserror::Error)]
pub enum ScatterGatherError {
    #[error("{} of {total} shard queries failed", .failures.len())]
    PartialFailure {
        total: usize,
        succeeded: usize,
        failures: Vec<ShardFailure>,
    },
}

impl ScatterGatherError {
    pub fn code(&self) -> &'static str {
        match self {
            ScatterGatherError::PartialFailure { .. } => {
                "scatter_gather_partial_failure"
            }
        }
    }
}

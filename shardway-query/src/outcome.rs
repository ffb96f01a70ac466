use std::time::Duration;

use shardway_models::ShardId;

use crate::error::ShardQueryError;

/// One shard's successful result. Item order is exactly what the shard's
/// query closure returned.
#[derive(Debug)]
pub struct ShardResult<T> {
    pub shard_id: ShardId,
    pub items: Vec<T>,
}

#[derive(Debug)]
pub struct ShardFailure {
    pub shard_id: ShardId,
    pub error: ShardQueryError,
}

/// Result of one scatter-gather call, frozen once execution finishes.
///
/// `successful_shards` carries no cross-shard ordering guarantee; shards
/// appear in completion order.
#[derive(Debug)]
pub struct ScatterGatherOutcome<T> {
    pub successful_shards: Vec<ShardResult<T>>,
    pub failed_shards: Vec<ShardFailure>,
    pub elapsed: Duration,
}

impl<T> ScatterGatherOutcome<T> {
    /// Every targeted shard succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed_shards.is_empty()
    }

    /// Some but not all shards failed.
    pub fn is_partial(&self) -> bool {
        !self.failed_shards.is_empty() && !self.successful_shards.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.successful_shards.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed_shards.len()
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.successful_shards.iter().flat_map(|s| s.items.iter())
    }

    pub fn into_items(self) -> Vec<T> {
        self.successful_shards
            .into_iter()
            .flat_map(|s| s.items)
            .collect()
    }
}

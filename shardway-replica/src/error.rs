use shardway_models::ShardId;

/// Why replica selection fell back (or would have fallen back) to the
/// primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    NoReplicas,
    AllUnhealthy,
    AllStale,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::NoReplicas => "no_replicas",
            FallbackReason::AllUnhealthy => "all_unhealthy",
            FallbackReason::AllStale => "all_stale",
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReplicaError {
    #[error("no healthy replica for shard `{shard_id}` ({reason})")]
    NoHealthyReplica {
        shard_id: ShardId,
        reason: FallbackReason,
    },
    #[error("replica weights must sum to a positive total")]
    InvalidWeights,
}

impl ReplicaError {
    pub fn code(&self) -> &'static str {
        match self {
            ReplicaError::NoHealthyReplica { .. } => "no_healthy_replica",
            ReplicaError::InvalidWeights => "replica_weights_invalid",
        }
    }
}

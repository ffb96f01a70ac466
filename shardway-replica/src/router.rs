//! Replica routing: health filter, staleness filter, strategy pick, and
//! the primary fallback with observable counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shardway_models::ShardId;
use tracing::{debug, warn};

use crate::error::{FallbackReason, ReplicaError};
use crate::health::ReplicaHealthTracker;
use crate::selector::ReplicaSelector;
use crate::ReplicaId;

/// One shard's read endpoints: the primary connection target plus its
/// read replicas.
#[derive(Debug, Clone)]
pub struct ShardReplicas {
    pub shard_id: ShardId,
    pub primary_target: String,
    pub replicas: Vec<ReplicaId>,
}

impl ShardReplicas {
    pub fn new(
        shard_id: impl Into<ShardId>,
        primary_target: impl Into<String>,
        replicas: Vec<ReplicaId>,
    ) -> Self {
        Self {
            shard_id: shard_id.into(),
            primary_target: primary_target.into(),
            replicas,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaChoice {
    Replica(ReplicaId),
    /// Read redirected to the primary connection target
    Primary { reason: FallbackReason },
}

#[derive(Debug, Clone)]
pub struct ReplicaOptions {
    /// Global staleness ceiling; `None` disables lag filtering
    pub max_staleness: Option<Duration>,
    pub fallback_to_primary_when_no_replicas: bool,
    pub fallback_to_primary_when_stale: bool,
}

impl Default for ReplicaOptions {
    fn default() -> Self {
        Self {
            max_staleness: None,
            fallback_to_primary_when_no_replicas: true,
            fallback_to_primary_when_stale: true,
        }
    }
}

impl ReplicaOptions {
    pub fn with_max_staleness(mut self, threshold: Duration) -> Self {
        self.max_staleness = Some(threshold);
        self
    }

    pub fn no_primary_fallback(mut self) -> Self {
        self.fallback_to_primary_when_no_replicas = false;
        self.fallback_to_primary_when_stale = false;
        self
    }
}

/// Fallback-to-primary counters, one per reason, for the telemetry layer
/// to export.
#[derive(Debug, Default)]
pub struct FallbackCounters {
    no_replicas: AtomicU64,
    all_unhealthy: AtomicU64,
    all_stale: AtomicU64,
}

impl FallbackCounters {
    fn record(&self, reason: FallbackReason) {
        let counter = match reason {
            FallbackReason::NoReplicas => &self.no_replicas,
            FallbackReason::AllUnhealthy => &self.all_unhealthy,
            FallbackReason::AllStale => &self.all_stale,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, reason: FallbackReason) -> u64 {
        match reason {
            FallbackReason::NoReplicas => self.no_replicas.load(Ordering::Relaxed),
            FallbackReason::AllUnhealthy => {
                self.all_unhealthy.load(Ordering::Relaxed)
            }
            FallbackReason::AllStale => self.all_stale.load(Ordering::Relaxed),
        }
    }
}

pub struct ReplicaRouter {
    tracker: Arc<ReplicaHealthTracker>,
    strategy: Arc<dyn ReplicaSelector>,
    options: ReplicaOptions,
    fallbacks: FallbackCounters,
}

impl ReplicaRouter {
    pub fn new(
        tracker: Arc<ReplicaHealthTracker>,
        strategy: Arc<dyn ReplicaSelector>,
        options: ReplicaOptions,
    ) -> Self {
        Self {
            tracker,
            strategy,
            options,
            fallbacks: FallbackCounters::default(),
        }
    }

    pub fn tracker(&self) -> &Arc<ReplicaHealthTracker> {
        &self.tracker
    }

    pub fn fallbacks(&self) -> &FallbackCounters {
        &self.fallbacks
    }

    pub fn select(&self, shard: &ShardReplicas) -> Result<ReplicaChoice, ReplicaError> {
        self.select_with_staleness(shard, None)
    }

    /// Select a read replica, with an optional per-query staleness bound
    /// overriding the globally configured one.
    pub fn select_with_staleness(
        &self,
        shard: &ShardReplicas,
        staleness_override: Option<Duration>,
    ) -> Result<ReplicaChoice, ReplicaError> {
        let reason = match self.pick(shard, staleness_override) {
            Ok(replica) => {
                debug!(shard = %shard.shard_id, replica = %replica, "replica selected");
                return Ok(ReplicaChoice::Replica(replica));
            }
            Err(reason) => reason,
        };

        let fallback_allowed = match reason {
            FallbackReason::AllStale => self.options.fallback_to_primary_when_stale,
            _ => self.options.fallback_to_primary_when_no_replicas,
        };
        if fallback_allowed {
            self.fallbacks.record(reason);
            warn!(
                shard = %shard.shard_id,
                reason = reason.as_str(),
                "falling back to primary for read"
            );
            Ok(ReplicaChoice::Primary { reason })
        } else {
            Err(ReplicaError::NoHealthyReplica {
                shard_id: shard.shard_id.clone(),
                reason,
            })
        }
    }

    fn pick(
        &self,
        shard: &ShardReplicas,
        staleness_override: Option<Duration>,
    ) -> Result<ReplicaId, FallbackReason> {
        if shard.replicas.is_empty() {
            return Err(FallbackReason::NoReplicas);
        }
        let healthy =
            self.tracker
                .eligible_replicas(&shard.shard_id, &shard.replicas, None);
        if healthy.is_empty() {
            return Err(FallbackReason::AllUnhealthy);
        }
        let threshold = staleness_override.or(self.options.max_staleness);
        let fresh = self
            .tracker
            .eligible_replicas(&shard.shard_id, &healthy, threshold);
        if fresh.is_empty() {
            return Err(FallbackReason::AllStale);
        }
        self.strategy
            .select(&fresh)
            .ok_or(FallbackReason::AllUnhealthy)
    }
}

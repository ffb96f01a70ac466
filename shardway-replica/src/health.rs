//! Per-replica health state.
//!
//! State transitions come from explicit reports at the call site; the
//! tracker never probes anything itself. Recovery is time-gated: an
//! unhealthy replica becomes eligible again once the recovery delay has
//! elapsed since it was marked unhealthy, with no `mark_healthy` required.
//! The gate keeps an intermittently failing replica from flapping in and
//! out of rotation on every report.

use std::time::{Duration, Instant};

use shardway_models::ShardId;
use tracing::debug;

use crate::ReplicaId;

#[derive(Debug, Clone)]
pub struct ReplicaHealth {
    pub is_healthy: bool,
    pub last_replication_lag: Option<Duration>,
    pub marked_unhealthy_at: Option<Instant>,
}

impl Default for ReplicaHealth {
    fn default() -> Self {
        Self {
            is_healthy: true,
            last_replication_lag: None,
            marked_unhealthy_at: None,
        }
    }
}

/// Concurrent health registry keyed by `(shard_id, replica_id)`.
///
/// Internally synchronized; callers share it behind an `Arc` without
/// additional locking.
pub struct ReplicaHealthTracker {
    states: scc::HashMap<(ShardId, ReplicaId), ReplicaHealth>,
    recovery_delay: Duration,
}

impl ReplicaHealthTracker {
    pub fn new(recovery_delay: Duration) -> Self {
        Self {
            states: scc::HashMap::new(),
            recovery_delay,
        }
    }

    pub fn recovery_delay(&self) -> Duration {
        self.recovery_delay
    }

    pub fn mark_healthy(&self, shard_id: &str, replica_id: &str) {
        self.update_state(shard_id, replica_id, |state| {
            state.is_healthy = true;
            state.marked_unhealthy_at = None;
        });
    }

    pub fn mark_unhealthy(&self, shard_id: &str, replica_id: &str) {
        debug!(shard = shard_id, replica = replica_id, "replica marked unhealthy");
        // Repeated failure reports refresh the timestamp, pushing recovery
        // out again.
        self.update_state(shard_id, replica_id, |state| {
            state.is_healthy = false;
            state.marked_unhealthy_at = Some(Instant::now());
        });
    }

    pub fn report_replication_lag(&self, shard_id: &str, replica_id: &str, lag: Duration) {
        self.update_state(shard_id, replica_id, |state| {
            state.last_replication_lag = Some(lag);
        });
    }

    /// Point-in-time copy of a replica's state, if any report was made.
    pub fn health(&self, shard_id: &str, replica_id: &str) -> Option<ReplicaHealth> {
        self.states.read(
            &(shard_id.to_owned(), replica_id.to_owned()),
            |_, state| state.clone(),
        )
    }

    pub fn is_eligible(
        &self,
        shard_id: &str,
        replica_id: &str,
        max_staleness: Option<Duration>,
    ) -> bool {
        self.is_eligible_at(shard_id, replica_id, max_staleness, Instant::now())
    }

    fn is_eligible_at(
        &self,
        shard_id: &str,
        replica_id: &str,
        max_staleness: Option<Duration>,
        now: Instant,
    ) -> bool {
        let Some(state) = self.health(shard_id, replica_id) else {
            // Never reported on: healthy by default.
            return true;
        };
        if !state.is_healthy {
            let recovered = state
                .marked_unhealthy_at
                .map(|at| now.duration_since(at) >= self.recovery_delay)
                .unwrap_or(true);
            if !recovered {
                return false;
            }
        }
        match (max_staleness, state.last_replication_lag) {
            (Some(threshold), Some(lag)) => lag <= threshold,
            // No threshold, or no lag ever reported: not excluded.
            _ => true,
        }
    }

    fn update_state(
        &self,
        shard_id: &str,
        replica_id: &str,
        apply: impl FnOnce(&mut ReplicaHealth),
    ) {
        let mut entry = self
            .states
            .entry((shard_id.to_owned(), replica_id.to_owned()))
            .or_insert_with(ReplicaHealth::default);
        apply(entry.get_mut());
    }

    /// Filter `candidates` down to the replicas eligible for reads.
    pub fn eligible_replicas(
        &self,
        shard_id: &str,
        candidates: &[ReplicaId],
        max_staleness: Option<Duration>,
    ) -> Vec<ReplicaId> {
        let now = Instant::now();
        candidates
            .iter()
            .filter(|replica| {
                self.is_eligible_at(shard_id, replica, max_staleness, now)
            })
            .cloned()
            .collect()
    }
}

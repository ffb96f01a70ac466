//! Selection strategies over a pre-filtered candidate list.
//!
//! Candidates arrive already filtered for health and staleness (see
//! [`crate::router::ReplicaRouter`]); a strategy only decides which of
//! them takes the next read. Every strategy is safe under concurrent
//! selection from multiple threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rand::Rng;

use crate::error::ReplicaError;
use crate::ReplicaId;

pub trait ReplicaSelector: Send + Sync {
    fn select(&self, candidates: &[ReplicaId]) -> Option<ReplicaId>;
}

/// Strict even distribution via an atomically incremented counter.
#[derive(Default)]
pub struct RoundRobinSelector {
    counter: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplicaSelector for RoundRobinSelector {
    fn select(&self, candidates: &[ReplicaId]) -> Option<ReplicaId> {
        if candidates.is_empty() {
            return None;
        }
        let turn = self.counter.fetch_add(1, Ordering::Relaxed);
        Some(candidates[turn % candidates.len()].clone())
    }
}

/// Uniformly random pick per call.
#[derive(Default)]
pub struct RandomSelector;

impl RandomSelector {
    pub fn new() -> Self {
        Self
    }
}

impl ReplicaSelector for RandomSelector {
    fn select(&self, candidates: &[ReplicaId]) -> Option<ReplicaId> {
        if candidates.is_empty() {
            return None;
        }
        let idx = rand::rng().random_range(0..candidates.len());
        Some(candidates[idx].clone())
    }
}

/// Lowest observed latency wins, smoothed by an exponential moving
/// average. Until any candidate has a sample, selection degrades to
/// round-robin so cold starts still spread load.
pub struct LeastLatencySelector {
    alpha: f64,
    ema_ms: scc::HashMap<ReplicaId, f64>,
    cold_start: RoundRobinSelector,
}

impl Default for LeastLatencySelector {
    fn default() -> Self {
        Self::new()
    }
}

impl LeastLatencySelector {
    pub fn new() -> Self {
        Self {
            alpha: 0.3,
            ema_ms: scc::HashMap::new(),
            cold_start: RoundRobinSelector::new(),
        }
    }

    /// Feed an observed query latency for a replica.
    pub fn record_latency(&self, replica_id: &str, sample: Duration) {
        let sample_ms = sample.as_secs_f64() * 1_000.0;
        let alpha = self.alpha;
        self.ema_ms
            .entry(replica_id.to_owned())
            .and_modify(|ema| *ema = alpha * sample_ms + (1.0 - alpha) * *ema)
            .or_insert(sample_ms);
    }

    fn ema_of(&self, replica_id: &str) -> Option<f64> {
        self.ema_ms.read(replica_id, |_, ema| *ema)
    }
}

impl ReplicaSelector for LeastLatencySelector {
    fn select(&self, candidates: &[ReplicaId]) -> Option<ReplicaId> {
        let best = candidates
            .iter()
            .filter_map(|replica| self.ema_of(replica).map(|ema| (replica, ema)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(replica, _)| replica.clone());
        match best {
            Some(replica) => Some(replica),
            None => self.cold_start.select(candidates),
        }
    }
}

/// Fewest live connections wins. The caller brackets every checkout with
/// `acquire`/`release`.
#[derive(Default)]
pub struct LeastConnectionsSelector {
    live: scc::HashMap<ReplicaId, u64>,
}

impl LeastConnectionsSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, replica_id: &str) {
        let mut entry = self.live.entry(replica_id.to_owned()).or_insert(0);
        *entry.get_mut() += 1;
    }

    pub fn release(&self, replica_id: &str) {
        self.live.update(replica_id, |_, count| {
            *count = count.saturating_sub(1);
        });
    }

    pub fn live_connections(&self, replica_id: &str) -> u64 {
        self.live.read(replica_id, |_, count| *count).unwrap_or(0)
    }
}

impl ReplicaSelector for LeastConnectionsSelector {
    fn select(&self, candidates: &[ReplicaId]) -> Option<ReplicaId> {
        candidates
            .iter()
            .min_by_key(|replica| self.live_connections(replica))
            .cloned()
    }
}

/// Traffic share proportional to configured weight: cumulative prefix sums
/// precomputed at construction, binary search on a scaled uniform draw.
pub struct WeightedRandomSelector {
    replicas: Vec<ReplicaId>,
    cumulative: Vec<u64>,
    total: u64,
}

impl WeightedRandomSelector {
    pub fn new(weights: Vec<(ReplicaId, u32)>) -> Result<Self, ReplicaError> {
        let mut replicas = Vec::with_capacity(weights.len());
        let mut cumulative = Vec::with_capacity(weights.len());
        let mut total = 0u64;
        for (replica_id, weight) in weights {
            total += weight as u64;
            replicas.push(replica_id);
            cumulative.push(total);
        }
        if total == 0 {
            return Err(ReplicaError::InvalidWeights);
        }
        Ok(Self {
            replicas,
            cumulative,
            total,
        })
    }

    fn weight_of(&self, replica_id: &str) -> u64 {
        match self.replicas.iter().position(|r| r == replica_id) {
            Some(0) => self.cumulative[0],
            Some(idx) => self.cumulative[idx] - self.cumulative[idx - 1],
            // Unknown replicas still get a share.
            None => 1,
        }
    }
}

impl ReplicaSelector for WeightedRandomSelector {
    fn select(&self, candidates: &[ReplicaId]) -> Option<ReplicaId> {
        if candidates.is_empty() {
            return None;
        }
        let full_set = candidates.len() == self.replicas.len()
            && candidates.iter().zip(&self.replicas).all(|(c, r)| c == r);
        if full_set {
            let draw = rand::rng().random_range(0..self.total);
            let idx = self.cumulative.partition_point(|&c| c <= draw);
            return Some(self.replicas[idx].clone());
        }
        // Filtered subset: rebuild the prefix over the subset for this call.
        let mut cumulative = Vec::with_capacity(candidates.len());
        let mut total = 0u64;
        for replica in candidates {
            total += self.weight_of(replica);
            cumulative.push(total);
        }
        let draw = rand::rng().random_range(0..total);
        let idx = cumulative.partition_point(|&c| c <= draw);
        Some(candidates[idx].clone())
    }
}

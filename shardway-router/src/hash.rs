//! Consistent-hash routing.
//!
//! The ring holds `virtual_nodes_per_shard * weight` entries per active
//! shard, positioned by xxHash64 of `"{shard_id}-{vnode_index}"`. Lookup is
//! a binary search for the first entry at or past the key's hash, wrapping
//! to the first entry. Adding or removing one shard moves roughly 1/N of
//! the keyspace instead of reshuffling everything.

use std::sync::Arc;

use shardway_models::{ShardId, ShardTopology};
use tracing::debug;
use twox_hash::XxHash64;

use crate::conf::HashRouterConfig;
use crate::error::RoutingError;
use crate::ShardResolver;

const RING_SEED: u64 = 0;

#[derive(Debug, Clone)]
pub(crate) struct RingEntry {
    pub position: u64,
    pub shard_id: ShardId,
}

/// Sorted virtual-node ring, built once per topology.
#[derive(Debug, Clone)]
pub struct HashRing {
    entries: Vec<RingEntry>,
}

impl HashRing {
    pub fn build(
        topology: &ShardTopology,
        conf: &HashRouterConfig,
    ) -> Result<Self, RoutingError> {
        let mut entries = Vec::new();
        for shard in topology.active_shards() {
            let vnode_count = conf.virtual_nodes_per_shard * shard.weight;
            for vnode in 0..vnode_count {
                entries.push(RingEntry {
                    position: hash64(&format!("{}-{}", shard.id, vnode)),
                    shard_id: shard.id.clone(),
                });
            }
        }
        if entries.is_empty() {
            return Err(RoutingError::NoActiveShards);
        }
        // Tie-break position collisions by shard id so the ring order is
        // identical across rebuilds.
        entries.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.shard_id.cmp(&b.shard_id))
        });
        Ok(Self { entries })
    }

    /// Map a raw ring position to its owning shard.
    pub fn locate(&self, point: u64) -> &ShardId {
        let idx = self.entries.partition_point(|e| e.position < point);
        let idx = if idx == self.entries.len() { 0 } else { idx };
        &self.entries[idx].shard_id
    }

    /// Ring position of a shard key.
    pub fn key_position(key: &str) -> u64 {
        hash64(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn positions(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|e| e.position)
    }
}

fn hash64(input: &str) -> u64 {
    XxHash64::oneshot(RING_SEED, input.as_bytes())
}

/// Consistent-hash router over an immutable topology snapshot.
#[derive(Debug)]
pub struct HashRouter {
    ring: HashRing,
    topology: Arc<ShardTopology>,
}

impl HashRouter {
    pub fn new(topology: Arc<ShardTopology>) -> Result<Self, RoutingError> {
        Self::with_config(topology, &HashRouterConfig::default())
    }

    pub fn with_config(
        topology: Arc<ShardTopology>,
        conf: &HashRouterConfig,
    ) -> Result<Self, RoutingError> {
        let ring = HashRing::build(&topology, conf)?;
        debug!(
            shards = topology.len(),
            virtual_nodes = ring.len(),
            "built hash ring"
        );
        Ok(Self { ring, topology })
    }

    pub fn resolve(&self, shard_key: &str) -> Result<ShardId, RoutingError> {
        if shard_key.is_empty() {
            return Err(RoutingError::EmptyShardKey);
        }
        let shard_id = self.ring.locate(HashRing::key_position(shard_key));
        debug!(router = "hash", key = shard_key, shard = %shard_id, "resolved");
        Ok(shard_id.clone())
    }

    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    pub fn topology(&self) -> &Arc<ShardTopology> {
        &self.topology
    }
}

#[async_trait::async_trait]
impl ShardResolver for HashRouter {
    async fn resolve(&self, shard_key: &str) -> Result<ShardId, RoutingError> {
        HashRouter::resolve(self, shard_key)
    }
}

//! Rebalance planning for the hash router.
//!
//! Compares the rings of two topologies and reports the ring arcs whose
//! ownership changes. Planning only: nothing here moves data, an external
//! migration process consumes the ranges.

use shardway_models::{ShardId, ShardTopology};
use tracing::debug;

use crate::conf::HashRouterConfig;
use crate::error::RoutingError;
use crate::hash::HashRing;

/// One ring arc that changes ownership between two topologies.
///
/// Covers the positions in `(ring_start, ring_end]`, wrapping past
/// `u64::MAX`. Keys whose hash lands in the arc must migrate from
/// `previous_shard_id` to `new_shard_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffectedRange {
    pub ring_start: u64,
    pub ring_end: u64,
    pub previous_shard_id: ShardId,
    pub new_shard_id: ShardId,
}

impl AffectedRange {
    pub fn contains_position(&self, position: u64) -> bool {
        if self.ring_start == self.ring_end {
            // Degenerate full-circle arc.
            return true;
        }
        if self.ring_start < self.ring_end {
            position > self.ring_start && position <= self.ring_end
        } else {
            position > self.ring_start || position <= self.ring_end
        }
    }
}

/// Compute the ring arcs that change ownership between `old` and `new`.
///
/// Walks the union of both rings' virtual-node positions in ring order.
/// Between two consecutive union positions neither ring has an entry, so
/// each arc has a single owner per ring; arcs whose owners differ are
/// emitted, with adjacent arcs sharing the same ownership change coalesced.
pub fn calculate_affected_key_ranges(
    old: &ShardTopology,
    new: &ShardTopology,
    conf: &HashRouterConfig,
) -> Result<Vec<AffectedRange>, RoutingError> {
    let old_ring = HashRing::build(old, conf)?;
    let new_ring = HashRing::build(new, conf)?;

    let mut positions: Vec<u64> =
        old_ring.positions().chain(new_ring.positions()).collect();
    positions.sort_unstable();
    positions.dedup();

    let mut moves: Vec<AffectedRange> = Vec::new();
    let count = positions.len();
    for i in 0..count {
        let end = positions[i];
        let start = if i == 0 {
            positions[count - 1]
        } else {
            positions[i - 1]
        };
        let previous_owner = old_ring.locate(end);
        let new_owner = new_ring.locate(end);
        if previous_owner == new_owner {
            continue;
        }
        // Extend the previous arc when it is contiguous and moves the same
        // ownership pair.
        if let Some(last) = moves.last_mut() {
            if last.ring_end == start
                && last.previous_shard_id == *previous_owner
                && last.new_shard_id == *new_owner
            {
                last.ring_end = end;
                continue;
            }
        }
        moves.push(AffectedRange {
            ring_start: start,
            ring_end: end,
            previous_shard_id: previous_owner.clone(),
            new_shard_id: new_owner.clone(),
        });
    }
    debug!(
        affected = moves.len(),
        union_positions = count,
        "computed rebalance plan"
    );
    Ok(moves)
}

//! Shard routing: map a shard key to the shard that owns it.
//!
//! Five router variants share one contract: given a non-empty shard key,
//! deterministically return exactly one active shard id or a typed
//! [`RoutingError`]. Routers capture their topology at construction and the
//! built structures (ring, sorted ranges, region graph) are immutable, so
//! concurrent resolution needs no locking. Topology changes construct a new
//! router against the replacement topology.

pub mod compound;
pub mod conf;
pub mod directory;
pub mod error;
pub mod geo;
pub mod hash;
pub mod range;
pub mod rebalance;

pub use compound::CompoundRouter;
pub use conf::HashRouterConfig;
pub use directory::{DirectoryRouter, DirectoryStore, InMemoryDirectoryStore};
pub use error::RoutingError;
pub use geo::{GeoRegion, GeoRouter};
pub use hash::{HashRing, HashRouter};
pub use range::{RangeRouter, ShardRange};
pub use rebalance::{calculate_affected_key_ranges, AffectedRange};

use shardway_models::ShardId;

/// Capability shared by every router variant.
///
/// Async because the directory variant may consult a remote key-value
/// store; the pure variants resolve synchronously and also expose inherent
/// sync `resolve` methods.
#[async_trait::async_trait]
pub trait ShardResolver: Send + Sync {
    async fn resolve(&self, shard_key: &str) -> Result<ShardId, RoutingError>;
}

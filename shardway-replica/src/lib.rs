//! Read-replica selection per shard.
//!
//! A [`ReplicaHealthTracker`] holds the mutable health state, fed by
//! explicit reports from the call site (connection success/failure,
//! replication lag). Selection strategies are stateless or internally
//! synchronized and safe for concurrent callers. The tracker is an
//! explicitly-owned component: construct it once and hand an `Arc` to
//! every router that needs it.

pub mod conf;
pub mod error;
pub mod health;
pub mod router;
pub mod selector;

pub use conf::ReplicaConfig;
pub use error::{FallbackReason, ReplicaError};
pub use health::{ReplicaHealth, ReplicaHealthTracker};
pub use router::{
    FallbackCounters, ReplicaChoice, ReplicaOptions, ReplicaRouter, ShardReplicas,
};
pub use selector::{
    LeastConnectionsSelector, LeastLatencySelector, RandomSelector, ReplicaSelector,
    RoundRobinSelector, WeightedRandomSelector,
};

/// Replica identifier type
pub type ReplicaId = String;

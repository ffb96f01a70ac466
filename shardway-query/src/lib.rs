//! Cross-shard read orchestration: scatter a query over N shards, gather
//! per-shard successes and failures, and merge the results.
//!
//! The executor owns the concurrency contract (one task per shard, bounded
//! parallelism, shared deadline, cancellation); the aggregation module is
//! pure merging over the outcome shape. Retry policy is deliberately the
//! caller's concern, applied by re-invoking against the failed subset.

pub mod aggregate;
pub mod conf;
pub mod error;
pub mod executor;
pub mod outcome;

pub use conf::ScatterGatherConfig;
pub use error::{BoxError, ScatterGatherError, ShardQueryError};
pub use executor::{ScatterGatherExecutor, ScatterGatherOptions};
pub use outcome::{ScatterGatherOutcome, ShardFailure, ShardResult};

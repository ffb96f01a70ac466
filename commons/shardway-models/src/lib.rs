pub mod shard;
pub mod topology;

pub use shard::*;
pub use topology::*;

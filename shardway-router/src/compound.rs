//! Compound routing: a pipeline of component routers over a composite key.
//!
//! The key splits on a separator into one sub-key per component; each
//! component resolves its sub-key independently and the component results
//! join into the composite shard id (e.g. geo `us` -> `shard-us` plus
//! tenant `t1` -> `t1` yields `shard-us-t1`). Failure in any component
//! propagates unchanged.

use std::sync::Arc;

use shardway_models::ShardId;
use tracing::debug;

use crate::error::RoutingError;
use crate::ShardResolver;

pub struct CompoundRouter {
    components: Vec<Arc<dyn ShardResolver>>,
    separator: char,
}

impl std::fmt::Debug for CompoundRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompoundRouter")
            .field("components", &self.components.len())
            .field("separator", &self.separator)
            .finish()
    }
}

impl CompoundRouter {
    pub fn new(components: Vec<Arc<dyn ShardResolver>>) -> Result<Self, RoutingError> {
        if components.len() < 2 {
            return Err(RoutingError::InvalidConfiguration(
                "compound router needs at least two components".into(),
            ));
        }
        Ok(Self {
            components,
            separator: ':',
        })
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub async fn resolve(&self, shard_key: &str) -> Result<ShardId, RoutingError> {
        if shard_key.is_empty() {
            return Err(RoutingError::EmptyShardKey);
        }
        let sub_keys: Vec<&str> = shard_key.split(self.separator).collect();
        if sub_keys.len() != self.components.len() {
            return Err(RoutingError::CompositeKeyMismatch {
                key: shard_key.to_owned(),
                expected: self.components.len(),
                found: sub_keys.len(),
            });
        }
        let mut parts = Vec::with_capacity(self.components.len());
        for (component, sub_key) in self.components.iter().zip(sub_keys) {
            parts.push(component.resolve(sub_key).await?);
        }
        let composite = parts.join("-");
        debug!(router = "compound", key = shard_key, shard = %composite, "resolved");
        Ok(composite)
    }
}

#[async_trait::async_trait]
impl ShardResolver for CompoundRouter {
    async fn resolve(&self, shard_key: &str) -> Result<ShardId, RoutingError> {
        CompoundRouter::resolve(self, shard_key).await
    }
}

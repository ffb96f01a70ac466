//! Geo routing: region code -> shard, with an acyclic fallback graph.
//!
//! Each region may name one fallback region; resolution walks the chain
//! until a mapped region is found. The fallback graph is validated for
//! cycles at construction, so the walk always terminates.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shardway_models::{ShardId, ShardTopology};
use tracing::debug;

use crate::error::RoutingError;
use crate::ShardResolver;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoRegion {
    pub code: String,
    /// Regions without a shard of their own exist purely to forward to
    /// their fallback.
    pub shard_id: Option<ShardId>,
    pub fallback_region: Option<String>,
}

impl GeoRegion {
    pub fn new(code: impl Into<String>, shard_id: impl Into<ShardId>) -> Self {
        Self {
            code: code.into(),
            shard_id: Some(shard_id.into()),
            fallback_region: None,
        }
    }

    pub fn forwarding(code: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            shard_id: None,
            fallback_region: Some(fallback.into()),
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback_region = Some(fallback.into());
        self
    }
}

#[derive(Debug)]
pub struct GeoRouter {
    regions: HashMap<String, GeoRegion>,
    require_exact_match: bool,
    default_region: Option<String>,
    topology: Arc<ShardTopology>,
}

impl GeoRouter {
    pub fn new(
        topology: Arc<ShardTopology>,
        regions: Vec<GeoRegion>,
    ) -> Result<Self, RoutingError> {
        let mut by_code = HashMap::with_capacity(regions.len());
        for region in regions {
            if region.code.is_empty() {
                return Err(RoutingError::InvalidConfiguration(
                    "region code cannot be empty".into(),
                ));
            }
            if let Some(shard_id) = &region.shard_id {
                if !topology.contains(shard_id) {
                    return Err(RoutingError::ShardNotFound(shard_id.clone()));
                }
            }
            if by_code.insert(region.code.clone(), region).is_some() {
                return Err(RoutingError::InvalidConfiguration(
                    "duplicate region code".into(),
                ));
            }
        }
        detect_fallback_cycles(&by_code)?;
        Ok(Self {
            regions: by_code,
            require_exact_match: false,
            default_region: None,
            topology,
        })
    }

    /// Fail on any region miss instead of walking fallbacks or defaults.
    pub fn require_exact_match(mut self) -> Self {
        self.require_exact_match = true;
        self
    }

    pub fn with_default_region(mut self, region_code: impl Into<String>) -> Self {
        self.default_region = Some(region_code.into());
        self
    }

    pub fn topology(&self) -> &Arc<ShardTopology> {
        &self.topology
    }

    pub fn resolve(&self, region_code: &str) -> Result<ShardId, RoutingError> {
        if region_code.is_empty() {
            return Err(RoutingError::EmptyShardKey);
        }
        if self.require_exact_match {
            return match self.regions.get(region_code).and_then(|r| r.shard_id.clone())
            {
                Some(shard_id) => Ok(shard_id),
                None => Err(RoutingError::RegionNotFound(region_code.to_owned())),
            };
        }
        if let Some(shard_id) = self.walk_chain(region_code) {
            return Ok(shard_id);
        }
        if let Some(default) = &self.default_region {
            if let Some(shard_id) = self.walk_chain(default) {
                debug!(
                    router = "geo",
                    region = region_code,
                    default = %default,
                    shard = %shard_id,
                    "resolved via default region"
                );
                return Ok(shard_id);
            }
        }
        Err(RoutingError::RegionNotFound(region_code.to_owned()))
    }

    /// Follow the fallback chain from `code` to the first mapped region.
    /// Construction guarantees the chain is acyclic.
    fn walk_chain(&self, code: &str) -> Option<ShardId> {
        let mut current = code;
        loop {
            let region = self.regions.get(current)?;
            if let Some(shard_id) = &region.shard_id {
                if current != code {
                    debug!(
                        router = "geo",
                        region = code,
                        via = current,
                        shard = %shard_id,
                        "resolved via fallback chain"
                    );
                }
                return Some(shard_id.clone());
            }
            current = region.fallback_region.as_deref()?;
        }
    }
}

fn detect_fallback_cycles(
    regions: &HashMap<String, GeoRegion>,
) -> Result<(), RoutingError> {
    for start in regions.keys() {
        let mut path = vec![start.as_str()];
        let mut current = start.as_str();
        while let Some(next) = regions
            .get(current)
            .and_then(|r| r.fallback_region.as_deref())
        {
            if path.contains(&next) {
                path.push(next);
                return Err(RoutingError::FallbackCycle(path.join(" -> ")));
            }
            path.push(next);
            current = next;
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl ShardResolver for GeoRouter {
    async fn resolve(&self, shard_key: &str) -> Result<ShardId, RoutingError> {
        GeoRouter::resolve(self, shard_key)
    }
}

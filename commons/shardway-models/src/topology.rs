use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shard::{ShardId, ShardInfo};

/// Topology construction errors, all detected eagerly in [`ShardTopology::new`].
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Topology must contain at least one shard")]
    NoShards,
    #[error("Shard id cannot be empty")]
    EmptyShardId,
    #[error("Duplicate shard id: {0}")]
    DuplicateShardId(ShardId),
    #[error("Shard `{0}` has zero weight")]
    ZeroWeight(ShardId),
}

impl TopologyError {
    pub fn code(&self) -> &'static str {
        match self {
            TopologyError::NoShards => "topology_empty",
            TopologyError::EmptyShardId => "shard_id_empty",
            TopologyError::DuplicateShardId(_) => "shard_id_duplicate",
            TopologyError::ZeroWeight(_) => "shard_weight_zero",
        }
    }
}

/// The full set of shards at a point in time.
///
/// Built once from configuration and replaced wholesale when shards are
/// added or removed. In-flight routing decisions keep the instance they
/// were constructed against, so replacement never races a lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<ShardInfo>", into = "Vec<ShardInfo>")]
pub struct ShardTopology {
    shards: Vec<ShardInfo>,
    index: HashMap<ShardId, usize>,
}

impl ShardTopology {
    pub fn new(shards: Vec<ShardInfo>) -> Result<Self, TopologyError> {
        if shards.is_empty() {
            return Err(TopologyError::NoShards);
        }
        let mut index = HashMap::with_capacity(shards.len());
        for (pos, shard) in shards.iter().enumerate() {
            if shard.id.is_empty() {
                return Err(TopologyError::EmptyShardId);
            }
            if shard.weight == 0 {
                return Err(TopologyError::ZeroWeight(shard.id.clone()));
            }
            if index.insert(shard.id.clone(), pos).is_some() {
                return Err(TopologyError::DuplicateShardId(shard.id.clone()));
            }
        }
        Ok(Self { shards, index })
    }

    pub fn get(&self, shard_id: &str) -> Option<&ShardInfo> {
        self.index.get(shard_id).map(|pos| &self.shards[*pos])
    }

    pub fn contains(&self, shard_id: &str) -> bool {
        self.index.contains_key(shard_id)
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShardInfo> {
        self.shards.iter()
    }

    pub fn active_shards(&self) -> impl Iterator<Item = &ShardInfo> {
        self.shards.iter().filter(|s| s.is_active)
    }

    pub fn shard_ids(&self) -> Vec<ShardId> {
        self.shards.iter().map(|s| s.id.clone()).collect()
    }

    pub fn active_shard_ids(&self) -> Vec<ShardId> {
        self.active_shards().map(|s| s.id.clone()).collect()
    }
}

impl TryFrom<Vec<ShardInfo>> for ShardTopology {
    type Error = TopologyError;

    fn try_from(shards: Vec<ShardInfo>) -> Result<Self, Self::Error> {
        Self::new(shards)
    }
}

impl From<ShardTopology> for Vec<ShardInfo> {
    fn from(topology: ShardTopology) -> Self {
        topology.shards
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_shards() -> Vec<ShardInfo> {
        vec![
            ShardInfo::new("shard-1", "db://host-1"),
            ShardInfo::new("shard-2", "db://host-2"),
            ShardInfo::new("shard-3", "db://host-3").inactive(),
        ]
    }

    #[test]
    fn lookup_by_id() {
        let topology = ShardTopology::new(three_shards()).unwrap();
        assert_eq!(topology.len(), 3);
        assert!(topology.contains("shard-2"));
        assert_eq!(
            topology.get("shard-2").unwrap().connection_target,
            "db://host-2"
        );
        assert!(topology.get("shard-9").is_none());
    }

    #[test]
    fn active_filtering() {
        let topology = ShardTopology::new(three_shards()).unwrap();
        assert_eq!(topology.active_shard_ids(), vec!["shard-1", "shard-2"]);
    }

    #[test]
    fn rejects_empty_topology() {
        assert!(matches!(
            ShardTopology::new(vec![]),
            Err(TopologyError::NoShards)
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = ShardTopology::new(vec![
            ShardInfo::new("shard-1", "db://a"),
            ShardInfo::new("shard-1", "db://b"),
        ])
        .unwrap_err();
        assert!(matches!(err, TopologyError::DuplicateShardId(id) if id == "shard-1"));
    }

    #[test]
    fn rejects_zero_weight() {
        let err =
            ShardTopology::new(vec![ShardInfo::new("shard-1", "db://a").with_weight(0)])
                .unwrap_err();
        assert_eq!(err.code(), "shard_weight_zero");
    }

    #[test]
    fn deserialize_from_config_list() {
        let topology: ShardTopology = serde_json::from_str(
            r#"[
                {"id": "shard-1", "connection_target": "db://host-1", "weight": 2},
                {"id": "shard-2", "connection_target": "db://host-2"}
            ]"#,
        )
        .unwrap();
        assert_eq!(topology.len(), 2);
        assert_eq!(topology.get("shard-1").unwrap().weight, 2);
    }
}

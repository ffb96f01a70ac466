use serde::{Deserialize, Serialize};

/// Shard identifier type
pub type ShardId = String;

fn default_weight() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

/// Description of a single physical shard.
///
/// Immutable once constructed. The connection target is an opaque string
/// owned by the data-access layer; this crate never parses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardInfo {
    /// Shard identifier, unique within a topology
    pub id: ShardId,
    /// Opaque connection target (connection string, DSN, URL)
    pub connection_target: String,
    /// Relative traffic weight, must be >= 1
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Inactive shards are skipped by routers
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl ShardInfo {
    pub fn new(id: impl Into<ShardId>, connection_target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connection_target: connection_target.into(),
            weight: 1,
            is_active: true,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let shard = ShardInfo::new("shard-1", "db://host-1");
        assert_eq!(shard.weight, 1);
        assert!(shard.is_active);

        let shard = ShardInfo::new("shard-2", "db://host-2").with_weight(3).inactive();
        assert_eq!(shard.weight, 3);
        assert!(!shard.is_active);
    }

    #[test]
    fn deserialize_applies_defaults() {
        let shard: ShardInfo = serde_json::from_str(
            r#"{"id": "shard-1", "connection_target": "db://host-1"}"#,
        )
        .unwrap();
        assert_eq!(shard.weight, 1);
        assert!(shard.is_active);
    }
}

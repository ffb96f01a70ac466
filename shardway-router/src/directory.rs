//! Directory routing: an explicit key -> shard mapping held in a pluggable
//! store. The only router whose decisions read external mutable state; the
//! store can be updated while routers resolve against it.

use std::sync::Arc;

use shardway_models::ShardId;
use tracing::debug;

use crate::error::RoutingError;
use crate::ShardResolver;

/// Pluggable key directory.
///
/// The in-memory implementation below serves development and tests; a
/// production deployment backs this with a persistent key-value store.
/// Implementations must tolerate concurrent readers and writers.
#[async_trait::async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn lookup(&self, shard_key: &str) -> Result<Option<ShardId>, RoutingError>;
    async fn assign(
        &self,
        shard_key: String,
        shard_id: ShardId,
    ) -> Result<(), RoutingError>;
    /// Returns true when a mapping existed
    async fn remove(&self, shard_key: &str) -> Result<bool, RoutingError>;
    async fn list(&self) -> Result<Vec<(String, ShardId)>, RoutingError>;
}

/// Concurrent in-memory directory.
#[derive(Default)]
pub struct InMemoryDirectoryStore {
    entries: scc::HashMap<String, ShardId>,
}

impl InMemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    async fn lookup(&self, shard_key: &str) -> Result<Option<ShardId>, RoutingError> {
        Ok(self
            .entries
            .read_async(shard_key, |_, shard_id| shard_id.clone())
            .await)
    }

    async fn assign(
        &self,
        shard_key: String,
        shard_id: ShardId,
    ) -> Result<(), RoutingError> {
        self.entries.upsert_async(shard_key, shard_id).await;
        Ok(())
    }

    async fn remove(&self, shard_key: &str) -> Result<bool, RoutingError> {
        Ok(self.entries.remove_async(shard_key).await.is_some())
    }

    async fn list(&self) -> Result<Vec<(String, ShardId)>, RoutingError> {
        let mut mappings = Vec::with_capacity(self.entries.len());
        self.entries
            .scan_async(|key, shard_id| {
                mappings.push((key.clone(), shard_id.clone()));
            })
            .await;
        Ok(mappings)
    }
}

pub struct DirectoryRouter {
    store: Arc<dyn DirectoryStore>,
    default_shard_id: Option<ShardId>,
}

impl DirectoryRouter {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self {
            store,
            default_shard_id: None,
        }
    }

    /// Route unmapped keys to this shard instead of failing.
    pub fn with_default(mut self, shard_id: impl Into<ShardId>) -> Self {
        self.default_shard_id = Some(shard_id.into());
        self
    }

    pub fn store(&self) -> &Arc<dyn DirectoryStore> {
        &self.store
    }

    pub async fn resolve(&self, shard_key: &str) -> Result<ShardId, RoutingError> {
        if shard_key.is_empty() {
            return Err(RoutingError::EmptyShardKey);
        }
        if let Some(shard_id) = self.store.lookup(shard_key).await? {
            debug!(router = "directory", key = shard_key, shard = %shard_id, "resolved");
            return Ok(shard_id);
        }
        match &self.default_shard_id {
            Some(default) => {
                debug!(router = "directory", key = shard_key, shard = %default, "unmapped, using default");
                Ok(default.clone())
            }
            None => Err(RoutingError::ShardNotFound(shard_key.to_owned())),
        }
    }
}

#[async_trait::async_trait]
impl ShardResolver for DirectoryRouter {
    async fn resolve(&self, shard_key: &str) -> Result<ShardId, RoutingError> {
        DirectoryRouter::resolve(self, shard_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mapped_key_resolves() {
        let store = Arc::new(InMemoryDirectoryStore::new());
        store
            .assign("tenant-7".into(), "shard-2".into())
            .await
            .unwrap();
        let router = DirectoryRouter::new(store);
        assert_eq!(router.resolve("tenant-7").await.unwrap(), "shard-2");
    }

    #[tokio::test]
    async fn unmapped_key_uses_default() {
        let store = Arc::new(InMemoryDirectoryStore::new());
        let router = DirectoryRouter::new(store).with_default("shard-0");
        assert_eq!(router.resolve("tenant-9").await.unwrap(), "shard-0");
    }

    #[tokio::test]
    async fn unmapped_key_without_default_fails() {
        let store = Arc::new(InMemoryDirectoryStore::new());
        let router = DirectoryRouter::new(store);
        let err = router.resolve("tenant-9").await.unwrap_err();
        assert_eq!(err.code(), "shard_not_found");
    }

    #[tokio::test]
    async fn store_mutations_are_visible_to_the_router() {
        let store = Arc::new(InMemoryDirectoryStore::new());
        let router = DirectoryRouter::new(store.clone());

        store
            .assign("tenant-1".into(), "shard-1".into())
            .await
            .unwrap();
        assert_eq!(router.resolve("tenant-1").await.unwrap(), "shard-1");

        store
            .assign("tenant-1".into(), "shard-4".into())
            .await
            .unwrap();
        assert_eq!(router.resolve("tenant-1").await.unwrap(), "shard-4");

        assert!(store.remove("tenant-1").await.unwrap());
        assert!(!store.remove("tenant-1").await.unwrap());
        assert!(router.resolve("tenant-1").await.is_err());
    }

    #[tokio::test]
    async fn list_returns_all_mappings() {
        let store = InMemoryDirectoryStore::new();
        store
            .assign("a".into(), "shard-1".into())
            .await
            .unwrap();
        store
            .assign("b".into(), "shard-2".into())
            .await
            .unwrap();
        let mut mappings = store.list().await.unwrap();
        mappings.sort();
        assert_eq!(
            mappings,
            vec![
                ("a".to_string(), "shard-1".to_string()),
                ("b".to_string(), "shard-2".to_string())
            ]
        );
    }
}

//! In-memory survey tree loaded from a JSON data file
//!
//! The whole dataset is held as one `serde_json::Value`; reads clone
//! the requested subtree. serde_json's default object map is ordered
//! by key, which gives the stable region -> subregion -> entity
//! iteration the roster contract requires.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use super::errors::{StoreError, StoreResult};
use super::partition::Partition;
use super::tree::{EntityKey, TreeStore};

/// A read-only survey tree held in memory
#[derive(Debug, Clone)]
pub struct MemoryStore {
    root: Value,
}

impl MemoryStore {
    /// Build a store from an already-parsed tree
    pub fn from_value(root: Value) -> StoreResult<Self> {
        if !root.is_object() {
            return Err(StoreError::NotAnObject);
        }
        Ok(Self { root })
    }

    /// Load a store from a JSON data file
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path)?;
        let root: Value = serde_json::from_str(&content)?;
        Self::from_value(root)
    }
}

#[async_trait]
impl TreeStore for MemoryStore {
    async fn read_partition(&self, partition: Partition) -> StoreResult<Option<Value>> {
        Ok(self.root.get(partition.name()).cloned())
    }

    async fn read_entity(
        &self,
        partition: Partition,
        entity: &EntityKey,
    ) -> StoreResult<Option<Value>> {
        let subtree = self
            .root
            .get(partition.name())
            .and_then(|p| p.get(&entity.region))
            .and_then(|r| r.get(&entity.subregion))
            .and_then(|s| s.get(&entity.entity_id));
        Ok(subtree.cloned())
    }
}

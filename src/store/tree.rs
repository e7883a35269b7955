//! Read-only hierarchical store interface
//!
//! The engine consumes the survey dataset through this seam: whole
//! subtrees reachable by path, fetched fresh per request. There is no
//! write path and no caching in this core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::StoreResult;
use super::partition::Partition;

/// Position of one entity in the region hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub region: String,
    pub subregion: String,
    pub entity_id: String,
}

impl EntityKey {
    /// Create a new entity key
    pub fn new(
        region: impl Into<String>,
        subregion: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            subregion: subregion.into(),
            entity_id: entity_id.into(),
        }
    }
}

/// Read-only access to the partitioned survey tree
///
/// Every read is a suspension point; implementations may be in-memory
/// or remote. Both reads return the whole subtree at the requested
/// path, or `None` if the path is absent.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Read a whole partition subtree (region -> subregion -> entity -> ...)
    async fn read_partition(&self, partition: Partition) -> StoreResult<Option<Value>>;

    /// Read one entity's subtree within a partition
    ///
    /// For `demographics` this is the entity's record; for sub-form
    /// partitions it is the `{timestamp: snapshot}` history.
    async fn read_entity(&self, partition: Partition, entity: &EntityKey)
        -> StoreResult<Option<Value>>;
}

//! Matched record assembly

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::EntityKey;

/// The assembled, partition-keyed data returned for one matching entity
///
/// Always carries all five partitions: the demographic record as-is,
/// each sub-form as a `{timestamp: snapshot}` map filtered to the
/// resolved snapshot(s), and `null` for a partition whose fetch failed
/// during assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub region: String,
    pub subregion: String,
    pub entity_id: String,
    pub partitions: BTreeMap<String, Value>,
}

impl MatchRecord {
    /// Start a record for an entity, with no partition data yet
    pub fn new(entity: &EntityKey) -> Self {
        Self {
            region: entity.region.clone(),
            subregion: entity.subregion.clone(),
            entity_id: entity.entity_id.clone(),
            partitions: BTreeMap::new(),
        }
    }

    /// Attach one partition's contribution
    pub fn insert_partition(&mut self, name: &str, value: Value) {
        self.partitions.insert(name.to_string(), value);
    }
}

/// Encode a resolved `{timestamp: snapshot}` map back into tree form
pub fn history_to_value(history: &BTreeMap<i64, Value>) -> Value {
    let mut map = Map::new();
    for (ts, snapshot) in history {
        map.insert(ts.to_string(), snapshot.clone());
    }
    Value::Object(map)
}

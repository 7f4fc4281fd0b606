//! Record store - flat per-type record collections
//!
//! - `collection`: one named collection with CRUD and queries
//! - `identity`: pluggable id generation per collection
//!
//! The store knows nothing about associations. Foreign keys are plain
//! fields as far as it is concerned.

pub mod collection;
pub mod identity;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{ModelError, ModelResult};

pub use collection::DbCollection;
pub use identity::{CounterIdentityManager, IdentityManager, IdentityStrategy, UuidIdentityManager};

/// A stored record: an ordered JSON object with a string `id`
pub type Record = Map<String, Value>;

/// Render a JSON id as the string form used for storage
pub fn normalize_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Loose equality used by queries: scalars compare by their string form
pub fn values_match(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (normalize_id(actual), normalize_id(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// The set of named collections
#[derive(Debug, Default)]
pub struct Db {
    collections: IndexMap<String, DbCollection>,
}

impl Db {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection unless one with that name already exists
    pub fn create_collection(
        &mut self,
        name: &str,
        identity: Box<dyn IdentityManager>,
    ) -> &mut DbCollection {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| DbCollection::with_identity(name, identity))
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    pub fn collection(&self, name: &str) -> ModelResult<&DbCollection> {
        self.collections
            .get(name)
            .ok_or_else(|| ModelError::Configuration(format!("No collection named '{}'", name)))
    }

    pub fn collection_mut(&mut self, name: &str) -> ModelResult<&mut DbCollection> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| ModelError::Configuration(format!("No collection named '{}'", name)))
    }

    pub fn collection_names(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }

    /// Bulk load `{ "users": [{...}, ...], ... }`, creating missing collections
    pub fn load_data(&mut self, data: &Value) -> ModelResult<()> {
        let collections = data.as_object().ok_or_else(|| {
            ModelError::Serialization("load_data expects an object of collections".to_string())
        })?;

        for (name, records) in collections {
            let records = records.as_array().ok_or_else(|| {
                ModelError::Serialization(format!("Collection '{}' must be an array", name))
            })?;
            let records = records
                .iter()
                .map(|record| {
                    record.as_object().cloned().ok_or_else(|| {
                        ModelError::Serialization(format!(
                            "Every '{}' record must be an object",
                            name
                        ))
                    })
                })
                .collect::<ModelResult<Vec<Record>>>()?;

            self.create_collection(name, IdentityStrategy::Counter.manager())
                .insert_many(records)?;
        }
        Ok(())
    }

    /// Snapshot of every collection as JSON
    pub fn dump(&self) -> Value {
        let mut out = Map::new();
        for (name, collection) in &self.collections {
            let records = collection.all().into_iter().map(Value::Object).collect();
            out.insert(name.clone(), Value::Array(records));
        }
        Value::Object(out)
    }

    /// Remove every record from every collection
    pub fn empty_data(&mut self) {
        for collection in self.collections.values_mut() {
            collection.clear();
        }
    }
}

//! DbCollection - one flat, named collection of records
//!
//! Records are keyed by their string id and kept in insertion order. Every
//! record handed out is a clone; callers can never mutate stored state by
//! holding on to a returned value.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace};

use super::identity::{CounterIdentityManager, IdentityManager};
use super::{normalize_id, values_match, Record};
use crate::error::{ModelError, ModelResult};

#[derive(Debug)]
pub struct DbCollection {
    name: String,
    records: IndexMap<String, Record>,
    identity: Box<dyn IdentityManager>,
}

impl DbCollection {
    /// Create an empty collection with sequential ids
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_identity(name, Box::new(CounterIdentityManager::new()))
    }

    /// Create an empty collection with a custom identity manager
    pub fn with_identity(name: impl Into<String>, identity: Box<dyn IdentityManager>) -> Self {
        Self {
            name: name.into(),
            records: IndexMap::new(),
            identity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every record, in insertion order
    pub fn all(&self) -> Vec<Record> {
        self.records.values().cloned().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Insert one record, assigning an id when it has none
    pub fn insert(&mut self, attrs: Record) -> ModelResult<Record> {
        let id = match attrs.get("id") {
            None | Some(Value::Null) => self.next_free_id(&attrs),
            Some(value) => {
                let id = normalize_id(value).ok_or_else(|| {
                    ModelError::InvalidOperation(format!(
                        "A {} record id must be a string or a number, got {}",
                        self.name, value
                    ))
                })?;
                if self.records.contains_key(&id) {
                    return Err(ModelError::DuplicateId {
                        collection: self.name.clone(),
                        id,
                    });
                }
                self.identity.set(&id)?;
                id
            }
        };

        let mut record = Record::new();
        record.insert("id".to_string(), Value::String(id.clone()));
        for (key, value) in attrs {
            if key != "id" {
                record.insert(key, value);
            }
        }

        debug!("Inserted {} record {}", self.name, id);
        self.records.insert(id, record.clone());
        Ok(record)
    }

    /// Insert several records; stops at the first failure
    pub fn insert_many(&mut self, records: Vec<Record>) -> ModelResult<Vec<Record>> {
        records.into_iter().map(|record| self.insert(record)).collect()
    }

    pub fn find(&self, id: &str) -> Option<Record> {
        self.records.get(id).cloned()
    }

    /// Find the records for `ids`, in the order given, skipping missing ones
    pub fn find_many<S: AsRef<str>>(&self, ids: &[S]) -> Vec<Record> {
        ids.iter()
            .filter_map(|id| self.records.get(id.as_ref()).cloned())
            .collect()
    }

    /// First record matching every key of `query`
    pub fn find_by(&self, query: &Record) -> Option<Record> {
        self.records
            .values()
            .find(|record| matches_query(record, query))
            .cloned()
    }

    /// Every record matching every key of `query`
    pub fn where_query(&self, query: &Record) -> Vec<Record> {
        self.where_fn(|record| matches_query(record, query))
    }

    /// Every record accepted by `predicate`
    pub fn where_fn<F>(&self, predicate: F) -> Vec<Record>
    where
        F: Fn(&Record) -> bool,
    {
        self.records
            .values()
            .filter(|record| predicate(record))
            .cloned()
            .collect()
    }

    /// Merge `attrs` into the record with `id`
    pub fn update(&mut self, id: &str, attrs: &Record) -> ModelResult<Record> {
        if let Some(new_id) = attrs.get("id").and_then(normalize_id) {
            if new_id != id {
                return Err(ModelError::InvalidOperation(format!(
                    "Attempting to change the id of {} record {} to {}",
                    self.name, id, new_id
                )));
            }
        }

        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| ModelError::not_found(self.name.clone(), id))?;
        for (key, value) in attrs {
            if key != "id" {
                record.insert(key.clone(), value.clone());
            }
        }
        trace!("Updated {} record {}", self.name, id);
        Ok(record.clone())
    }

    /// Merge `attrs` into every record matching `query`
    pub fn update_where(&mut self, query: &Record, attrs: &Record) -> ModelResult<Vec<Record>> {
        let ids = self.ids_where(|record| matches_query(record, query));
        ids.iter().map(|id| self.update(id, attrs)).collect()
    }

    /// Merge `attrs` into every record
    pub fn update_all(&mut self, attrs: &Record) -> ModelResult<Vec<Record>> {
        let ids: Vec<String> = self.records.keys().cloned().collect();
        ids.iter().map(|id| self.update(id, attrs)).collect()
    }

    pub fn remove(&mut self, id: &str) -> Option<Record> {
        let removed = self.records.shift_remove(id);
        if removed.is_some() {
            debug!("Removed {} record {}", self.name, id);
        }
        removed
    }

    pub fn remove_many<S: AsRef<str>>(&mut self, ids: &[S]) -> Vec<Record> {
        ids.iter().filter_map(|id| self.remove(id.as_ref())).collect()
    }

    pub fn remove_where(&mut self, query: &Record) -> Vec<Record> {
        let ids = self.ids_where(|record| matches_query(record, query));
        self.remove_many(&ids)
    }

    /// Remove every record and restart id generation
    pub fn clear(&mut self) {
        self.records.clear();
        self.identity.reset();
    }

    /// Return the first record matching `query`, inserting `query + attrs` when none does
    pub fn first_or_create(&mut self, query: &Record, attrs: &Record) -> ModelResult<Record> {
        if let Some(record) = self.find_by(query) {
            return Ok(record);
        }
        let mut merged = query.clone();
        merged.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.insert(merged)
    }

    fn ids_where<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&Record) -> bool,
    {
        self.records
            .iter()
            .filter(|(_, record)| predicate(record))
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn next_free_id(&mut self, attrs: &Record) -> String {
        loop {
            let id = self.identity.fetch(attrs);
            if !self.records.contains_key(&id) {
                return id;
            }
        }
    }
}

fn matches_query(record: &Record, query: &Record) -> bool {
    query.iter().all(|(key, expected)| match record.get(key) {
        Some(actual) => values_match(actual, expected),
        None => expected.is_null(),
    })
}

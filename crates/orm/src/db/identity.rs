//! Identity managers - per-collection id generation and validation

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Record;
use crate::error::{ModelError, ModelResult};

/// Generates and validates ids for one record collection
pub trait IdentityManager: Debug {
    /// Produce a fresh id for a record inserted without one
    fn fetch(&mut self, record: &Record) -> String;

    /// Register an id supplied by the caller
    fn set(&mut self, id: &str) -> ModelResult<()>;

    /// Forget every id handed out so far
    fn reset(&mut self);
}

/// Sequential numeric ids rendered as strings: "1", "2", ...
#[derive(Debug, Clone)]
pub struct CounterIdentityManager {
    next_id: u64,
}

impl Default for CounterIdentityManager {
    fn default() -> Self {
        Self { next_id: 1 }
    }
}

impl CounterIdentityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next `fetch` will return
    pub fn peek(&self) -> u64 {
        self.next_id
    }
}

impl IdentityManager for CounterIdentityManager {
    fn fetch(&mut self, _record: &Record) -> String {
        let id = self.next_id;
        self.next_id += 1;
        id.to_string()
    }

    fn set(&mut self, id: &str) -> ModelResult<()> {
        // Numeric ids supplied by callers push the counter past them so
        // generated ids never collide with explicit ones.
        if let Ok(numeric) = id.parse::<u64>() {
            if numeric >= self.next_id {
                self.next_id = numeric + 1;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.next_id = 1;
    }
}

/// Random v4 UUID ids
#[derive(Debug, Clone, Default)]
pub struct UuidIdentityManager;

impl UuidIdentityManager {
    pub fn new() -> Self {
        Self
    }
}

impl IdentityManager for UuidIdentityManager {
    fn fetch(&mut self, _record: &Record) -> String {
        Uuid::new_v4().to_string()
    }

    fn set(&mut self, id: &str) -> ModelResult<()> {
        Uuid::parse_str(id).map(|_| ()).map_err(|_| {
            ModelError::InvalidOperation(format!("'{}' is not a valid UUID id", id))
        })
    }

    fn reset(&mut self) {}
}

/// Built-in identity strategies selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStrategy {
    #[default]
    Counter,
    Uuid,
}

impl IdentityStrategy {
    /// Instantiate a fresh manager for this strategy
    pub fn manager(self) -> Box<dyn IdentityManager> {
        match self {
            IdentityStrategy::Counter => Box::new(CounterIdentityManager::new()),
            IdentityStrategy::Uuid => Box::new(UuidIdentityManager::new()),
        }
    }
}

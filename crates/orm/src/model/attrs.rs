//! Attrs - constructor and update arguments for models
//!
//! Plain attributes are JSON values. Association keys take models
//! (`AttrValue::Model`, `AttrValue::Models`), and foreign key names take
//! ids or `{ type, id }` objects, so a single argument can mix all three:
//!
//! ```ignore
//! schema.create("post", Attrs::new().with("title", "Hello").with("author", &user))?;
//! schema.create("post", json!({ "title": "Hello", "authorId": "1" }))?;
//! ```

use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

use super::Model;
use crate::collection::Collection;

/// A single attribute argument
#[derive(Debug, Clone)]
pub enum AttrValue {
    /// A plain attribute or a foreign key value
    Value(Value),
    /// A belongs-to target; `None` clears the association
    Model(Option<Model>),
    /// The full membership of a has-many association
    Models(Vec<Model>),
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        AttrValue::Value(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Value(Value::from(value))
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Value(Value::from(value))
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for AttrValue {
                fn from(value: $ty) -> Self {
                    AttrValue::Value(Value::from(value))
                }
            }
        )*
    };
}

impl_from_scalar!(i32, i64, u32, u64, f64);

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Value(Value::from(value))
    }
}

impl From<Model> for AttrValue {
    fn from(model: Model) -> Self {
        AttrValue::Model(Some(model))
    }
}

impl From<&Model> for AttrValue {
    fn from(model: &Model) -> Self {
        AttrValue::Model(Some(model.clone()))
    }
}

impl From<Option<&Model>> for AttrValue {
    fn from(model: Option<&Model>) -> Self {
        AttrValue::Model(model.cloned())
    }
}

impl From<Option<Model>> for AttrValue {
    fn from(model: Option<Model>) -> Self {
        AttrValue::Model(model)
    }
}

impl From<Vec<Model>> for AttrValue {
    fn from(models: Vec<Model>) -> Self {
        AttrValue::Models(models)
    }
}

impl From<&[Model]> for AttrValue {
    fn from(models: &[Model]) -> Self {
        AttrValue::Models(models.to_vec())
    }
}

impl From<Collection> for AttrValue {
    fn from(collection: Collection) -> Self {
        AttrValue::Models(collection.into_vec())
    }
}

/// Ordered attribute arguments
#[derive(Debug, Clone, Default)]
pub struct Attrs {
    values: IndexMap<String, AttrValue>,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.values.iter()
    }
}

impl IntoIterator for Attrs {
    type Item = (String, AttrValue);
    type IntoIter = indexmap::map::IntoIter<String, AttrValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl From<Value> for Attrs {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self {
                values: map
                    .into_iter()
                    .map(|(key, value)| (key, AttrValue::Value(value)))
                    .collect(),
            },
            Value::Null => Self::new(),
            other => {
                warn!("Ignoring non-object model attributes: {}", other);
                Self::new()
            }
        }
    }
}

impl From<()> for Attrs {
    fn from(_: ()) -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

//! Foreign Key Values - typed views over stored foreign key fields
//!
//! Stored records keep foreign keys as plain JSON:
//!
//! - belongs-to: `"1"` or `null`
//! - polymorphic belongs-to: `{ "type": "post", "id": "1" }` or `null`
//! - has-many: `["1", "2"]`
//! - polymorphic has-many: `[{ "type": "post", "id": "1" }, ...]`
//!
//! The association runtime works with [`ModelIdentifier`]s instead, and
//! exposes [`ForeignKey`] to callers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use super::metadata::Association;
use crate::db::normalize_id;
use crate::error::{ModelError, ModelResult};

/// A saved record, identified by model type and id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelIdentifier {
    #[serde(rename = "type")]
    pub model_name: String,
    pub id: String,
}

impl ModelIdentifier {
    pub fn new(model_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.model_name, self.id)
    }
}

/// Value of one foreign key reference as seen by callers
///
/// The id is `None` while the referenced model is still unsaved and its
/// reference is pending.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ForeignKey {
    /// Plain id of a non-polymorphic association
    Mono(Option<String>),
    /// Type-tagged id of a polymorphic association
    Poly { model_name: String, id: Option<String> },
}

impl ForeignKey {
    /// Reference by id
    pub fn id(id: impl Into<String>) -> Self {
        ForeignKey::Mono(Some(id.into()))
    }

    /// Type-tagged reference for polymorphic associations
    pub fn poly(model_name: impl Into<String>, id: impl Into<String>) -> Self {
        ForeignKey::Poly {
            model_name: model_name.into(),
            id: Some(id.into()),
        }
    }

    /// The referenced id, if the referenced model is saved
    pub fn id_str(&self) -> Option<&str> {
        match self {
            ForeignKey::Mono(id) | ForeignKey::Poly { id, .. } => id.as_deref(),
        }
    }

    /// The type tag of a polymorphic reference
    pub fn model_name(&self) -> Option<&str> {
        match self {
            ForeignKey::Mono(_) => None,
            ForeignKey::Poly { model_name, .. } => Some(model_name),
        }
    }

    /// True while the referenced model has not been saved
    pub fn is_pending(&self) -> bool {
        self.id_str().is_none()
    }

    pub fn to_json(&self) -> Value {
        match self {
            ForeignKey::Mono(Some(id)) => Value::String(id.clone()),
            ForeignKey::Mono(None) => Value::Null,
            ForeignKey::Poly { model_name, id } => json!({ "type": model_name, "id": id }),
        }
    }

    /// Parse one caller-supplied reference for `association`
    pub fn from_json(association: &Association, value: &Value) -> ModelResult<Self> {
        if association.is_polymorphic() {
            let object = value.as_object();
            let model_name = object.and_then(|o| o.get("type")).and_then(Value::as_str);
            let id = object.and_then(|o| o.get("id")).and_then(normalize_id);
            match (model_name, id) {
                (Some(model_name), Some(id)) => Ok(ForeignKey::poly(model_name, id)),
                _ => Err(ModelError::InvalidOperation(format!(
                    "{}.{} is polymorphic; expected {{ type, id }} but got {}",
                    association.owner(),
                    association.foreign_key(),
                    value
                ))),
            }
        } else {
            normalize_id(value).map(ForeignKey::id).ok_or_else(|| {
                ModelError::InvalidOperation(format!(
                    "{}.{} expects an id but got {}",
                    association.owner(),
                    association.foreign_key(),
                    value
                ))
            })
        }
    }

    /// Resolve into the identifier of the referenced record
    pub(crate) fn to_identifier(&self, association: &Association) -> ModelResult<ModelIdentifier> {
        let id = self.id_str().ok_or_else(|| {
            ModelError::InvalidOperation(format!(
                "Cannot set {}.{} to a pending reference; save the referenced model first",
                association.owner(),
                association.foreign_key()
            ))
        })?;
        match (self, association.target()) {
            (ForeignKey::Poly { model_name, .. }, _) if association.is_polymorphic() => {
                Ok(ModelIdentifier::new(model_name.clone(), id))
            }
            (ForeignKey::Mono(_), Some(target)) => Ok(ModelIdentifier::new(target, id)),
            _ => Err(ModelError::InvalidOperation(format!(
                "{}.{} {} polymorphic; got {:?}",
                association.owner(),
                association.foreign_key(),
                if association.is_polymorphic() { "is" } else { "is not" },
                self
            ))),
        }
    }

    pub(crate) fn from_identifier(association: &Association, identifier: &ModelIdentifier) -> Self {
        if association.is_polymorphic() {
            ForeignKey::poly(identifier.model_name.clone(), identifier.id.clone())
        } else {
            ForeignKey::id(identifier.id.clone())
        }
    }
}

impl From<&str> for ForeignKey {
    fn from(id: &str) -> Self {
        ForeignKey::id(id)
    }
}

impl From<String> for ForeignKey {
    fn from(id: String) -> Self {
        ForeignKey::id(id)
    }
}

impl From<ModelIdentifier> for ForeignKey {
    fn from(identifier: ModelIdentifier) -> Self {
        ForeignKey::Poly {
            model_name: identifier.model_name,
            id: Some(identifier.id),
        }
    }
}

/// Read the references held in a stored foreign key field
///
/// Malformed entries are skipped; the record store accepts any JSON.
pub(crate) fn stored_references(association: &Association, value: Option<&Value>) -> Vec<ModelIdentifier> {
    let entry = |value: &Value| -> Option<ModelIdentifier> {
        if association.is_polymorphic() {
            let object = value.as_object()?;
            let model_name = object.get("type")?.as_str()?;
            let id = normalize_id(object.get("id")?)?;
            Some(ModelIdentifier::new(model_name, id))
        } else {
            let id = normalize_id(value)?;
            Some(ModelIdentifier::new(association.target()?, id))
        }
    };

    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) if association.is_has_many() => items
            .iter()
            .filter_map(|item| {
                let parsed = entry(item);
                if parsed.is_none() {
                    warn!(
                        "Skipping malformed {}.{} entry {}",
                        association.owner(),
                        association.foreign_key(),
                        item
                    );
                }
                parsed
            })
            .collect(),
        Some(value) if association.is_belongs_to() => entry(value).into_iter().collect(),
        Some(value) => {
            warn!(
                "Ignoring malformed {}.{} value {}",
                association.owner(),
                association.foreign_key(),
                value
            );
            Vec::new()
        }
    }
}

/// Render references in the stored shape for `association`
pub(crate) fn stored_value(association: &Association, references: &[ModelIdentifier]) -> Value {
    let entry = |identifier: &ModelIdentifier| -> Value {
        if association.is_polymorphic() {
            json!({ "type": identifier.model_name, "id": identifier.id })
        } else {
            Value::String(identifier.id.clone())
        }
    };

    if association.is_has_many() {
        Value::Array(references.iter().map(entry).collect())
    } else {
        references.first().map(entry).unwrap_or(Value::Null)
    }
}

/// The empty stored value: `null` or `[]`
pub(crate) fn empty_value(association: &Association) -> Value {
    stored_value(association, &[])
}

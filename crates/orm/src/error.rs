//! Error types for the ORM
//!
//! Every failure raised by the record store, the schema registry or the
//! association runtime is synchronous and surfaced directly to the caller.
//! Messages always name the offending model, key or id.

use thiserror::Error;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Coarse classification of a [`ModelError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid schema definition or invalid use of an association key
    Configuration,
    /// A referenced record does not exist
    RecordNotFound,
    /// The operation is not allowed in the current state
    InvalidOperation,
    /// A record id is already taken
    DuplicateId,
    /// Malformed JSON/YAML input
    Serialization,
    /// Filesystem failure while loading configuration
    Io,
}

/// Error types for ORM operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// Ambiguous or invalid schema configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A model type that was never registered with the schema
    #[error("Configuration error: the '{0}' model has not been registered with the schema")]
    UnknownModel(String),

    /// A key that is not a declared association on the model
    #[error("Configuration error: the {model} model has no association named '{key}'")]
    UnknownAssociation { model: String, key: String },

    /// A foreign key or lookup referenced a record that does not exist
    #[error("Couldn't find {model} with id = {id}")]
    RecordNotFound { model: String, id: String },

    /// The operation cannot be performed in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Inserting a record whose id is already used in the collection
    #[error("Duplicate id '{id}' in the {collection} collection")]
    DuplicateId { collection: String, id: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error while reading configuration
    #[error("IO error: {0}")]
    Io(String),
}

impl ModelError {
    /// Build a [`ModelError::RecordNotFound`]
    pub fn not_found(model: impl Into<String>, id: impl Into<String>) -> Self {
        ModelError::RecordNotFound {
            model: model.into(),
            id: id.into(),
        }
    }

    /// Build a [`ModelError::UnknownAssociation`]
    pub fn unknown_association(model: impl Into<String>, key: impl Into<String>) -> Self {
        ModelError::UnknownAssociation {
            model: model.into(),
            key: key.into(),
        }
    }

    /// The taxonomy bucket this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::Configuration(_)
            | ModelError::UnknownModel(_)
            | ModelError::UnknownAssociation { .. } => ErrorKind::Configuration,
            ModelError::RecordNotFound { .. } => ErrorKind::RecordNotFound,
            ModelError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            ModelError::DuplicateId { .. } => ErrorKind::DuplicateId,
            ModelError::Serialization(_) => ErrorKind::Serialization,
            ModelError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for ModelError {
    fn from(err: serde_yaml::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Io(err.to_string())
    }
}

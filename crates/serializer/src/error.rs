//! Serializer error types

use elif_mock_orm::ModelError;
use thiserror::Error;

pub type SerializerResult<T> = Result<T, SerializerError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SerializerError {
    #[error(transparent)]
    Model(#[from] ModelError),

    /// An include path segment that is not an association
    #[error("'{path}' is not an association of the {model} model and cannot be included")]
    InvalidInclude { model: String, path: String },
}

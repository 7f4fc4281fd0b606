//! Model definitions - the declared associations of one model type

use indexmap::IndexMap;

use crate::relationships::Association;

/// Declarative description of a model type, registered with a schema
///
/// ```
/// use elif_mock_orm::{Association, ModelDefinition};
///
/// let post = ModelDefinition::new()
///     .belongs_to("author")
///     .has_many("comments")
///     .association("reviewer", Association::belongs_to().model("user").no_inverse());
/// assert_eq!(post.associations().len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelDefinition {
    associations: IndexMap<String, Association>,
}

impl ModelDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an association under `key`
    pub fn association(mut self, key: impl Into<String>, association: Association) -> Self {
        self.associations.insert(key.into(), association);
        self
    }

    /// Declare a belongs-to association with every option defaulted
    pub fn belongs_to(self, key: impl Into<String>) -> Self {
        self.association(key, Association::belongs_to())
    }

    /// Declare a has-many association with every option defaulted
    pub fn has_many(self, key: impl Into<String>) -> Self {
        self.association(key, Association::has_many())
    }

    pub fn associations(&self) -> &IndexMap<String, Association> {
        &self.associations
    }
}

//! Association Metadata - declarative association descriptors
//!
//! An [`Association`] is built with a small builder when the schema is
//! declared, then attached to its owner model and key at registration. Once
//! attached it never changes.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::inflection;

/// Defines the shape of an association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// Single reference stored as `<key>Id`
    BelongsTo,
    /// Ordered reference list stored as `<singular key>Ids`
    HasMany,
}

impl AssociationKind {
    /// Returns true if this association resolves to a collection
    pub fn is_collection(self) -> bool {
        matches!(self, Self::HasMany)
    }
}

/// How the inverse of an association is determined
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InverseSpec {
    /// Resolve from the target model's associations at registration
    #[default]
    Auto,
    /// One-way association, no back-reference is maintained
    None,
    /// Explicitly named association on the target model
    Named(String),
}

/// Association descriptor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Association {
    kind: AssociationKind,
    key: String,
    owner: String,
    target: Option<String>,
    polymorphic: bool,
    inverse: InverseSpec,
    foreign_key: String,
}

impl Association {
    fn new(kind: AssociationKind) -> Self {
        Self {
            kind,
            key: String::new(),
            owner: String::new(),
            target: None,
            polymorphic: false,
            inverse: InverseSpec::Auto,
            foreign_key: String::new(),
        }
    }

    /// Declare a belongs-to association
    pub fn belongs_to() -> Self {
        Self::new(AssociationKind::BelongsTo)
    }

    /// Declare a has-many association
    pub fn has_many() -> Self {
        Self::new(AssociationKind::HasMany)
    }

    /// Set the target model explicitly instead of inferring it from the key
    pub fn model(mut self, model_name: impl Into<String>) -> Self {
        self.target = Some(model_name.into());
        self
    }

    /// Make the association polymorphic: the target type is stored per reference
    pub fn polymorphic(mut self) -> Self {
        self.polymorphic = true;
        self
    }

    /// Name the inverse association on the target model
    pub fn inverse(mut self, key: impl Into<String>) -> Self {
        self.inverse = InverseSpec::Named(key.into());
        self
    }

    /// Declare a one-way association
    pub fn no_inverse(mut self) -> Self {
        self.inverse = InverseSpec::None;
        self
    }

    /// Set the inverse behaviour directly
    pub fn with_inverse_spec(mut self, inverse: InverseSpec) -> Self {
        self.inverse = inverse;
        self
    }

    /// Bind the descriptor to its owner model and key, filling in defaults
    pub(crate) fn attach(mut self, owner: &str, key: &str) -> ModelResult<Self> {
        if key.is_empty() || key == "id" {
            return Err(ModelError::Configuration(format!(
                "The {} model declares an association with the invalid key '{}'",
                owner, key
            )));
        }
        if self.polymorphic && self.target.is_some() {
            return Err(ModelError::Configuration(format!(
                "{}.{} is polymorphic and cannot also name a target model",
                owner, key
            )));
        }

        self.owner = owner.to_string();
        self.key = key.to_string();
        if !self.polymorphic && self.target.is_none() {
            self.target = Some(inflection::model_name_for_key(key));
        }
        self.foreign_key = match self.kind {
            AssociationKind::BelongsTo => inflection::belongs_to_foreign_key(key),
            AssociationKind::HasMany => inflection::has_many_foreign_key(key),
        };
        Ok(self)
    }

    pub fn kind(&self) -> AssociationKind {
        self.kind
    }

    /// The key the association is declared under on its owner
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The model declaring the association
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Target model; `None` for polymorphic associations
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn is_polymorphic(&self) -> bool {
        self.polymorphic
    }

    pub fn inverse_spec(&self) -> &InverseSpec {
        &self.inverse
    }

    /// Name of the foreign key field on the owner's records
    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn is_belongs_to(&self) -> bool {
        self.kind == AssociationKind::BelongsTo
    }

    pub fn is_has_many(&self) -> bool {
        self.kind == AssociationKind::HasMany
    }

    /// Self-referential: the target is the owner itself
    pub fn is_reflexive(&self) -> bool {
        self.target.as_deref() == Some(self.owner.as_str())
    }

    /// Whether a record of `model_name` may be referenced by this association
    pub fn can_target(&self, model_name: &str) -> bool {
        self.polymorphic || self.target.as_deref() == Some(model_name)
    }

    /// Identity of the descriptor inside a schema
    pub fn same_as(&self, other: &Association) -> bool {
        self.owner == other.owner && self.key == other.key
    }
}

//! Schema configuration loaded from YAML
//!
//! ```yaml
//! identity:
//!   default: counter
//!   models:
//!     session: uuid
//! models:
//!   user:
//!     posts: { kind: has_many }
//!   post:
//!     author: { kind: belongs_to, model: user, inverse: posts }
//!     comments: { kind: has_many, inverse: null }
//! ```
//!
//! An absent `inverse` is resolved automatically, `inverse: null` declares a
//! one-way association.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::db::IdentityStrategy;
use crate::error::ModelResult;
use crate::model::ModelDefinition;
use crate::relationships::{Association, AssociationKind, InverseSpec};
use crate::schema::SchemaBuilder;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub models: IndexMap<String, IndexMap<String, AssociationConfig>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    #[serde(default)]
    pub default: IdentityStrategy,
    #[serde(default)]
    pub models: IndexMap<String, IdentityStrategy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssociationConfig {
    pub kind: AssociationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub polymorphic: bool,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub inverse: Option<Option<String>>,
}

/// Keeps an explicit `null` apart from an absent field
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl AssociationConfig {
    pub fn inverse_spec(&self) -> InverseSpec {
        match &self.inverse {
            None => InverseSpec::Auto,
            Some(None) => InverseSpec::None,
            Some(Some(key)) => InverseSpec::Named(key.clone()),
        }
    }

    pub fn to_association(&self) -> Association {
        let mut association = match self.kind {
            AssociationKind::BelongsTo => Association::belongs_to(),
            AssociationKind::HasMany => Association::has_many(),
        };
        if let Some(model) = &self.model {
            association = association.model(model.clone());
        }
        if self.polymorphic {
            association = association.polymorphic();
        }
        association.with_inverse_spec(self.inverse_spec())
    }
}

impl SchemaConfig {
    pub fn load(path: impl AsRef<Path>) -> ModelResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&content)?;
        debug!("Loaded schema configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> ModelResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// A schema builder with every configured model and identity strategy
    pub fn into_builder(self) -> SchemaBuilder {
        let mut builder = SchemaBuilder::new().default_identity(self.identity.default);
        for (model_name, associations) in self.models {
            let definition = associations
                .iter()
                .fold(ModelDefinition::new(), |definition, (key, config)| {
                    definition.association(key.clone(), config.to_association())
                });
            builder = builder.model(model_name, definition);
        }
        for (model_name, strategy) in self.identity.models {
            builder = builder.identity_strategy(model_name, strategy);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    const BLOG: &str = r#"
identity:
  models:
    comment: uuid
models:
  user:
    posts: { kind: has_many }
  post:
    author: { kind: belongs_to, model: user, inverse: posts }
    comments: { kind: has_many, inverse: null }
  comment: {}
"#;

    #[test]
    fn test_parse_inverse_forms() {
        let config = SchemaConfig::from_yaml(BLOG).unwrap();
        let post = &config.models["post"];
        assert_eq!(post["author"].inverse_spec(), InverseSpec::Named("posts".to_string()));
        assert_eq!(post["comments"].inverse_spec(), InverseSpec::None);
        assert_eq!(config.models["user"]["posts"].inverse_spec(), InverseSpec::Auto);
        assert_eq!(config.identity.default, IdentityStrategy::Counter);
        assert_eq!(config.identity.models["comment"], IdentityStrategy::Uuid);
    }

    #[test]
    fn test_into_builder_builds_schema() {
        let schema = SchemaConfig::from_yaml(BLOG).unwrap().into_builder().build().unwrap();
        assert_eq!(schema.model_names(), vec!["user", "post", "comment"]);
        assert_eq!(
            schema.association_for("post", "author").unwrap().foreign_key(),
            "authorId"
        );

        let comment = schema.create("comment", ()).unwrap();
        assert_eq!(comment.id().map(|id| id.len()), Some(36));
        let post = schema.create("post", ()).unwrap();
        assert!(post.has_many("comments").unwrap().get().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = SchemaConfig::from_yaml("models:\n  user:\n    posts: { kind: has_many, polymorph: true }\n")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BLOG.as_bytes()).unwrap();

        let config = SchemaConfig::load(file.path()).unwrap();
        assert_eq!(config.models.len(), 3);

        let missing = SchemaConfig::load(file.path().with_extension("missing")).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::Io);
    }
}

//! Schema Registry - model definitions, association metadata and inverse index
//!
//! Built once per schema. Every lookup the association runtime needs is
//! answered from tables computed at registration: associations by key,
//! associations by foreign key, resolved inverses and the dependents that
//! must be cleaned up when a record is destroyed.

use indexmap::IndexMap;
use tracing::debug;

use super::inverse::{resolve_inverses, AssociationMap, InverseIndex};
use super::metadata::Association;
use crate::error::{ModelError, ModelResult};
use crate::inflection;
use crate::model::ModelDefinition;

/// Registered model type
#[derive(Debug, Clone)]
struct ModelEntry {
    collection_name: String,
    associations: IndexMap<String, Association>,
    /// foreign key -> association key
    foreign_keys: IndexMap<String, String>,
}

/// Registry of model types and their associations
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    models: IndexMap<String, ModelEntry>,
    inverses: InverseIndex,
}

impl SchemaRegistry {
    /// Register every model definition and resolve inverses
    pub fn new(definitions: IndexMap<String, ModelDefinition>) -> ModelResult<Self> {
        let mut associations = AssociationMap::new();
        for (model_name, definition) in &definitions {
            let attached = definition
                .associations()
                .iter()
                .map(|(key, association)| {
                    association
                        .clone()
                        .attach(model_name, key)
                        .map(|association| (key.clone(), association))
                })
                .collect::<ModelResult<IndexMap<_, _>>>()?;
            associations.insert(model_name.clone(), attached);
        }

        for model_associations in associations.values() {
            for association in model_associations.values() {
                if let Some(target) = association.target() {
                    if !associations.contains_key(target) {
                        return Err(ModelError::Configuration(format!(
                            "{}.{} references the '{}' model, which has not been registered with the schema",
                            association.owner(),
                            association.key(),
                            target
                        )));
                    }
                }
            }
        }

        let inverses = resolve_inverses(&associations)?;

        let mut models = IndexMap::new();
        for (model_name, model_associations) in associations {
            let foreign_keys = Self::index_foreign_keys(&model_name, &model_associations)?;
            debug!(
                "Registered the {} model with {} association(s)",
                model_name,
                model_associations.len()
            );
            models.insert(
                model_name.clone(),
                ModelEntry {
                    collection_name: inflection::collection_name_for(&model_name),
                    associations: model_associations,
                    foreign_keys,
                },
            );
        }

        Ok(Self { models, inverses })
    }

    fn index_foreign_keys(
        model_name: &str,
        associations: &IndexMap<String, Association>,
    ) -> ModelResult<IndexMap<String, String>> {
        let mut foreign_keys = IndexMap::new();
        for association in associations.values() {
            let foreign_key = association.foreign_key().to_string();
            if associations.contains_key(&foreign_key) || foreign_keys.contains_key(&foreign_key) {
                return Err(ModelError::Configuration(format!(
                    "The foreign key '{}' of {}.{} collides with another association on the {} model",
                    foreign_key,
                    model_name,
                    association.key(),
                    model_name
                )));
            }
            foreign_keys.insert(foreign_key, association.key().to_string());
        }
        Ok(foreign_keys)
    }

    fn entry(&self, model_name: &str) -> ModelResult<&ModelEntry> {
        self.models
            .get(model_name)
            .ok_or_else(|| ModelError::UnknownModel(model_name.to_string()))
    }

    pub fn has_model(&self, model_name: &str) -> bool {
        self.models.contains_key(model_name)
    }

    /// Registered model names, in registration order
    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    /// Name of the record collection backing `model_name`
    pub fn collection_name(&self, model_name: &str) -> ModelResult<&str> {
        Ok(&self.entry(model_name)?.collection_name)
    }

    /// All associations declared on a model, in declaration order
    pub fn associations_for(&self, model_name: &str) -> ModelResult<&IndexMap<String, Association>> {
        Ok(&self.entry(model_name)?.associations)
    }

    /// The association declared under `key`
    pub fn association_for(&self, model_name: &str, key: &str) -> ModelResult<&Association> {
        self.entry(model_name)?
            .associations
            .get(key)
            .ok_or_else(|| ModelError::unknown_association(model_name, key))
    }

    pub fn is_association_key(&self, model_name: &str, key: &str) -> bool {
        self.models
            .get(model_name)
            .map(|entry| entry.associations.contains_key(key))
            .unwrap_or(false)
    }

    /// Foreign key field names of a model, in declaration order
    pub fn foreign_keys_for(&self, model_name: &str) -> ModelResult<Vec<&str>> {
        Ok(self
            .entry(model_name)?
            .foreign_keys
            .keys()
            .map(String::as_str)
            .collect())
    }

    /// The association whose foreign key field is `foreign_key`
    pub fn association_for_foreign_key(&self, model_name: &str, foreign_key: &str) -> Option<&Association> {
        let entry = self.models.get(model_name)?;
        let key = entry.foreign_keys.get(foreign_key)?;
        entry.associations.get(key)
    }

    pub fn is_foreign_key(&self, model_name: &str, key: &str) -> bool {
        self.association_for_foreign_key(model_name, key).is_some()
    }

    /// The inverse of `association` on the concrete `target_model`, if one was resolved
    pub fn inverse_for(&self, association: &Association, target_model: &str) -> Option<&Association> {
        let key = self.inverses.get(&(
            association.owner().to_string(),
            association.key().to_string(),
            target_model.to_string(),
        ))?;
        self.models.get(target_model)?.associations.get(key)
    }

    /// Every association whose foreign key may hold a reference to `model_name`
    pub fn dependent_associations_for(&self, model_name: &str) -> Vec<&Association> {
        self.models
            .values()
            .flat_map(|entry| entry.associations.values())
            .filter(|association| association.can_target(model_name))
            .collect()
    }
}

//! Model lifecycle - save, destroy and reload
//!
//! Saving a model:
//!
//! 1. inserts its record, or writes its plain attributes when it exists
//! 2. saves the unsaved models it holds as pending associations
//! 3. writes each pending association to the store on both sides
//!
//! Destroyed models found in pending state are dropped, never re-inserted.
//!
//! Step 1 always runs before step 2, so by the time an associated model is
//! saved in turn, this model already has an id to link to.

use tracing::debug;

use super::{Model, Pending};
use crate::db::Record;
use crate::error::{ModelError, ModelResult};
use crate::relationships::{integrity, AssociationKind, ModelIdentifier};

impl Model {
    /// Persist the model and every pending association
    pub fn save(&self) -> ModelResult<()> {
        let schema = self.schema().clone();
        let registry = schema.registry();
        let associations = registry.associations_for(self.model_name())?;
        let collection = registry.collection_name(self.model_name())?;

        let mut attrs = self.raw_attrs();
        let record = if self.is_new() {
            for association in associations.values() {
                attrs.insert(
                    association.foreign_key().to_string(),
                    super::empty_value(association),
                );
            }
            let record = schema.db_mut().collection_mut(collection)?.insert(attrs)?;
            debug!("Created {}", self);
            record
        } else {
            let id = self.id().unwrap_or_default();
            let plain: Record = attrs
                .into_iter()
                .filter(|(key, _)| key != "id" && !registry.is_foreign_key(self.model_name(), key))
                .collect();
            schema.db_mut().collection_mut(collection)?.update(&id, &plain)?
        };
        self.replace_attrs(record);

        let owner = self.saved_identifier().ok_or_else(|| {
            ModelError::InvalidOperation(format!("{} could not be saved", self))
        })?;

        let ordered = associations
            .values()
            .filter(|association| association.kind() == AssociationKind::BelongsTo)
            .chain(
                associations
                    .values()
                    .filter(|association| association.kind() == AssociationKind::HasMany),
            );
        for association in ordered {
            let Some(pending) = self.take_pending(association.key()) else {
                continue;
            };
            let targets: Vec<Model> = match pending {
                Pending::Parent(parent) => parent.into_iter().collect::<Vec<_>>(),
                Pending::Children(children) => children,
            }
            .into_iter()
            .filter(|target| !target.is_destroyed())
            .collect();
            for target in &targets {
                if target.is_new() {
                    target.save()?;
                }
            }
            let identifiers: Vec<ModelIdentifier> =
                targets.iter().filter_map(Model::saved_identifier).collect();
            integrity::replace(&schema, &owner, association, &identifiers)?;

            for target in &targets {
                if let Some(inverse) = registry.inverse_for(association, target.model_name()) {
                    target.settle_pending(inverse.key());
                }
            }
        }

        if let Some(record) = schema.record(&owner)? {
            self.replace_attrs(record);
        }
        Ok(())
    }

    /// Remove the record and every reference other records hold to it
    pub fn destroy(&self) -> ModelResult<()> {
        if let Some(identifier) = self.saved_identifier() {
            integrity::disassociate_dependents(self.schema(), &identifier)?;
            let collection = self.schema().collection_name(self.model_name())?;
            self.schema()
                .db_mut()
                .collection_mut(collection)?
                .remove(&identifier.id);
            debug!("Destroyed {}", self);
        }
        self.clear_pending();
        Ok(())
    }

    /// Re-read attributes from the store and drop pending associations
    pub fn reload(&self) -> ModelResult<()> {
        let Some(id) = self.id() else {
            self.clear_pending();
            return Ok(());
        };
        let identifier = ModelIdentifier::new(self.model_name(), id);
        let record = self
            .schema()
            .record(&identifier)?
            .ok_or_else(|| ModelError::not_found(&identifier.model_name, &identifier.id))?;
        self.replace_attrs(record);
        self.clear_pending();
        Ok(())
    }

    /// Attributes that are not foreign keys
    pub fn plain_attrs(&self) -> Record {
        let registry = self.schema().registry();
        self.raw_attrs()
            .into_iter()
            .filter(|(key, _)| !registry.is_foreign_key(self.model_name(), key))
            .collect()
    }
}

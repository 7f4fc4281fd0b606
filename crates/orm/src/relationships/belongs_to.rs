//! BelongsTo Relationship - the single-parent side of an association

use crate::error::{ModelError, ModelResult};
use crate::model::{Attrs, Model};

use super::{Association, ForeignKey};

/// BelongsTo relationship - a model holding at most one parent reference
#[derive(Debug, Clone, Copy)]
pub struct BelongsTo<'a> {
    owner: &'a Model,
    association: &'a Association,
}

impl<'a> BelongsTo<'a> {
    pub(crate) fn new(owner: &'a Model, association: &'a Association) -> Self {
        Self { owner, association }
    }

    pub fn association(&self) -> &'a Association {
        self.association
    }

    pub fn owner(&self) -> &'a Model {
        self.owner
    }

    /// The parent model, pending or stored
    ///
    /// A stored reference to a record that was destroyed reads as `None`.
    pub fn get(&self) -> ModelResult<Option<Model>> {
        Ok(self.owner.current_targets(self.association)?.into_iter().next())
    }

    /// The foreign key value; its id is `None` while the parent is unsaved
    pub fn id(&self) -> ModelResult<Option<ForeignKey>> {
        Ok(self.owner.foreign_key_values(self.association)?.into_iter().next())
    }

    /// Set or clear the parent
    pub fn set(&self, parent: Option<&Model>) -> ModelResult<()> {
        self.owner
            .replace_association(self.association, parent.into_iter().cloned().collect())
    }

    /// Set the parent by foreign key; the referenced record must exist
    pub fn set_id(&self, id: Option<ForeignKey>) -> ModelResult<()> {
        let ids: Vec<ForeignKey> = id.into_iter().collect();
        let parents = self.owner.load_targets(self.association, &ids)?;
        self.owner.replace_association(self.association, parents)
    }

    /// Build an unsaved parent and assign it
    pub fn new_model(&self, attrs: impl Into<Attrs>) -> ModelResult<Model> {
        let model_name = self.target_model()?;
        self.new_polymorphic(&model_name, attrs)
    }

    /// Create a parent, assign it and save the owner
    pub fn create(&self, attrs: impl Into<Attrs>) -> ModelResult<Model> {
        let model_name = self.target_model()?;
        self.create_polymorphic(&model_name, attrs)
    }

    /// Build an unsaved parent of `model_name` and assign it
    pub fn new_polymorphic(&self, model_name: &str, attrs: impl Into<Attrs>) -> ModelResult<Model> {
        self.check_model_name(model_name)?;
        let parent = self.owner.schema().new_model(model_name, attrs)?;
        self.set(Some(&parent))?;
        Ok(parent)
    }

    /// Create a parent of `model_name`, assign it and save the owner
    pub fn create_polymorphic(&self, model_name: &str, attrs: impl Into<Attrs>) -> ModelResult<Model> {
        self.check_model_name(model_name)?;
        let parent = self.owner.schema().create(model_name, attrs)?;
        self.set(Some(&parent))?;
        self.owner.save()?;
        Ok(parent)
    }

    fn target_model(&self) -> ModelResult<String> {
        target_model(self.association)
    }

    fn check_model_name(&self, model_name: &str) -> ModelResult<()> {
        check_model_name(self.association, model_name)
    }
}

/// The fixed target of a non-polymorphic association
pub(super) fn target_model(association: &Association) -> ModelResult<String> {
    association.target().map(String::from).ok_or_else(|| {
        ModelError::InvalidOperation(format!(
            "{}.{} is polymorphic; name the model type to build",
            association.owner(),
            association.key()
        ))
    })
}

pub(super) fn check_model_name(association: &Association, model_name: &str) -> ModelResult<()> {
    if association.can_target(model_name) {
        Ok(())
    } else {
        Err(ModelError::InvalidOperation(format!(
            "{}.{} cannot reference a {} model",
            association.owner(),
            association.key(),
            model_name
        )))
    }
}

//! HasMany Relationship - ordered membership lists

use crate::collection::Collection;
use crate::error::{ModelError, ModelResult};
use crate::model::{Attrs, Model};

use super::belongs_to::{check_model_name, target_model};
use super::{Association, ForeignKey};

/// HasMany relationship - a model holding an ordered list of references
#[derive(Debug, Clone, Copy)]
pub struct HasMany<'a> {
    owner: &'a Model,
    association: &'a Association,
}

impl<'a> HasMany<'a> {
    pub(crate) fn new(owner: &'a Model, association: &'a Association) -> Self {
        Self { owner, association }
    }

    pub fn association(&self) -> &'a Association {
        self.association
    }

    pub fn owner(&self) -> &'a Model {
        self.owner
    }

    /// Current members, pending or stored, in order
    pub fn get(&self) -> ModelResult<Collection> {
        Ok(Collection::new(
            self.association.target().map(String::from),
            self.owner.current_targets(self.association)?,
        ))
    }

    /// One foreign key per member; unsaved members have no id yet
    pub fn ids(&self) -> ModelResult<Vec<ForeignKey>> {
        self.owner.foreign_key_values(self.association)
    }

    /// Replace the full membership
    pub fn set(&self, models: &[Model]) -> ModelResult<()> {
        self.owner.replace_association(self.association, models.to_vec())
    }

    pub fn clear(&self) -> ModelResult<()> {
        self.set(&[])
    }

    /// Replace the membership by foreign keys
    ///
    /// Every key must reference an existing record, otherwise nothing changes.
    pub fn set_ids<I, K>(&self, ids: I) -> ModelResult<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<ForeignKey>,
    {
        let ids: Vec<ForeignKey> = ids.into_iter().map(Into::into).collect();
        let members = self.owner.load_targets(self.association, &ids)?;
        self.owner.replace_association(self.association, members)
    }

    /// Append a member unless it is already present
    pub fn add(&self, model: &Model) -> ModelResult<()> {
        let mut members = self.owner.current_targets(self.association)?;
        if members.iter().any(|member| member.same_record(model)) {
            return Ok(());
        }
        members.push(model.clone());
        self.owner.replace_association(self.association, members)
    }

    pub fn remove(&self, model: &Model) -> ModelResult<()> {
        let members: Vec<Model> = self
            .owner
            .current_targets(self.association)?
            .into_iter()
            .filter(|member| !member.same_record(model))
            .collect();
        self.owner.replace_association(self.association, members)
    }

    /// Build an unsaved member and append it
    pub fn new_model(&self, attrs: impl Into<Attrs>) -> ModelResult<Model> {
        let model_name = target_model(self.association)?;
        self.new_polymorphic(&model_name, attrs)
    }

    /// Create a member and link it on both sides; the owner must be saved
    pub fn create(&self, attrs: impl Into<Attrs>) -> ModelResult<Model> {
        let model_name = target_model(self.association)?;
        self.create_polymorphic(&model_name, attrs)
    }

    pub fn new_polymorphic(&self, model_name: &str, attrs: impl Into<Attrs>) -> ModelResult<Model> {
        check_model_name(self.association, model_name)?;
        let member = self.owner.schema().new_model(model_name, attrs)?;
        self.add(&member)?;
        Ok(member)
    }

    pub fn create_polymorphic(&self, model_name: &str, attrs: impl Into<Attrs>) -> ModelResult<Model> {
        check_model_name(self.association, model_name)?;
        if self.owner.is_new() {
            return Err(ModelError::InvalidOperation(format!(
                "Cannot create {}.{} on {} before it is saved",
                self.association.owner(),
                self.association.key(),
                self.owner
            )));
        }
        let member = self.owner.schema().create(model_name, attrs)?;
        self.add(&member)?;
        Ok(member)
    }
}

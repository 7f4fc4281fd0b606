//! Model System - live handles over stored records
//!
//! - `attrs`: constructor and update arguments
//! - `definition`: declared associations of a model type
//! - `lifecycle`: save, destroy and reload
//!
//! A [`Model`] is a shared handle: clones point at the same in-memory state,
//! the way two references to one object would. Foreign keys of a saved model
//! are always read from the record store. Associations to unsaved models are
//! held in memory as pending state until one side is saved.

pub mod attrs;
pub mod definition;
pub mod lifecycle;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

pub use attrs::{AttrValue, Attrs};
pub use definition::ModelDefinition;

use crate::db::{normalize_id, Record};
use crate::error::{ModelError, ModelResult};
use crate::relationships::foreign_key::{empty_value, stored_references};
use crate::relationships::{
    integrity, Association, AssociationHandle, AssociationKind, BelongsTo, ForeignKey, HasMany,
    ModelIdentifier,
};
use crate::schema::Schema;

/// In-memory association state that is not in the record store yet
#[derive(Debug, Clone)]
pub(crate) enum Pending {
    Parent(Option<Model>),
    Children(Vec<Model>),
}

impl Pending {
    fn into_models(self) -> Vec<Model> {
        match self {
            Pending::Parent(parent) => parent.into_iter().collect(),
            Pending::Children(children) => children,
        }
    }

    fn has_unsaved(&self) -> bool {
        match self {
            Pending::Parent(parent) => parent.iter().any(Model::is_new),
            Pending::Children(children) => children.iter().any(Model::is_new),
        }
    }

    /// Drop destroyed models, returning whether anything was dropped
    fn prune_destroyed(&mut self) -> bool {
        match self {
            Pending::Parent(parent) => {
                if parent.as_ref().is_some_and(Model::is_destroyed) {
                    *parent = None;
                    return true;
                }
                false
            }
            Pending::Children(children) => {
                let before = children.len();
                children.retain(|child| !child.is_destroyed());
                children.len() != before
            }
        }
    }
}

struct ModelState {
    attrs: Record,
    pending: HashMap<String, Pending>,
    /// Set once the record has been in the store
    persisted: bool,
}

/// Handle to one record of a registered model type
#[derive(Clone)]
pub struct Model {
    schema: Schema,
    model_name: Rc<str>,
    state: Rc<RefCell<ModelState>>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("model_name", &self.model_name)
            .field("attrs", &self.state.borrow().attrs)
            .finish()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "model:{}({})", self.model_name, id),
            None => write!(f, "model:{}(new)", self.model_name),
        }
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.same_record(other)
    }
}

impl Model {
    fn with_attrs(schema: Schema, model_name: &str, attrs: Record, persisted: bool) -> Self {
        Self {
            schema,
            model_name: Rc::from(model_name),
            state: Rc::new(RefCell::new(ModelState {
                attrs,
                pending: HashMap::new(),
                persisted,
            })),
        }
    }

    /// Wrap a record read from the store
    pub(crate) fn from_record(schema: Schema, model_name: &str, record: Record) -> Self {
        Self::with_attrs(schema, model_name, record, true)
    }

    /// Build an unsaved model from constructor attributes
    pub(crate) fn build(schema: Schema, model_name: &str, attrs: Attrs) -> ModelResult<Self> {
        let foreign_keys: Vec<(String, Value)> = schema
            .associations_for(model_name)?
            .values()
            .map(|association| (association.foreign_key().to_string(), empty_value(association)))
            .collect();

        let model = Self::with_attrs(schema, model_name, Record::new(), false);
        model.assign(attrs)?;

        let mut state = model.state.borrow_mut();
        for (foreign_key, empty) in foreign_keys {
            state.attrs.entry(foreign_key).or_insert(empty);
        }
        drop(state);
        Ok(model)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn id(&self) -> Option<String> {
        self.state.borrow().attrs.get("id").and_then(normalize_id)
    }

    /// Type and id, once the model has an id
    pub fn identifier(&self) -> Option<ModelIdentifier> {
        self.id()
            .map(|id| ModelIdentifier::new(self.model_name(), id))
    }

    /// The identifier of a model whose record is in the store
    pub(crate) fn saved_identifier(&self) -> Option<ModelIdentifier> {
        self.identifier().filter(|_| self.is_saved())
    }

    /// True when the model has an id and its record is in the store
    pub fn is_saved(&self) -> bool {
        let Some(id) = self.id() else {
            return false;
        };
        let Ok(collection) = self.schema.collection_name(self.model_name()) else {
            return false;
        };
        self.schema
            .db()
            .collection(collection)
            .map(|collection| collection.contains(&id))
            .unwrap_or(false)
    }

    pub fn is_new(&self) -> bool {
        !self.is_saved()
    }

    /// True when the record was in the store once and has been removed since
    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().persisted && !self.is_saved()
    }

    /// Same in-memory model, or both saved with the same type and id
    pub fn same_record(&self, other: &Model) -> bool {
        if Rc::ptr_eq(&self.state, &other.state) {
            return true;
        }
        match (self.saved_identifier(), other.saved_identifier()) {
            (Some(a), Some(b)) => a == b && self.schema.same_schema(&other.schema),
            _ => false,
        }
    }

    /// Snapshot of the attributes, foreign keys included
    pub fn attrs(&self) -> Record {
        let mut attrs = self.state.borrow().attrs.clone();
        if let Ok(associations) = self.schema.associations_for(self.model_name()) {
            for association in associations.values() {
                attrs.insert(
                    association.foreign_key().to_string(),
                    self.foreign_key_value(association),
                );
            }
        }
        attrs
    }

    /// One attribute; foreign keys reflect the current association state
    pub fn attr(&self, key: &str) -> Option<Value> {
        match self
            .schema
            .registry()
            .association_for_foreign_key(self.model_name(), key)
        {
            Some(association) => Some(self.foreign_key_value(association)),
            None => self.state.borrow().attrs.get(key).cloned(),
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.attrs())
    }

    pub fn association_keys(&self) -> Vec<String> {
        self.schema
            .associations_for(self.model_name())
            .map(|associations| associations.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn foreign_keys(&self) -> Vec<String> {
        self.schema
            .foreign_keys_for(self.model_name())
            .map(|keys| keys.into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Set one attribute without saving
    ///
    /// Foreign key names go through the association runtime, so they are
    /// validated and written to both sides like any other assignment.
    pub fn set_attr(&self, key: &str, value: impl Into<AttrValue>) -> ModelResult<()> {
        self.assign(Attrs::new().with(key, value))
    }

    /// Assign attributes then save
    pub fn update(&self, attrs: impl Into<Attrs>) -> ModelResult<()> {
        self.assign(attrs)?;
        self.save()
    }

    /// Assign attributes without saving plain attributes
    ///
    /// Every foreign key and association value is validated before anything
    /// changes. Foreign keys are applied before association keys.
    pub fn assign(&self, attrs: impl Into<Attrs>) -> ModelResult<()> {
        let registry = self.schema.registry();
        let model_name = self.model_name();

        let mut plain = Vec::new();
        let mut by_foreign_key = Vec::new();
        let mut by_association = Vec::new();

        let attrs: Attrs = attrs.into();
        for (key, value) in attrs {
            if let Ok(association) = registry.association_for(model_name, &key) {
                by_association.push((association, self.targets_from_value(association, value)?));
                continue;
            }
            match (registry.association_for_foreign_key(model_name, &key), value) {
                (Some(association), AttrValue::Value(value)) => {
                    let ids = foreign_keys_from_json(association, &value)?;
                    by_foreign_key.push((association, self.load_targets(association, &ids)?));
                }
                (_, AttrValue::Value(value)) => {
                    if key == "id" {
                        self.check_id_change(&value)?;
                    }
                    plain.push((key, value));
                }
                (_, _) => {
                    return Err(ModelError::Configuration(format!(
                        "'{}' is not an association of the {} model and cannot be assigned a model",
                        key, model_name
                    )));
                }
            }
        }

        {
            let mut state = self.state.borrow_mut();
            for (key, value) in plain {
                let value = match (key.as_str(), normalize_id(&value)) {
                    ("id", Some(id)) => Value::String(id),
                    _ => value,
                };
                state.attrs.insert(key, value);
            }
        }

        for (association, targets) in by_foreign_key.into_iter().chain(by_association) {
            self.replace_association(association, targets)?;
        }
        Ok(())
    }

    fn check_id_change(&self, value: &Value) -> ModelResult<()> {
        if let Some(current) = self.saved_identifier() {
            if normalize_id(value).as_deref() != Some(current.id.as_str()) {
                return Err(ModelError::InvalidOperation(format!(
                    "Cannot change the id of {} to {}",
                    self, value
                )));
            }
        }
        Ok(())
    }

    fn targets_from_value(&self, association: &Association, value: AttrValue) -> ModelResult<Vec<Model>> {
        let targets = match (association.kind(), value) {
            (_, AttrValue::Value(Value::Null)) => Vec::new(),
            (AssociationKind::BelongsTo, AttrValue::Model(parent)) => parent.into_iter().collect(),
            (AssociationKind::HasMany, AttrValue::Models(children)) => children,
            (AssociationKind::HasMany, AttrValue::Model(None)) => Vec::new(),
            (AssociationKind::BelongsTo, AttrValue::Models(_)) => {
                return Err(ModelError::InvalidOperation(format!(
                    "{}.{} is a belongs-to association and takes a single model",
                    association.owner(),
                    association.key()
                )));
            }
            (AssociationKind::HasMany, AttrValue::Model(Some(_))) => {
                return Err(ModelError::InvalidOperation(format!(
                    "{}.{} is a has-many association and takes a list of models",
                    association.owner(),
                    association.key()
                )));
            }
            (_, AttrValue::Value(value)) => {
                return Err(ModelError::InvalidOperation(format!(
                    "{}.{} takes models, not {}; assign ids through {}",
                    association.owner(),
                    association.key(),
                    value,
                    association.foreign_key()
                )));
            }
        };
        for target in &targets {
            self.check_target(association, target)?;
        }
        Ok(targets)
    }

    /// Resolve foreign key values to saved models, failing on the first missing record
    pub(crate) fn load_targets(&self, association: &Association, ids: &[ForeignKey]) -> ModelResult<Vec<Model>> {
        ids.iter()
            .map(|id| {
                let identifier = id.to_identifier(association)?;
                self.schema
                    .find_identifier(&identifier)?
                    .ok_or_else(|| ModelError::not_found(&identifier.model_name, &identifier.id))
            })
            .collect()
    }

    /// Reject targets of the wrong type or from another schema
    pub(crate) fn check_target(&self, association: &Association, target: &Model) -> ModelResult<()> {
        if !self.schema.same_schema(&target.schema) {
            return Err(ModelError::InvalidOperation(format!(
                "{} belongs to a different schema than {}",
                target, self
            )));
        }
        if !association.can_target(target.model_name()) {
            return Err(ModelError::InvalidOperation(format!(
                "{}.{} expects a {} model but got {}",
                association.owner(),
                association.key(),
                association.target().unwrap_or("different"),
                target
            )));
        }
        Ok(())
    }

    /// The belongs-to association under `key`
    pub fn belongs_to(&self, key: &str) -> ModelResult<BelongsTo<'_>> {
        match self.association(key)? {
            AssociationHandle::BelongsTo(handle) => Ok(handle),
            AssociationHandle::HasMany(_) => Err(ModelError::InvalidOperation(format!(
                "{}.{} is a has-many association",
                self.model_name, key
            ))),
        }
    }

    /// The has-many association under `key`
    pub fn has_many(&self, key: &str) -> ModelResult<HasMany<'_>> {
        match self.association(key)? {
            AssociationHandle::HasMany(handle) => Ok(handle),
            AssociationHandle::BelongsTo(_) => Err(ModelError::InvalidOperation(format!(
                "{}.{} is a belongs-to association",
                self.model_name, key
            ))),
        }
    }

    /// The association under `key`, whatever its kind
    pub fn association(&self, key: &str) -> ModelResult<AssociationHandle<'_>> {
        let association = self.schema.association_for(self.model_name(), key)?;
        Ok(match association.kind() {
            AssociationKind::BelongsTo => AssociationHandle::BelongsTo(BelongsTo::new(self, association)),
            AssociationKind::HasMany => AssociationHandle::HasMany(HasMany::new(self, association)),
        })
    }

    /// Pending state under `key`, dropped once it no longer holds an unsaved model
    ///
    /// Destroyed models are pruned first; they are neither members nor
    /// candidates for a save cascade.
    pub(crate) fn pending(&self, key: &str) -> Option<Pending> {
        let mut pending = self.state.borrow().pending.get(key).cloned()?;
        let pruned = pending.prune_destroyed();
        if self.is_saved() && !pending.has_unsaved() {
            self.state.borrow_mut().pending.remove(key);
            return None;
        }
        if pruned {
            self.set_pending(key, pending.clone());
        }
        Some(pending)
    }

    /// Drop pending state under `key` that the store now fully reflects
    pub(crate) fn settle_pending(&self, key: &str) {
        self.pending(key);
    }

    pub(crate) fn take_pending(&self, key: &str) -> Option<Pending> {
        self.state.borrow_mut().pending.remove(key)
    }

    fn set_pending(&self, key: &str, pending: Pending) {
        self.state
            .borrow_mut()
            .pending
            .insert(key.to_string(), pending);
    }

    pub(crate) fn clear_pending(&self) {
        self.state.borrow_mut().pending.clear();
    }

    /// Replace the attributes with a record read back from the store
    pub(crate) fn replace_attrs(&self, attrs: Record) {
        let mut state = self.state.borrow_mut();
        state.attrs = attrs;
        state.persisted = true;
    }

    pub(crate) fn raw_attrs(&self) -> Record {
        self.state.borrow().attrs.clone()
    }

    /// References held in the foreign key field, ignoring pending state
    fn stored_foreign_key(&self, association: &Association) -> ModelResult<Vec<ModelIdentifier>> {
        match self.saved_identifier() {
            Some(identifier) => {
                let record = self.schema.record(&identifier)?;
                Ok(stored_references(
                    association,
                    record.as_ref().and_then(|r| r.get(association.foreign_key())),
                ))
            }
            None => {
                let attrs = self.state.borrow();
                Ok(stored_references(association, attrs.attrs.get(association.foreign_key())))
            }
        }
    }

    /// Current members of an association: pending models, else stored references
    ///
    /// References to records that no longer exist are skipped.
    pub(crate) fn current_targets(&self, association: &Association) -> ModelResult<Vec<Model>> {
        if let Some(pending) = self.pending(association.key()) {
            return Ok(pending.into_models());
        }
        let mut targets = Vec::new();
        for identifier in self.stored_foreign_key(association)? {
            if let Some(target) = self.schema.find_identifier(&identifier)? {
                targets.push(target);
            }
        }
        Ok(targets)
    }

    /// Foreign key values, with `None` ids for unsaved members
    pub(crate) fn foreign_key_values(&self, association: &Association) -> ModelResult<Vec<ForeignKey>> {
        if let Some(pending) = self.pending(association.key()) {
            return Ok(pending
                .into_models()
                .iter()
                .map(|target| target.reference_for(association))
                .collect());
        }
        Ok(self
            .stored_foreign_key(association)?
            .iter()
            .map(|identifier| ForeignKey::from_identifier(association, identifier))
            .collect())
    }

    fn foreign_key_value(&self, association: &Association) -> Value {
        let values = self.foreign_key_values(association).unwrap_or_default();
        match association.kind() {
            AssociationKind::BelongsTo => values
                .first()
                .map(ForeignKey::to_json)
                .unwrap_or(Value::Null),
            AssociationKind::HasMany => Value::Array(values.iter().map(ForeignKey::to_json).collect()),
        }
    }

    /// How `association` refers to this model
    fn reference_for(&self, association: &Association) -> ForeignKey {
        let id = self.saved_identifier().map(|identifier| identifier.id);
        if association.is_polymorphic() {
            ForeignKey::Poly {
                model_name: self.model_name().to_string(),
                id,
            }
        } else {
            ForeignKey::Mono(id)
        }
    }

    /// Replace the full membership of an association on this model
    ///
    /// Saved targets of a saved model are written to the store right away,
    /// on both sides. Anything involving an unsaved model is kept pending on
    /// both sides until a save.
    pub(crate) fn replace_association(&self, association: &Association, targets: Vec<Model>) -> ModelResult<()> {
        let mut unique: Vec<Model> = Vec::with_capacity(targets.len());
        for target in targets {
            self.check_target(association, &target)?;
            if !unique.iter().any(|existing| existing.same_record(&target)) {
                unique.push(target);
            }
        }
        if association.is_belongs_to() && unique.len() > 1 {
            return Err(ModelError::InvalidOperation(format!(
                "{}.{} is a belongs-to association and takes a single model",
                association.owner(),
                association.key()
            )));
        }

        let previous = self.current_targets(association)?;

        if let Some(owner) = self.saved_identifier() {
            let saved: Vec<ModelIdentifier> = unique.iter().filter_map(Model::saved_identifier).collect();
            integrity::replace(&self.schema, &owner, association, &saved)?;
        }

        let registry = self.schema.registry();
        for dropped in previous
            .iter()
            .filter(|previous| !unique.iter().any(|target| target.same_record(previous)))
        {
            if let Some(inverse) = registry.inverse_for(association, dropped.model_name()) {
                dropped.forget(self, inverse);
            }
        }

        if self.is_saved() && unique.iter().all(Model::is_saved) {
            self.state.borrow_mut().pending.remove(association.key());
        } else {
            let pending = match association.kind() {
                AssociationKind::BelongsTo => Pending::Parent(unique.first().cloned()),
                AssociationKind::HasMany => Pending::Children(unique.clone()),
            };
            self.set_pending(association.key(), pending);
        }

        for target in &unique {
            if let Some(inverse) = registry.inverse_for(association, target.model_name()) {
                target.associate(self, inverse)?;
            }
        }
        Ok(())
    }

    /// Record `owner` as a member of this model's `inverse` association in memory
    fn associate(&self, owner: &Model, inverse: &Association) -> ModelResult<()> {
        let has_pending = self.state.borrow().pending.contains_key(inverse.key());
        if self.is_saved() && owner.is_saved() && !has_pending {
            return Ok(());
        }
        let pending = match inverse.kind() {
            AssociationKind::BelongsTo => Pending::Parent(Some(owner.clone())),
            AssociationKind::HasMany => {
                let mut members = self.current_targets(inverse)?;
                if !members.iter().any(|member| member.same_record(owner)) {
                    members.push(owner.clone());
                }
                Pending::Children(members)
            }
        };
        self.set_pending(inverse.key(), pending);
        Ok(())
    }

    /// Drop `owner` from this model's pending `inverse` state
    fn forget(&self, owner: &Model, inverse: &Association) {
        let Some(pending) = self.state.borrow().pending.get(inverse.key()).cloned() else {
            return;
        };
        match pending {
            Pending::Parent(Some(parent)) if parent.same_record(owner) => {
                self.state.borrow_mut().pending.remove(inverse.key());
            }
            Pending::Parent(_) => {}
            Pending::Children(mut children) => {
                children.retain(|child| !child.same_record(owner));
                if self.is_saved() && children.iter().all(Model::is_saved) {
                    self.state.borrow_mut().pending.remove(inverse.key());
                } else {
                    self.set_pending(inverse.key(), Pending::Children(children));
                }
            }
        }
    }
}

/// Parse a foreign key field value into references
fn foreign_keys_from_json(association: &Association, value: &Value) -> ModelResult<Vec<ForeignKey>> {
    match (association.kind(), value) {
        (_, Value::Null) => Ok(Vec::new()),
        (AssociationKind::BelongsTo, value) => Ok(vec![ForeignKey::from_json(association, value)?]),
        (AssociationKind::HasMany, Value::Array(items)) => items
            .iter()
            .map(|item| ForeignKey::from_json(association, item))
            .collect(),
        (AssociationKind::HasMany, value) => Err(ModelError::InvalidOperation(format!(
            "{}.{} expects a list but got {}",
            association.owner(),
            association.foreign_key(),
            value
        ))),
    }
}

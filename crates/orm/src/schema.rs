//! Schema - registered model types over one record store
//!
//! A [`Schema`] is a cheap cloneable handle. Every model and collection
//! created through it keeps a handle back to it, so there is no global
//! state: two schemas built in the same process never see each other.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::collection::Collection;
use crate::db::{Db, IdentityManager, IdentityStrategy, Record};
use crate::error::{ModelError, ModelResult};
use crate::model::{Attrs, Model, ModelDefinition};
use crate::relationships::{Association, ModelIdentifier, SchemaRegistry};

struct SchemaInner {
    registry: SchemaRegistry,
    db: RefCell<Db>,
}

/// Handle to a registered set of models and their record store
#[derive(Clone)]
pub struct Schema {
    inner: Rc<SchemaInner>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("models", &self.inner.registry.model_names())
            .finish()
    }
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.inner.registry
    }

    /// Read access to the record store
    pub fn db(&self) -> Ref<'_, Db> {
        self.inner.db.borrow()
    }

    /// Write access to the record store, bypassing the association runtime
    pub fn db_mut(&self) -> RefMut<'_, Db> {
        self.inner.db.borrow_mut()
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.registry().model_names()
    }

    pub fn collection_name(&self, model_name: &str) -> ModelResult<&str> {
        self.registry().collection_name(model_name)
    }

    pub fn associations_for(&self, model_name: &str) -> ModelResult<&IndexMap<String, Association>> {
        self.registry().associations_for(model_name)
    }

    pub fn association_for(&self, model_name: &str, key: &str) -> ModelResult<&Association> {
        self.registry().association_for(model_name, key)
    }

    pub fn is_association_key(&self, model_name: &str, key: &str) -> bool {
        self.registry().is_association_key(model_name, key)
    }

    pub fn foreign_keys_for(&self, model_name: &str) -> ModelResult<Vec<&str>> {
        self.registry().foreign_keys_for(model_name)
    }

    /// Build an unsaved model
    pub fn new_model(&self, model_name: &str, attrs: impl Into<Attrs>) -> ModelResult<Model> {
        Model::build(self.clone(), model_name, attrs.into())
    }

    /// Build a model and save it
    pub fn create(&self, model_name: &str, attrs: impl Into<Attrs>) -> ModelResult<Model> {
        let model = self.new_model(model_name, attrs)?;
        model.save()?;
        Ok(model)
    }

    pub fn find(&self, model_name: &str, id: &str) -> ModelResult<Option<Model>> {
        let collection = self.collection_name(model_name)?;
        let record = self.db().collection(collection)?.find(id);
        Ok(record.map(|record| self.wrap(model_name, record)))
    }

    /// Find every id, in order; fails if any of them is missing
    pub fn find_many<S: AsRef<str>>(&self, model_name: &str, ids: &[S]) -> ModelResult<Collection> {
        let models = ids
            .iter()
            .map(|id| {
                self.find(model_name, id.as_ref())?
                    .ok_or_else(|| ModelError::not_found(model_name, id.as_ref()))
            })
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(Collection::new(Some(model_name.to_string()), models))
    }

    pub fn find_by(&self, model_name: &str, query: &Value) -> ModelResult<Option<Model>> {
        let query = query_record(query)?;
        let collection = self.collection_name(model_name)?;
        let record = self.db().collection(collection)?.find_by(&query);
        Ok(record.map(|record| self.wrap(model_name, record)))
    }

    /// Find the first match for `query`, creating a model from it when none exists
    pub fn find_or_create_by(&self, model_name: &str, query: &Value) -> ModelResult<Model> {
        match self.find_by(model_name, query)? {
            Some(model) => Ok(model),
            None => self.create(model_name, query.clone()),
        }
    }

    pub fn where_query(&self, model_name: &str, query: &Value) -> ModelResult<Collection> {
        let query = query_record(query)?;
        let collection = self.collection_name(model_name)?;
        let records = self.db().collection(collection)?.where_query(&query);
        Ok(self.wrap_all(model_name, records))
    }

    pub fn where_fn<F>(&self, model_name: &str, predicate: F) -> ModelResult<Collection>
    where
        F: Fn(&Record) -> bool,
    {
        let collection = self.collection_name(model_name)?;
        let records = self.db().collection(collection)?.where_fn(predicate);
        Ok(self.wrap_all(model_name, records))
    }

    pub fn all(&self, model_name: &str) -> ModelResult<Collection> {
        let collection = self.collection_name(model_name)?;
        let records = self.db().collection(collection)?.all();
        Ok(self.wrap_all(model_name, records))
    }

    /// An empty collection of `model_name`
    pub fn none(&self, model_name: &str) -> ModelResult<Collection> {
        self.collection_name(model_name)?;
        Ok(Collection::new(Some(model_name.to_string()), Vec::new()))
    }

    pub fn first(&self, model_name: &str) -> ModelResult<Option<Model>> {
        let collection = self.collection_name(model_name)?;
        let record = self.db().collection(collection)?.all().into_iter().next();
        Ok(record.map(|record| self.wrap(model_name, record)))
    }

    /// The model behind `identifier`
    ///
    /// A reference to an unregistered model type points at no record.
    pub(crate) fn find_identifier(&self, identifier: &ModelIdentifier) -> ModelResult<Option<Model>> {
        if !self.registry().has_model(&identifier.model_name) {
            return Ok(None);
        }
        self.find(&identifier.model_name, &identifier.id)
    }

    /// The stored record behind `identifier`
    pub(crate) fn record(&self, identifier: &ModelIdentifier) -> ModelResult<Option<Record>> {
        if !self.registry().has_model(&identifier.model_name) {
            return Ok(None);
        }
        let collection = self.collection_name(&identifier.model_name)?;
        Ok(self.db().collection(collection)?.find(&identifier.id))
    }

    pub(crate) fn update_record(&self, identifier: &ModelIdentifier, attrs: &Record) -> ModelResult<Record> {
        let collection = self.collection_name(&identifier.model_name)?;
        self.db_mut()
            .collection_mut(collection)?
            .update(&identifier.id, attrs)
    }

    pub(crate) fn same_schema(&self, other: &Schema) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn wrap(&self, model_name: &str, record: Record) -> Model {
        Model::from_record(self.clone(), model_name, record)
    }

    fn wrap_all(&self, model_name: &str, records: Vec<Record>) -> Collection {
        let models = records
            .into_iter()
            .map(|record| self.wrap(model_name, record))
            .collect();
        Collection::new(Some(model_name.to_string()), models)
    }
}

fn query_record(query: &Value) -> ModelResult<Record> {
    query
        .as_object()
        .cloned()
        .ok_or_else(|| ModelError::Serialization(format!("A query must be an object, got {}", query)))
}

/// Builder for [`Schema`]
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    models: Vec<(String, ModelDefinition)>,
    identity_managers: IndexMap<String, Box<dyn IdentityManager>>,
    default_identity: IdentityStrategy,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model type
    pub fn model(mut self, model_name: impl Into<String>, definition: ModelDefinition) -> Self {
        self.models.push((model_name.into(), definition));
        self
    }

    /// Use a custom identity manager for one model's collection
    pub fn identity_manager(
        mut self,
        model_name: impl Into<String>,
        manager: Box<dyn IdentityManager>,
    ) -> Self {
        self.identity_managers.insert(model_name.into(), manager);
        self
    }

    /// Use a built-in identity strategy for one model's collection
    pub fn identity_strategy(self, model_name: impl Into<String>, strategy: IdentityStrategy) -> Self {
        self.identity_manager(model_name, strategy.manager())
    }

    /// Identity strategy for every model without an override
    pub fn default_identity(mut self, strategy: IdentityStrategy) -> Self {
        self.default_identity = strategy;
        self
    }

    /// Validate every definition, resolve inverses and create the collections
    pub fn build(self) -> ModelResult<Schema> {
        let mut definitions = IndexMap::new();
        for (model_name, definition) in self.models {
            if model_name.is_empty() {
                return Err(ModelError::Configuration(
                    "Model names cannot be empty".to_string(),
                ));
            }
            if definitions.insert(model_name.clone(), definition).is_some() {
                return Err(ModelError::Configuration(format!(
                    "The {} model is registered more than once",
                    model_name
                )));
            }
        }

        let mut identity_managers = self.identity_managers;
        if let Some(model_name) = identity_managers
            .keys()
            .find(|model_name| !definitions.contains_key(*model_name))
        {
            return Err(ModelError::Configuration(format!(
                "An identity manager was supplied for the unregistered '{}' model",
                model_name
            )));
        }

        let registry = SchemaRegistry::new(definitions)?;
        let mut db = Db::new();
        for model_name in registry.model_names() {
            let identity = identity_managers
                .shift_remove(model_name)
                .unwrap_or_else(|| self.default_identity.manager());
            db.create_collection(registry.collection_name(model_name)?, identity);
        }

        debug!(
            "Built schema with models: {}",
            registry.model_names().join(", ")
        );

        Ok(Schema {
            inner: Rc::new(SchemaInner {
                registry,
                db: RefCell::new(db),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UuidIdentityManager;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::builder()
            .model("user", ModelDefinition::new().has_many("posts"))
            .model("post", ModelDefinition::new().belongs_to("user"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_creates_collections() {
        let schema = schema();
        assert_eq!(schema.db().collection_names(), vec!["users", "posts"]);
        assert_eq!(schema.model_names(), vec!["user", "post"]);
        assert_eq!(schema.foreign_keys_for("user").unwrap(), vec!["postIds"]);
    }

    #[test]
    fn test_duplicate_model_is_rejected() {
        let err = Schema::builder()
            .model("user", ModelDefinition::new())
            .model("user", ModelDefinition::new())
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_identity_manager_for_unknown_model_is_rejected() {
        let err = Schema::builder()
            .model("user", ModelDefinition::new())
            .identity_manager("ghost", Box::new(UuidIdentityManager::new()))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_identity_overrides() {
        let schema = Schema::builder()
            .model("user", ModelDefinition::new())
            .model("post", ModelDefinition::new())
            .default_identity(IdentityStrategy::Uuid)
            .identity_strategy("post", IdentityStrategy::Counter)
            .build()
            .unwrap();

        let user = schema.create("user", ()).unwrap();
        let post = schema.create("post", ()).unwrap();
        assert_eq!(user.id().unwrap().len(), 36);
        assert_eq!(post.id().as_deref(), Some("1"));
    }

    #[test]
    fn test_queries() {
        let schema = schema();
        schema.create("user", json!({ "name": "Link" })).unwrap();
        schema.create("user", json!({ "name": "Zelda" })).unwrap();

        assert_eq!(schema.all("user").unwrap().len(), 2);
        assert_eq!(schema.none("user").unwrap().len(), 0);
        assert_eq!(schema.where_query("user", &json!({ "name": "Zelda" })).unwrap().len(), 1);
        assert_eq!(
            schema.first("user").unwrap().unwrap().attr("name"),
            Some(json!("Link"))
        );
        assert_eq!(
            schema
                .find_by("user", &json!({ "name": "Zelda" }))
                .unwrap()
                .unwrap()
                .id()
                .as_deref(),
            Some("2")
        );
        assert_eq!(schema.where_fn("user", |r| r["name"] == json!("Link")).unwrap().len(), 1);
        assert!(schema.find("user", "9").unwrap().is_none());
        assert!(schema.where_query("user", &json!("name")).is_err());
        assert!(matches!(schema.all("ghost"), Err(ModelError::UnknownModel(_))));
    }

    #[test]
    fn test_find_many_requires_every_id() {
        let schema = schema();
        schema.create("user", ()).unwrap();
        schema.create("user", ()).unwrap();

        assert_eq!(schema.find_many("user", &["2", "1"]).unwrap().ids(), vec!["2", "1"]);
        let err = schema.find_many("user", &["1", "3"]).unwrap_err();
        assert_eq!(err, ModelError::not_found("user", "3"));
    }

    #[test]
    fn test_find_or_create_by() {
        let schema = schema();
        let created = schema.find_or_create_by("user", &json!({ "name": "Link" })).unwrap();
        let found = schema.find_or_create_by("user", &json!({ "name": "Link" })).unwrap();

        assert_eq!(created, found);
        assert_eq!(schema.all("user").unwrap().len(), 1);
    }
}

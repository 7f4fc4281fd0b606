//! Serializer registry - renders model graphs as JSON:API documents

use std::collections::{HashMap, HashSet};

use elif_mock_orm::{AssociationKind, Collection, Model, ModelError, Schema};
use heck::ToKebabCase;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{SerializerError, SerializerResult};
use crate::include::IncludeTree;
use crate::json_api::{linkage, resource_type, JsonApiSerializer};

/// What a document's primary data is built from
#[derive(Debug, Clone)]
pub enum Resource {
    Model(Model),
    Collection(Collection),
    Empty,
}

impl From<Model> for Resource {
    fn from(model: Model) -> Self {
        Resource::Model(model)
    }
}

impl From<&Model> for Resource {
    fn from(model: &Model) -> Self {
        Resource::Model(model.clone())
    }
}

impl From<Collection> for Resource {
    fn from(collection: Collection) -> Self {
        Resource::Collection(collection)
    }
}

impl From<Option<Model>> for Resource {
    fn from(model: Option<Model>) -> Self {
        model.map_or(Resource::Empty, Resource::Model)
    }
}

/// Serializers per model, falling back to a default serializer
#[derive(Debug, Clone)]
pub struct SerializerRegistry {
    schema: Schema,
    serializers: HashMap<String, JsonApiSerializer>,
    fallback: JsonApiSerializer,
}

impl SerializerRegistry {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            serializers: HashMap::new(),
            fallback: JsonApiSerializer::default(),
        }
    }

    /// Use `serializer` for every model of `model_name`
    pub fn register(&mut self, model_name: &str, serializer: JsonApiSerializer) -> SerializerResult<&mut Self> {
        if !self.schema.registry().has_model(model_name) {
            return Err(ModelError::UnknownModel(model_name.to_string()).into());
        }
        self.serializers.insert(model_name.to_string(), serializer);
        Ok(self)
    }

    /// Serializer used for models without a registered one
    pub fn fallback(&mut self, serializer: JsonApiSerializer) -> &mut Self {
        self.fallback = serializer;
        self
    }

    pub fn serializer_for(&self, model_name: &str) -> &JsonApiSerializer {
        self.serializers.get(model_name).unwrap_or(&self.fallback)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Render a JSON:API document
    ///
    /// `include` overrides the default include paths of every serializer
    /// involved; without it each serializer's own defaults apply.
    pub fn serialize(&self, resource: &Resource, include: Option<&str>) -> SerializerResult<Value> {
        let mut document = DocumentBuilder {
            registry: self,
            explicit: include.map(IncludeTree::parse),
            included: Vec::new(),
            seen: HashSet::new(),
            unsaved: Vec::new(),
        };

        let primary: Vec<&Model> = match resource {
            Resource::Model(model) => vec![model],
            Resource::Collection(collection) => collection.iter().collect(),
            Resource::Empty => Vec::new(),
        };
        for model in &primary {
            document.mark_seen(model);
        }

        let mut objects = Vec::with_capacity(primary.len());
        for model in &primary {
            let tree = document.tree_for(model, None);
            objects.push(document.resource_object(model, &tree)?);
        }

        let data = match resource {
            Resource::Model(_) => objects.pop().unwrap_or(Value::Null),
            Resource::Collection(_) => Value::Array(objects),
            Resource::Empty => Value::Null,
        };

        let mut root = Map::new();
        root.insert("data".to_string(), data);
        if !document.included.is_empty() {
            debug!("Serialized document with {} included resources", document.included.len());
            root.insert("included".to_string(), Value::Array(document.included));
        }
        Ok(Value::Object(root))
    }
}

fn resource_key(model: &Model) -> Option<(String, String)> {
    model.id().map(|id| (model.model_name().to_string(), id))
}

struct DocumentBuilder<'r> {
    registry: &'r SerializerRegistry,
    explicit: Option<IncludeTree>,
    included: Vec<Value>,
    seen: HashSet<(String, String)>,
    /// Models without an id, deduplicated by in-memory identity
    unsaved: Vec<Model>,
}

impl DocumentBuilder<'_> {
    /// Record `model` as rendered; false if it already was
    fn mark_seen(&mut self, model: &Model) -> bool {
        match resource_key(model) {
            Some(key) => self.seen.insert(key),
            None if self.unsaved.iter().any(|other| other.same_record(model)) => false,
            None => {
                self.unsaved.push(model.clone());
                true
            }
        }
    }

    /// Include tree for `model`: the requested subtree, or the serializer defaults
    fn tree_for(&self, model: &Model, requested: Option<&IncludeTree>) -> IncludeTree {
        match (&self.explicit, requested) {
            (Some(explicit), None) => explicit.clone(),
            (Some(_), Some(requested)) => requested.clone(),
            (None, requested) => {
                let mut tree = requested.cloned().unwrap_or_default();
                tree.merge(&self.registry.serializer_for(model.model_name()).default_include());
                tree
            }
        }
    }

    fn resource_object(&mut self, model: &Model, tree: &IncludeTree) -> SerializerResult<Value> {
        let serializer = self.registry.serializer_for(model.model_name());
        let mut object = Map::new();
        object.insert(
            "type".to_string(),
            Value::String(resource_type(self.registry.schema(), model.model_name())?),
        );
        object.insert("id".to_string(), json!(model.id()));
        object.insert("attributes".to_string(), serializer.attributes(model));

        let relationships = self.relationships(model, tree, serializer.links_always())?;
        if !relationships.is_empty() {
            object.insert("relationships".to_string(), Value::Object(relationships));
        }
        Ok(Value::Object(object))
    }

    fn relationships(
        &mut self,
        model: &Model,
        tree: &IncludeTree,
        links_always: bool,
    ) -> SerializerResult<Map<String, Value>> {
        if let Some(key) = tree.keys().find(|key| !model.schema().is_association_key(model.model_name(), key)) {
            return Err(SerializerError::InvalidInclude {
                model: model.model_name().to_string(),
                path: key.to_string(),
            });
        }

        let mut relationships = Map::new();
        for key in model.association_keys() {
            let subtree = tree.get(&key);
            if subtree.is_none() && !links_always {
                continue;
            }
            let handle = model.association(&key)?;
            let members = handle.models()?;

            let data = match handle.kind() {
                AssociationKind::BelongsTo => match members.first() {
                    Some(member) => linkage(member)?,
                    None => Value::Null,
                },
                AssociationKind::HasMany => Value::Array(
                    members.iter().map(linkage).collect::<SerializerResult<Vec<_>>>()?,
                ),
            };
            relationships.insert(key.to_kebab_case(), json!({ "data": data }));

            if let Some(subtree) = subtree {
                for member in &members {
                    self.include(member, subtree)?;
                }
            }
        }
        Ok(relationships)
    }

    fn include(&mut self, model: &Model, requested: &IncludeTree) -> SerializerResult<()> {
        let tree = self.tree_for(model, Some(requested));
        if self.mark_seen(model) {
            // Reserve the slot so resources stay in discovery order
            let index = self.included.len();
            self.included.push(Value::Null);
            self.included[index] = self.resource_object(model, &tree)?;
        } else if self.explicit.is_some() && !tree.is_empty() {
            // Already rendered; still follow deeper requested paths
            let links_always = self.registry.serializer_for(model.model_name()).links_always();
            self.relationships(model, &tree, links_always)?;
        }
        Ok(())
    }
}

//! JSON:API serializer options and resource object rendering

use elif_mock_orm::{Model, Schema};
use heck::ToKebabCase;
use serde_json::{json, Map, Value};

use crate::error::SerializerResult;
use crate::include::IncludeTree;

/// Per-model JSON:API serializer options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonApiSerializer {
    include: Vec<String>,
    always_include_linkage_data: bool,
    attrs: Option<Vec<String>>,
}

impl JsonApiSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include paths used when a request names none
    pub fn include<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Emit relationship linkage even for associations that are not included
    pub fn always_include_linkage_data(mut self, enabled: bool) -> Self {
        self.always_include_linkage_data = enabled;
        self
    }

    /// Serialize only these attributes
    pub fn attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs = Some(attrs.into_iter().map(Into::into).collect());
        self
    }

    pub fn default_include(&self) -> IncludeTree {
        IncludeTree::parse(&self.include.join(","))
    }

    pub fn links_always(&self) -> bool {
        self.always_include_linkage_data
    }

    /// The `attributes` member: plain attributes, dasherized, without `id`
    pub fn attributes(&self, model: &Model) -> Value {
        let attributes: Map<String, Value> = model
            .plain_attrs()
            .into_iter()
            .filter(|(key, _)| key != "id")
            .filter(|(key, _)| {
                self.attrs
                    .as_ref()
                    .map_or(true, |allowed| allowed.iter().any(|a| a == key))
            })
            .map(|(key, value)| (key.to_kebab_case(), value))
            .collect();
        Value::Object(attributes)
    }
}

/// The JSON:API `type` of a model: its dasherized collection name
pub fn resource_type(schema: &Schema, model_name: &str) -> SerializerResult<String> {
    Ok(schema.collection_name(model_name)?.to_kebab_case())
}

/// A resource identifier object
pub fn linkage(model: &Model) -> SerializerResult<Value> {
    Ok(json!({
        "type": resource_type(model.schema(), model.model_name())?,
        "id": model.id(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use elif_mock_orm::ModelDefinition;

    fn schema() -> Schema {
        Schema::builder()
            .model("blog-post", ModelDefinition::new().belongs_to("author"))
            .model("author", ModelDefinition::new())
            .build()
            .unwrap()
    }

    #[test]
    fn test_attributes_are_dasherized_without_foreign_keys() {
        let schema = schema();
        let post = schema
            .create("blog-post", json!({ "title": "Hi", "publishedAt": "today" }))
            .unwrap();

        let attributes = JsonApiSerializer::new().attributes(&post);
        assert_eq!(attributes, json!({ "title": "Hi", "published-at": "today" }));

        let only_title = JsonApiSerializer::new().attrs(["title"]).attributes(&post);
        assert_eq!(only_title, json!({ "title": "Hi" }));
    }

    #[test]
    fn test_resource_type_and_linkage() {
        let schema = schema();
        let post = schema.create("blog-post", ()).unwrap();
        assert_eq!(resource_type(&schema, "blog-post").unwrap(), "blog-posts");
        assert_eq!(linkage(&post).unwrap(), json!({ "type": "blog-posts", "id": "1" }));
    }
}

//! JSON:API documents built from association graphs

use elif_mock_orm::{Association, Attrs, ModelDefinition, Schema};
use elif_mock_serializer::{JsonApiSerializer, Resource, SerializerError, SerializerRegistry};
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn blog() -> Schema {
    init_tracing();
    Schema::builder()
        .model("user", ModelDefinition::new().has_many("posts"))
        .model(
            "post",
            ModelDefinition::new()
                .association("author", Association::belongs_to().model("user").inverse("posts"))
                .has_many("comments"),
        )
        .model(
            "comment",
            ModelDefinition::new()
                .belongs_to("post")
                .association("commenter", Association::belongs_to().model("user").no_inverse()),
        )
        .build()
        .unwrap()
}

fn seeded() -> Schema {
    let schema = blog();
    let link = schema.create("user", json!({ "firstName": "Link" })).unwrap();
    let zelda = schema.create("user", json!({ "firstName": "Zelda" })).unwrap();
    let post = link.has_many("posts").unwrap().create(json!({ "title": "Hyrule" })).unwrap();
    let comments = post.has_many("comments").unwrap();
    comments.create(Attrs::new().with("body", "First").with("commenter", &zelda)).unwrap();
    comments.create(Attrs::new().with("body", "Second").with("commenter", &link)).unwrap();
    schema
}

#[test]
fn single_resource_without_includes() {
    let schema = seeded();
    let registry = SerializerRegistry::new(schema.clone());
    let post = schema.find("post", "1").unwrap().unwrap();

    let document = registry.serialize(&post.into(), None).unwrap();
    assert_eq!(
        document,
        json!({
            "data": { "type": "posts", "id": "1", "attributes": { "title": "Hyrule" } }
        })
    );
}

#[test]
fn includes_follow_dotted_paths_and_deduplicate() {
    let schema = seeded();
    let registry = SerializerRegistry::new(schema.clone());
    let post = schema.find("post", "1").unwrap().unwrap();

    let document = registry
        .serialize(&post.into(), Some("author,comments.commenter"))
        .unwrap();

    assert_eq!(
        document["data"]["relationships"],
        json!({
            "author": { "data": { "type": "users", "id": "1" } },
            "comments": { "data": [{ "type": "comments", "id": "1" }, { "type": "comments", "id": "2" }] }
        })
    );
    let included: Vec<(String, String)> = document["included"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| (r["type"].as_str().unwrap().to_string(), r["id"].as_str().unwrap().to_string()))
        .collect();
    assert_eq!(
        included,
        vec![
            ("users".to_string(), "1".to_string()),
            ("comments".to_string(), "1".to_string()),
            ("users".to_string(), "2".to_string()),
            ("comments".to_string(), "2".to_string()),
        ]
    );
    assert_eq!(document["included"][0]["attributes"], json!({ "first-name": "Link" }));
}

#[test]
fn collections_and_empty_documents() {
    let schema = seeded();
    let registry = SerializerRegistry::new(schema.clone());

    let users = registry
        .serialize(&schema.all("user").unwrap().into(), None)
        .unwrap();
    assert_eq!(users["data"].as_array().unwrap().len(), 2);
    assert!(users.get("included").is_none());

    let nothing = registry.serialize(&Resource::Empty, None).unwrap();
    assert_eq!(nothing, json!({ "data": null }));

    let none = registry
        .serialize(&schema.find("user", "9").unwrap().into(), None)
        .unwrap();
    assert_eq!(none, json!({ "data": null }));
}

#[test]
fn serializer_options() {
    let schema = seeded();
    let mut registry = SerializerRegistry::new(schema.clone());
    registry
        .register(
            "comment",
            JsonApiSerializer::new()
                .always_include_linkage_data(true)
                .attrs(["body"]),
        )
        .unwrap()
        .register("post", JsonApiSerializer::new().include(["comments"]))
        .unwrap();

    let comment = schema.find("comment", "1").unwrap().unwrap();
    let document = registry.serialize(&comment.into(), None).unwrap();
    assert_eq!(
        document["data"]["relationships"],
        json!({
            "post": { "data": { "type": "posts", "id": "1" } },
            "commenter": { "data": { "type": "users", "id": "2" } }
        })
    );
    assert!(document.get("included").is_none());

    let post = schema.find("post", "1").unwrap().unwrap();
    let document = registry.serialize(&post.into(), None).unwrap();
    assert_eq!(document["included"].as_array().unwrap().len(), 2);
    assert_eq!(document["included"][0]["attributes"], json!({ "body": "First" }));

    assert!(registry.register("planet", JsonApiSerializer::new()).is_err());
}

#[test]
fn invalid_include_is_rejected() {
    let schema = seeded();
    let registry = SerializerRegistry::new(schema.clone());
    let post = schema.find("post", "1").unwrap().unwrap();

    let err = registry.serialize(&post.into(), Some("title")).unwrap_err();
    assert_eq!(
        err,
        SerializerError::InvalidInclude {
            model: "post".to_string(),
            path: "title".to_string()
        }
    );

    let err = registry
        .serialize(&Resource::from(schema.find("post", "1").unwrap()), Some("comments.likes"))
        .unwrap_err();
    assert!(matches!(err, SerializerError::InvalidInclude { ref model, .. } if model == "comment"));
}

#[test]
fn empty_relationships_render_null_or_empty_lists() {
    let schema = blog();
    let registry = SerializerRegistry::new(schema.clone());
    let post = schema.create("post", ()).unwrap();

    let document = registry.serialize(&post.into(), Some("author,comments")).unwrap();
    assert_eq!(
        document["data"]["relationships"],
        json!({ "author": { "data": null }, "comments": { "data": [] } })
    );
    assert!(document.get("included").is_none());
}

#[test]
fn cyclic_default_includes_over_unsaved_models_terminate() {
    let schema = blog();
    let mut registry = SerializerRegistry::new(schema.clone());
    registry
        .register("user", JsonApiSerializer::new().include(["posts"]))
        .unwrap()
        .register("post", JsonApiSerializer::new().include(["author"]))
        .unwrap();

    let user = schema.new_model("user", json!({ "firstName": "Link" })).unwrap();
    user.has_many("posts").unwrap().new_model(json!({ "title": "Draft" })).unwrap();

    let document = registry.serialize(&user.into(), None).unwrap();
    assert_eq!(
        document,
        json!({
            "data": {
                "type": "users",
                "id": null,
                "attributes": { "first-name": "Link" },
                "relationships": { "posts": { "data": [{ "type": "posts", "id": null }] } }
            },
            "included": [{
                "type": "posts",
                "id": null,
                "attributes": { "title": "Draft" },
                "relationships": { "author": { "data": { "type": "users", "id": null } } }
            }]
        })
    );
}

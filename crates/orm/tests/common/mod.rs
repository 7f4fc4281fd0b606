//! Shared schemas and helpers for the integration tests
#![allow(dead_code)]

use elif_mock_orm::{Association, Model, ModelDefinition, Schema};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Capture library logs in test output; filter with `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// post.user <-> user.posts
pub fn one_to_many() -> Schema {
    init_tracing();
    Schema::builder()
        .model("user", ModelDefinition::new().has_many("posts"))
        .model("post", ModelDefinition::new().belongs_to("user"))
        .build()
        .expect("one-to-many schema")
}

/// user.post <-> post.user
pub fn one_to_one() -> Schema {
    init_tracing();
    Schema::builder()
        .model("user", ModelDefinition::new().belongs_to("post"))
        .model("post", ModelDefinition::new().belongs_to("user"))
        .build()
        .expect("one-to-one schema")
}

/// post.author -> user, without an inverse
pub fn one_way() -> Schema {
    init_tracing();
    Schema::builder()
        .model("user", ModelDefinition::new())
        .model(
            "post",
            ModelDefinition::new().association("author", Association::belongs_to().model("user")),
        )
        .build()
        .expect("one-way schema")
}

/// order.products <-> product.orders
pub fn many_to_many() -> Schema {
    init_tracing();
    Schema::builder()
        .model("order", ModelDefinition::new().has_many("products"))
        .model("product", ModelDefinition::new().has_many("orders"))
        .build()
        .expect("many-to-many schema")
}

/// comment.commentable (polymorphic) <-> post.comment, and
/// tag.taggables (polymorphic) <-> post.tags / video.tags
pub fn polymorphic() -> Schema {
    init_tracing();
    Schema::builder()
        .model(
            "comment",
            ModelDefinition::new().association("commentable", Association::belongs_to().polymorphic()),
        )
        .model(
            "post",
            ModelDefinition::new()
                .association("comment", Association::belongs_to().inverse("commentable"))
                .association("tags", Association::has_many().inverse("taggables")),
        )
        .model(
            "video",
            ModelDefinition::new().association("tags", Association::has_many().inverse("taggables")),
        )
        .model(
            "tag",
            ModelDefinition::new().association("taggables", Association::has_many().polymorphic()),
        )
        .build()
        .expect("polymorphic schema")
}

/// tag.tags (self-inverse), user.parent <-> user.children,
/// user.bestFriend (self-inverse)
pub fn reflexive() -> Schema {
    init_tracing();
    Schema::builder()
        .model("tag", ModelDefinition::new().has_many("tags"))
        .model(
            "user",
            ModelDefinition::new()
                .association("parent", Association::belongs_to().model("user").inverse("children"))
                .association("children", Association::has_many().model("user").inverse("parent"))
                .association("bestFriend", Association::belongs_to().model("user")),
        )
        .build()
        .expect("reflexive schema")
}

/// Stored rows of one collection
pub fn rows(schema: &Schema, collection: &str) -> Value {
    schema.db().dump()[collection].clone()
}

pub fn ids(models: &[Model]) -> Vec<String> {
    models.iter().filter_map(Model::id).collect()
}

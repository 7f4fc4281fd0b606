//! Destroyed records stay destroyed for every handle still holding them

mod common;

use common::{one_to_many, rows};
use elif_mock_orm::Attrs;
use serde_json::json;

#[test]
fn held_parent_forgets_a_destroyed_child() {
    common::init_tracing();
    let schema = one_to_many();
    let user = schema.create("user", ()).unwrap();
    let post = schema.create("post", Attrs::new().with("user", &user)).unwrap();

    post.destroy().unwrap();
    assert!(post.is_destroyed());
    assert!(!user.is_destroyed());

    assert_eq!(user.attr("postIds"), Some(json!([])));
    assert!(user.has_many("posts").unwrap().get().unwrap().is_empty());

    user.save().unwrap();
    assert_eq!(rows(&schema, "posts"), json!([]));
    assert_eq!(rows(&schema, "users"), json!([{ "id": "1", "postIds": [] }]));
}

#[test]
fn held_child_forgets_a_destroyed_parent() {
    let schema = one_to_many();
    let post = schema.create("post", ()).unwrap();
    let user = schema.new_model("user", ()).unwrap();
    post.belongs_to("user").unwrap().set(Some(&user)).unwrap();

    user.save().unwrap();
    assert_eq!(post.attr("userId"), Some(json!("1")));

    user.destroy().unwrap();
    assert!(post.belongs_to("user").unwrap().get().unwrap().is_none());
    assert_eq!(post.attr("userId"), Some(json!(null)));

    post.save().unwrap();
    assert_eq!(rows(&schema, "users"), json!([]));
    assert_eq!(rows(&schema, "posts"), json!([{ "id": "1", "userId": null }]));
}

#[test]
fn unsaved_owner_drops_a_destroyed_member() {
    let schema = one_to_many();
    let user = schema.new_model("user", ()).unwrap();
    let post = schema.create("post", ()).unwrap();
    user.has_many("posts").unwrap().add(&post).unwrap();

    post.destroy().unwrap();
    assert_eq!(user.attr("postIds"), Some(json!([])));

    user.save().unwrap();
    assert_eq!(rows(&schema, "posts"), json!([]));
    assert_eq!(rows(&schema, "users"), json!([{ "id": "1", "postIds": [] }]));
}

#[test]
fn destroyed_means_once_stored() {
    let schema = one_to_many();
    let post = schema.create("post", ()).unwrap();
    let copy = schema.find("post", "1").unwrap().unwrap();
    let fresh = schema.new_model("post", json!({ "id": 7 })).unwrap();

    post.destroy().unwrap();
    assert!(copy.is_destroyed());
    assert!(!fresh.is_destroyed());
    assert!(fresh.is_new());
}

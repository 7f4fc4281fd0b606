//! Has-many runtime across owner / member states

mod common;

use common::{ids, one_to_many, rows};
use elif_mock_orm::{Attrs, ErrorKind, ForeignKey, Model};
use serde_json::json;

#[test]
fn saved_owner_saved_members() {
    let schema = one_to_many();
    let user = schema.create("user", ()).unwrap();
    let first = schema.create("post", ()).unwrap();
    let second = schema.create("post", ()).unwrap();

    user.has_many("posts").unwrap().set(&[second.clone(), first.clone()]).unwrap();

    assert_eq!(user.attr("postIds"), Some(json!(["2", "1"])));
    assert_eq!(first.attr("userId"), Some(json!("1")));
    assert_eq!(second.attr("userId"), Some(json!("1")));
    assert_eq!(user.has_many("posts").unwrap().get().unwrap().ids(), vec!["2", "1"]);
}

#[test]
fn saved_owner_new_members() {
    let schema = one_to_many();
    let user = schema.create("user", ()).unwrap();
    let post = schema.new_model("post", json!({ "title": "Draft" })).unwrap();

    user.has_many("posts").unwrap().set(&[post.clone()]).unwrap();

    assert_eq!(user.has_many("posts").unwrap().ids().unwrap(), vec![ForeignKey::Mono(None)]);
    assert!(post.belongs_to("user").unwrap().get().unwrap().unwrap().same_record(&user));
    assert_eq!(rows(&schema, "posts"), json!([]));

    user.save().unwrap();

    assert!(post.is_saved());
    assert_eq!(rows(&schema, "users"), json!([{ "id": "1", "postIds": ["1"] }]));
    assert_eq!(rows(&schema, "posts"), json!([{ "id": "1", "title": "Draft", "userId": "1" }]));
}

#[test]
fn new_owner_saved_members() {
    let schema = one_to_many();
    let post = schema.create("post", ()).unwrap();
    let user = schema.new_model("user", Attrs::new().with("posts", vec![post.clone()])).unwrap();

    assert_eq!(user.has_many("posts").unwrap().ids().unwrap(), vec![ForeignKey::id("1")]);
    assert_eq!(post.attr("userId"), Some(json!(null)));

    user.save().unwrap();

    assert_eq!(post.attr("userId"), Some(json!("1")));
    assert_eq!(rows(&schema, "users"), json!([{ "id": "1", "postIds": ["1"] }]));
}

#[test]
fn new_owner_new_members() {
    let schema = one_to_many();
    let user = schema.new_model("user", ()).unwrap();
    let posts = user.has_many("posts").unwrap();
    let first = posts.new_model(()).unwrap();
    let second = posts.new_model(()).unwrap();

    assert_eq!(posts.get().unwrap().len(), 2);
    assert_eq!(user.attr("postIds"), Some(json!([null, null])));

    user.save().unwrap();

    assert_eq!(ids(&[first, second]), vec!["1", "2"]);
    assert_eq!(user.attr("postIds"), Some(json!(["1", "2"])));
    assert_eq!(
        rows(&schema, "posts"),
        json!([{ "id": "1", "userId": "1" }, { "id": "2", "userId": "1" }])
    );
}

#[test]
fn saving_a_new_member_links_it_to_the_saved_owner() {
    let schema = one_to_many();
    let user = schema.create("user", ()).unwrap();
    let post = user.has_many("posts").unwrap().new_model(()).unwrap();

    post.save().unwrap();

    assert_eq!(post.attr("userId"), Some(json!("1")));
    assert_eq!(user.attr("postIds"), Some(json!(["1"])));
}

#[test]
fn mixed_members_keep_assignment_order() {
    let schema = one_to_many();
    let user = schema.create("user", ()).unwrap();
    let saved = schema.create("post", ()).unwrap();
    let unsaved = schema.new_model("post", ()).unwrap();

    user.has_many("posts").unwrap().set(&[unsaved.clone(), saved.clone()]).unwrap();
    assert_eq!(
        user.has_many("posts").unwrap().ids().unwrap(),
        vec![ForeignKey::Mono(None), ForeignKey::id("1")]
    );
    assert_eq!(rows(&schema, "users"), json!([{ "id": "1", "postIds": ["1"] }]));

    user.save().unwrap();
    assert_eq!(user.attr("postIds"), Some(json!(["2", "1"])));
}

#[test]
fn create_links_immediately() {
    let schema = one_to_many();
    let user = schema.create("user", ()).unwrap();

    let post = user.has_many("posts").unwrap().create(json!({ "title": "Hi" })).unwrap();

    assert!(post.is_saved());
    assert_eq!(rows(&schema, "users"), json!([{ "id": "1", "postIds": ["1"] }]));
    assert_eq!(rows(&schema, "posts"), json!([{ "id": "1", "title": "Hi", "userId": "1" }]));
}

#[test]
fn create_on_a_new_owner_fails() {
    let schema = one_to_many();
    let user = schema.new_model("user", ()).unwrap();

    let err = user.has_many("posts").unwrap().create(()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert_eq!(rows(&schema, "posts"), json!([]));
}

#[test]
fn removed_members_lose_their_parent() {
    let schema = one_to_many();
    let user = schema.create("user", ()).unwrap();
    let posts = user.has_many("posts").unwrap();
    let first = posts.create(()).unwrap();
    let second = posts.create(()).unwrap();

    posts.set(&[second.clone()]).unwrap();

    assert_eq!(first.attr("userId"), Some(json!(null)));
    assert_eq!(second.attr("userId"), Some(json!("1")));
}

#[test]
fn adding_a_member_steals_it_from_its_previous_owner() {
    let schema = one_to_many();
    let link = schema.create("user", ()).unwrap();
    let zelda = schema.create("user", ()).unwrap();
    let post = link.has_many("posts").unwrap().create(()).unwrap();

    zelda.has_many("posts").unwrap().add(&post).unwrap();

    assert_eq!(link.attr("postIds"), Some(json!([])));
    assert_eq!(zelda.attr("postIds"), Some(json!(["1"])));
    assert_eq!(post.attr("userId"), Some(json!("2")));
}

#[test]
fn clearing_with_null_or_empty_is_the_same() {
    let schema = one_to_many();
    let user = schema.create("user", ()).unwrap();
    let posts = user.has_many("posts").unwrap();
    posts.create(()).unwrap();
    posts.create(()).unwrap();

    user.update(json!({ "postIds": null })).unwrap();
    let after_null = schema.db().dump();

    posts.set_ids(["1", "2"]).unwrap();
    user.update(Attrs::new().with("posts", Vec::<Model>::new())).unwrap();

    assert_eq!(schema.db().dump(), after_null);
    assert_eq!(rows(&schema, "posts"), json!([{ "id": "1", "userId": null }, { "id": "2", "userId": null }]));
}

#[test]
fn assigning_the_same_member_twice_stores_it_once() {
    let schema = one_to_many();
    let user = schema.create("user", ()).unwrap();
    let post = schema.create("post", ()).unwrap();
    let again = schema.find("post", "1").unwrap().unwrap();

    user.has_many("posts").unwrap().set(&[post.clone(), again, post]).unwrap();

    assert_eq!(user.attr("postIds"), Some(json!(["1"])));
}

#[test]
fn set_ids_rejects_missing_records_without_partial_writes() {
    let schema = one_to_many();
    let user = schema.create("user", ()).unwrap();
    schema.create("post", ()).unwrap();
    let before = schema.db().dump();

    let err = user.set_attr("postIds", json!(["1", "3"])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecordNotFound);
    assert_eq!(schema.db().dump(), before);

    let err = user.set_attr("postIds", json!("1")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[test]
fn destroyed_members_drop_out_of_the_list() {
    let schema = one_to_many();
    let user = schema.create("user", ()).unwrap();
    let posts = user.has_many("posts").unwrap();
    let first = posts.create(()).unwrap();
    posts.create(()).unwrap();

    first.destroy().unwrap();
    user.reload().unwrap();

    assert_eq!(posts.get().unwrap().ids(), vec!["2"]);
    assert!(!posts.get().unwrap().includes(&first));
}

#[test]
fn collections_reflect_external_store_changes() {
    let schema = one_to_many();
    let user = schema.create("user", ()).unwrap();
    let post = schema.create("post", ()).unwrap();
    let held = schema.find("user", "1").unwrap().unwrap();

    post.belongs_to("user").unwrap().set(Some(&user)).unwrap();

    assert!(held.has_many("posts").unwrap().get().unwrap().includes(&post));
}

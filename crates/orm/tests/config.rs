//! Schemas declared in YAML behave like schemas declared in code

mod common;

use std::io::Write;

use common::rows;
use elif_mock_orm::{Attrs, ErrorKind, SchemaConfig};
use serde_json::json;

const SCHEMA: &str = r#"
models:
  author:
    books: { kind: has_many }
    mentor: { kind: belongs_to, model: author, inverse: null }
  book:
    author: { kind: belongs_to }
    reviews: { kind: has_many, model: review }
  review:
    book: { kind: belongs_to }
"#;

#[test]
fn yaml_schema_round_trip() {
    common::init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SCHEMA.as_bytes()).unwrap();

    let schema = SchemaConfig::load(file.path()).unwrap().into_builder().build().unwrap();
    let author = schema.create("author", json!({ "name": "Ursula" })).unwrap();
    let book = author.has_many("books").unwrap().create(json!({ "title": "Earthsea" })).unwrap();
    book.has_many("reviews").unwrap().create(json!({ "stars": 5 })).unwrap();

    let mentee = schema.create("author", Attrs::new().with("mentor", &author)).unwrap();
    assert_eq!(mentee.attr("mentorId"), Some(json!("1")));

    assert_eq!(
        rows(&schema, "authors"),
        json!([
            { "id": "1", "name": "Ursula", "bookIds": ["1"], "mentorId": null },
            { "id": "2", "bookIds": [], "mentorId": "1" }
        ])
    );
    assert_eq!(
        rows(&schema, "reviews"),
        json!([{ "id": "1", "stars": 5, "bookId": "1" }])
    );
}

#[test]
fn invalid_yaml_schema_fails_at_build() {
    let config = SchemaConfig::from_yaml(
        "models:\n  book:\n    author: { kind: belongs_to }\n",
    )
    .unwrap();
    let err = config.into_builder().build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

//! # elif-mock-orm: In-memory ORM for mock servers and tests
//!
//! Schema-aware models over an in-process record store, with belongs-to and
//! has-many associations that keep both sides of every relationship in sync.
//! One-to-one, one-to-many, many-to-many, polymorphic and reflexive shapes
//! are all expressed with the same two association kinds.
//!
//! ```
//! use elif_mock_orm::{ModelDefinition, Schema};
//!
//! let schema = Schema::builder()
//!     .model("user", ModelDefinition::new().has_many("posts"))
//!     .model("post", ModelDefinition::new().belongs_to("user"))
//!     .build()?;
//!
//! let user = schema.create("user", serde_json::json!({ "name": "Link" }))?;
//! let post = user.has_many("posts")?.create(())?;
//!
//! assert_eq!(post.attr("userId"), Some(serde_json::json!("1")));
//! assert!(post.belongs_to("user")?.get()?.is_some());
//! # Ok::<(), elif_mock_orm::ModelError>(())
//! ```

pub mod collection;
pub mod config;
pub mod db;
pub mod error;
pub mod inflection;
pub mod model;
pub mod relationships;
pub mod schema;

pub use collection::Collection;
pub use config::{AssociationConfig, IdentityConfig, SchemaConfig};
pub use db::{
    CounterIdentityManager, Db, DbCollection, IdentityManager, IdentityStrategy, Record,
    UuidIdentityManager,
};
pub use error::*;
pub use model::{AttrValue, Attrs, Model, ModelDefinition};
pub use relationships::{
    Association, AssociationHandle, AssociationKind, BelongsTo, ForeignKey, HasMany, InverseSpec,
    ModelIdentifier, SchemaRegistry,
};
pub use schema::{Schema, SchemaBuilder};

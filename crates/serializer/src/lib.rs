//! # elif-mock-serializer: JSON:API documents from elif-mock-orm models
//!
//! ```
//! use elif_mock_orm::{ModelDefinition, Schema};
//! use elif_mock_serializer::{Resource, SerializerRegistry};
//!
//! let schema = Schema::builder()
//!     .model("author", ModelDefinition::new().has_many("books"))
//!     .model("book", ModelDefinition::new().belongs_to("author"))
//!     .build()?;
//! let author = schema.create("author", serde_json::json!({ "name": "Ursula" }))?;
//! author.has_many("books")?.create(serde_json::json!({ "title": "Earthsea" }))?;
//!
//! let registry = SerializerRegistry::new(schema.clone());
//! let document = registry.serialize(&Resource::from(&author), Some("books"))?;
//! assert_eq!(document["included"][0]["attributes"]["title"], "Earthsea");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod include;
pub mod json_api;
pub mod registry;

pub use error::{SerializerError, SerializerResult};
pub use include::IncludeTree;
pub use json_api::JsonApiSerializer;
pub use registry::{Resource, SerializerRegistry};

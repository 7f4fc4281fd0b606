//! Relationships Module - association metadata, inverse resolution and runtime
//!
//! - `metadata`: association descriptors
//! - `registry`: per-model association lookup with resolved inverses
//! - `foreign_key`: typed foreign key values and their stored shapes
//! - `integrity`: two-sided foreign key writes and destroy cascades
//! - `belongs_to`, `has_many`, `handle`: per-model association handles

pub mod belongs_to;
pub mod foreign_key;
pub mod handle;
pub mod has_many;
pub(crate) mod integrity;
pub(crate) mod inverse;
pub mod metadata;
pub mod registry;

pub use belongs_to::BelongsTo;
pub use foreign_key::{ForeignKey, ModelIdentifier};
pub use handle::AssociationHandle;
pub use has_many::HasMany;
pub use metadata::{Association, AssociationKind, InverseSpec};
pub use registry::SchemaRegistry;

//! Schemas, sessions, entity handles, and query sets for Tabula.
//!
//! This crate provides:
//! - [`Schema`] - Resolved models and field tables, built from [`ModelDef`]s
//! - [`Session`] - Folded state plus one update queue per store
//! - [`ModelRef`] - Creates, looks up, and reorders one model's entities
//! - [`Entity`] - A snapshot handle whose writes enqueue actions
//! - [`QuerySet`] - Lazy views, in [`Plain`] or [`Hydrated`] mode
//!
//! Relations are declared with [`Relation`]. Many-to-many pairs live in an
//! auxiliary model generated at build time; deleting an entity clears every
//! reference to it before the delete is folded.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod entity;
pub mod field;
pub mod model;
pub mod query;
pub mod relations;
pub mod schema;
pub mod session;

pub use entity::Entity;
pub use field::{Field, FieldKind, Link, ModelName, Relation, RelationKind, Through};
pub use model::ModelRef;
pub use query::{Hydrated, Lookup, Materialize, Plain, QuerySet};
pub use relations::{ManyLink, Side};
pub use schema::{ModelDef, ModelSchema, Schema, SchemaBuilder};
pub use session::{Database, Session};

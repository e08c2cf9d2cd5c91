//! Core values, identifiers, records, and persistent collections for Tabula.
//!
//! This crate provides:
//! - [`Value`] - The field value type for all Tabula records
//! - [`Id`] - Entity identifiers (integer or string)
//! - [`Record`] - Persistent field-name to value mappings, plus the [`record!`] macro
//! - [`Error`] - Rich error types with context
//! - Persistent collections ([`LtVec`], [`LtMap`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod error;
pub mod id;
pub mod record;
pub mod value;

pub use collections::{LtMap, LtVec};
pub use error::{Error, ErrorContext, ErrorKind};
pub use id::Id;
pub use record::{FieldName, Record};
pub use value::Value;

/// Result type alias using the Tabula error type.
pub type Result<T> = std::result::Result<T, Error>;

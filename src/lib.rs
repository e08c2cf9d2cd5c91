//! Tabula - Normalized in-memory relational store
//!
//! This crate re-exports all layers of the Tabula system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: tabula_model      - Schemas, sessions, entity handles, query sets
//! Layer 1: tabula_storage    - Branches, backends, action queues, fold
//! Layer 0: tabula_foundation - Core types (Value, Id, Record, Error)
//! ```
//!
//! State changes are never written directly. Handles and query sets enqueue
//! actions on the owning store; [`model::Session::next_state`] folds every
//! queue and installs the result as the readable state.

pub use tabula_foundation as foundation;
pub use tabula_model as model;
pub use tabula_storage as storage;

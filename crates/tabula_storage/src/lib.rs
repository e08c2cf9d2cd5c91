//! Branch state, record-store backends, and update queues for Tabula.
//!
//! This crate provides:
//! - [`Branch`] - The state slice owned by one model's store
//! - [`BranchConfig`] - Store configuration (identifier field, form, key names, discipline)
//! - [`Backend`] - Applies actions to a branch ([`PersistentBackend`], [`InPlaceBackend`])
//! - [`Action`] - Queued changes, folded in order by [`fold`]
//! - [`IdAllocator`] - Auto-incrementing integer identifiers
//!
//! With the `serde` feature, the [`layout`] module encodes and decodes
//! branches in their persisted shape.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod action;
pub mod backend;
pub mod branch;
pub mod config;
pub mod ids;
#[cfg(feature = "serde")]
pub mod layout;
pub mod queue;

pub use action::{Action, ActionKind, Direction, Patch, SortKey, SortSpec};
pub use backend::{Backend, InPlaceBackend, PersistentBackend, backend_for};
pub use branch::Branch;
pub use config::{BranchConfig, Discipline};
pub use ids::IdAllocator;
#[cfg(feature = "serde")]
pub use layout::{BranchLayout, BranchSeed};
pub use queue::{UpdateQueue, fold};

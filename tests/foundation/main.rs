//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Value, Id, Record, Error, and persistent collections.

mod collections;
mod errors;

//! Test helpers module
//!
//! Shared setup for the integration tests: an engine wired to an in-memory
//! database and state store, plus generated test data.

#![allow(dead_code)]

pub mod test_context;
pub mod test_data;

pub use test_context::*;
pub use test_data::*;

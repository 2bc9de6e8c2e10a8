//! Common test utilities for the engine integration tests.
//!
//! This module provides shared functionality across all tests:
//! - Test fixtures (pipelines, parameters, engines)
//! - Event assertions

pub mod assertions;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

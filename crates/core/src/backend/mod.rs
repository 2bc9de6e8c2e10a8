//! Processing backend abstraction.
//!
//! This module provides the `Backend` trait (Adapter Pattern) that the
//! execution engine talks to, plus an HTTP adapter for the real REST API and
//! an in-memory mock used by tests and `--mock` runs.

pub mod adapters;
pub mod base;
pub mod factory;

pub use adapters::{HttpBackend, MockBackend, MockPoll};
pub use base::{Backend, BackendError, BackendResult};
pub use factory::{BackendFactory, BackendKind};

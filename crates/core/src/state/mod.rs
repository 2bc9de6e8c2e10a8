//! Session state and its lifecycle.
//!
//! This module provides the per-node records, the output cache and the
//! cancellation registry, the [`Session`](session::Session) that owns them,
//! event emission for state transitions, and the
//! [`SessionManager`](manager::SessionManager) that dispatches front-end
//! operations.

pub mod cancellation;
pub mod manager;
pub mod node;
pub mod output_cache;
pub mod process;
pub mod session;

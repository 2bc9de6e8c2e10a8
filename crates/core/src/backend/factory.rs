//! Backend factory for creating backend instances from configuration.

use crate::backend::adapters::{HttpBackend, MockBackend};
use crate::backend::base::{Backend, BackendResult};
use cr_protocol::config_models::BackendConfig;
use std::sync::Arc;

/// Which adapter a front end asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// The REST API at `backend.base_url`.
    #[default]
    Http,
    /// The in-memory simulator; every node reports running once, then
    /// completes.
    Mock,
}

/// Factory for creating backend instances.
pub struct BackendFactory;

impl BackendFactory {
    /// Create a backend of the requested kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn create(kind: BackendKind, config: &BackendConfig) -> BackendResult<Arc<dyn Backend>> {
        match kind {
            BackendKind::Http => Ok(Arc::new(HttpBackend::new(config)?)),
            BackendKind::Mock => Ok(Arc::new(MockBackend::new())),
        }
    }
}

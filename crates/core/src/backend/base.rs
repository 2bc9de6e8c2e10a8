//! Base Backend trait and its error type.

use async_trait::async_trait;
use cr_protocol::api_models::{AckResponse, HealthResponse, RunRequest, StatusResponse};
use cr_protocol::process_models::ProcessHandle;
use thiserror::Error;

/// Errors raised by a backend adapter.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The request never produced an HTTP response (connect, timeout, ...).
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-2xx status.
    #[error("Backend returned HTTP {status} for {url}: {body}")]
    Status { url: String, status: u16, body: String },

    /// The response body was not the JSON we expected.
    #[error("Failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// The backend does not know the process handle.
    #[error("Unknown process: {0}")]
    UnknownProcess(String),

    /// The backend refused the call for another reason.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Type alias for Result with BackendError.
pub type BackendResult<T> = Result<T, BackendError>;

/// The REST collaborator that does the actual processing.
///
/// Every method is a single request; retry and polling policy live in the
/// engine, not here.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST /run/{nodeId}`. Returns the handle of the accepted process.
    async fn submit_run(&self, request: &RunRequest) -> BackendResult<ProcessHandle>;

    /// `GET /status/{processId}`.
    async fn status(&self, handle: &ProcessHandle) -> BackendResult<StatusResponse>;

    /// `POST /stop/{processId}`.
    async fn stop(&self, handle: &ProcessHandle) -> BackendResult<AckResponse>;

    /// `POST /reset/{processId}`.
    async fn reset(&self, handle: &ProcessHandle) -> BackendResult<AckResponse>;

    /// `GET /health`.
    async fn health(&self) -> BackendResult<HealthResponse>;
}

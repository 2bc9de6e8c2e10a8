//! Request and response bodies of the processing backend REST API.
//!
//! The backend exposes:
//! - `POST /run/{nodeId}`      -> [`RunResponse`]
//! - `GET  /status/{processId}` -> [`StatusResponse`]
//! - `POST /stop/{processId}`  -> [`AckResponse`]
//! - `POST /reset/{processId}` -> [`AckResponse`]
//! - `GET  /health`            -> [`HealthResponse`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::pipeline_models::StageId;
use crate::process_models::{NodeOutput, ProcessHandle, RunParameters};

/// Body of `POST /run/{nodeId}`.
///
/// ```json
/// {
///   "nodeId": "file_search",
///   "parameters": { "expectedRunDate": "2024-01-31", "...": "..." },
///   "previousOutputs": { "reading_config": { "rows": 12 } },
///   "timestamp": "2024-01-31T08:00:00Z"
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub node_id: StageId,
    pub parameters: RunParameters,

    /// Cached outputs of previously completed nodes, keyed by stage id.
    pub previous_outputs: BTreeMap<StageId, NodeOutput>,

    pub timestamp: DateTime<Utc>,
}

/// Response of `POST /run/{nodeId}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct RunResponse {
    pub process_id: ProcessHandle,
}

/// Status of a backend process as reported by `GET /status/{processId}`.
///
/// `completed`, `failed` and `stopped` are terminal from the client's point
/// of view; anything else means "keep polling".
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Stopped,
    /// Any status string this client does not know about.
    #[serde(other)]
    Unknown,
}

impl BackendStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }
}

/// Response of `GET /status/{processId}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct StatusResponse {
    pub status: BackendStatus,

    /// Present once the process has completed.
    #[serde(default)]
    pub output: Option<NodeOutput>,

    #[serde(default)]
    pub error: Option<String>,
}

/// Response of the best-effort `stop` and `reset` calls.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, TS)]
pub struct AckResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `GET /health`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

//! Inter-process communication protocol.
//!
//! This module defines the message types for asynchronous communication
//! between a front end (CLI, dashboard) and the Core (execution engine).
//!
//! The protocol follows an Operation/Event pattern:
//! - `Op`: Commands sent from a front end to Core
//! - `Event`: Status updates sent from Core to the front end
//!
//! Communication is asynchronous and channel-based, so a front end stays
//! responsive while nodes are running on the backend.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::pipeline_models::StageId;
use crate::process_models::{NodeOutput, NodeSnapshot, NodeStatus, ProcessHandle, RunParameters};

/// Operations sent from a front end to the Core logic.
///
/// Uses tagged enum serialization for TypeScript compatibility:
/// ```json
/// {
///   "type": "runNode",
///   "payload": { "node_id": "file_search" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Op {
    /// Validate and store the run parameters.
    ApplyParameters { parameters: RunParameters },

    /// Run a node, running its unmet dependencies first.
    RunNode { node_id: StageId },

    /// Run every node of the pipeline in dependency order.
    RunAll,

    /// Stop a running node.
    StopNode { node_id: StageId },

    /// Reset a node and everything downstream of it.
    ResetNode { node_id: StageId },

    /// Reset every node and clear all cached outputs.
    ResetAll,

    /// Request a snapshot of every node.
    GetDashboardState,

    /// Shut down gracefully. In-flight polls are abandoned.
    Shutdown,
}

/// Events sent from the Core logic to a front end.
///
/// ```json
/// {
///   "type": "nodeStatusUpdate",
///   "payload": { "node_id": "file_search", "status": "running" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// A node's status has changed.
    NodeStatusUpdate { node_id: StageId, status: NodeStatus },

    /// The backend accepted a run for a node.
    NodeSubmitted {
        node_id: StageId,
        process_id: ProcessHandle,
        attempt: u32,
    },

    /// A node completed and its output was cached.
    NodeOutputReady { node_id: StageId, output: NodeOutput },

    /// Informational message about a node.
    NodeLog { node_id: StageId, content: String },

    /// A node-level failure (submission, polling, timeout, backend failure).
    NodeError { node_id: StageId, error: String },

    /// A request-level failure such as a dependency cycle or missing
    /// parameters.
    PipelineError { error: String },

    /// Run parameters were validated and stored.
    ParametersApplied,

    /// Reply to [`Op::GetDashboardState`].
    DashboardState { nodes: Vec<NodeSnapshot> },
}

//! Error types surfaced by the execution engine.

use crate::backend::BackendError;
use cr_protocol::pipeline_models::StageId;
use cr_protocol::process_models::NodeStatus;
use thiserror::Error;

/// Errors returned by engine operations.
///
/// Request-level errors (cycle, parameters, unknown node) leave node state
/// untouched. Node-level errors are also recorded on the node itself.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The dependency graph contains a cycle. Carries the full path with the
    /// repeated node at both ends.
    #[error("Cycle detected: {}", path.join(" -> "))]
    CycleDetected { path: Vec<StageId> },

    /// Run parameters were never applied or have empty fields.
    #[error("Missing run parameters: {}", fields.join(", "))]
    ParametersMissing { fields: Vec<String> },

    /// Run parameters are present but malformed.
    #[error("Invalid run parameters: {reason}")]
    ParametersInvalid { reason: String },

    /// The backend refused or never answered the run request.
    #[error("Failed to submit run for {node_id}: {source}")]
    RunSubmissionFailed {
        node_id: StageId,
        #[source]
        source: BackendError,
    },

    /// Status polling failed.
    #[error("Polling failed for {node_id}: {source}")]
    PollFailed {
        node_id: StageId,
        #[source]
        source: BackendError,
    },

    /// The node was still running after `max_poll_attempts` polls.
    #[error("Timed out waiting for {node_id} after {attempts} polls")]
    Timeout { node_id: StageId, attempts: u32 },

    /// The operation named a node that is not part of the pipeline.
    #[error("Unknown node: {0}")]
    UnknownNode(StageId),

    /// `run_all` stopped at a node that did not complete.
    #[error("Pipeline halted at {node_id} ({status})")]
    PipelineHalted { node_id: StageId, status: NodeStatus },

    /// A backend call outside a node run failed (health check).
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl EngineError {
    /// Errors that concern one node's run and were already recorded on the
    /// node itself.
    pub fn is_node_level(&self) -> bool {
        matches!(
            self,
            Self::RunSubmissionFailed { .. } | Self::PollFailed { .. } | Self::Timeout { .. }
        )
    }
}

/// Type alias for Result with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

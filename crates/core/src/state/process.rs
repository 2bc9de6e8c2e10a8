//! Event emission for node state transitions.
//!
//! Each function reports one transition to the front end. Sending never
//! fails the caller: a closed channel only means nobody is listening.

use cr_protocol::ipc::Event;
use cr_protocol::process_models::{NodeOutput, NodeStatus, ProcessHandle};
use tokio::sync::mpsc::Sender;

/// Emit a status change of `node_id`.
pub async fn publish_status(events_tx: &Sender<Event>, node_id: &str, status: NodeStatus) {
    let _ = events_tx
        .send(Event::NodeStatusUpdate {
            node_id: node_id.to_string(),
            status,
        })
        .await;
}

/// Emit the acceptance of a run by the backend.
///
/// # Arguments
///
/// * `attempt` - Run submissions of this node since its last reset
pub async fn publish_submitted(
    events_tx: &Sender<Event>,
    node_id: &str,
    process_id: &ProcessHandle,
    attempt: u32,
) {
    let _ = events_tx
        .send(Event::NodeSubmitted {
            node_id: node_id.to_string(),
            process_id: process_id.clone(),
            attempt,
        })
        .await;
}

/// Emit the completion of a node: its output, then its new status.
pub async fn publish_completed(
    events_tx: &Sender<Event>,
    node_id: &str,
    output: Option<NodeOutput>,
) {
    if let Some(output) = output {
        let _ = events_tx
            .send(Event::NodeOutputReady {
                node_id: node_id.to_string(),
                output,
            })
            .await;
    }
    publish_status(events_tx, node_id, NodeStatus::Completed).await;
}

/// Emit a node failure: the new status, then the error.
pub async fn publish_failed(events_tx: &Sender<Event>, node_id: &str, error: String) {
    publish_status(events_tx, node_id, NodeStatus::Failed).await;
    let _ = events_tx
        .send(Event::NodeError {
            node_id: node_id.to_string(),
            error,
        })
        .await;
}

pub async fn publish_log(events_tx: &Sender<Event>, node_id: &str, content: String) {
    let _ = events_tx
        .send(Event::NodeLog {
            node_id: node_id.to_string(),
            content,
        })
        .await;
}

/// Emit a request-level failure not tied to a single node.
pub async fn publish_pipeline_error(events_tx: &Sender<Event>, error: String) {
    let _ = events_tx.send(Event::PipelineError { error }).await;
}

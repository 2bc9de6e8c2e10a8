//! Custom assertion helpers for event streams.

use cr_protocol::ipc::Event;
use cr_protocol::process_models::NodeStatus;

/// Statuses published for `node_id`, in order.
pub fn statuses_of(events: &[Event], node_id: &str) -> Vec<NodeStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::NodeStatusUpdate { node_id: id, status } if id == node_id => Some(*status),
            _ => None,
        })
        .collect()
}

/// Whether any NodeError was published for `node_id`.
pub fn has_node_error(events: &[Event], node_id: &str) -> bool {
    events
        .iter()
        .any(|e| matches!(e, Event::NodeError { node_id: id, .. } if id == node_id))
}

/// Assert that `node_id` was never published as running.
pub fn assert_never_ran(events: &[Event], node_id: &str) {
    assert!(
        !statuses_of(events, node_id).contains(&NodeStatus::Running),
        "{node_id} should never have been running, events: {events:?}"
    );
}

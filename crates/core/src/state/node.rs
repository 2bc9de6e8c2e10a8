//! Per-node record held by the session.

use cr_protocol::process_models::{NodeStatus, ProcessHandle};

/// Status, current backend handle, attempt counter and last error of one
/// node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeState {
    pub status: NodeStatus,

    /// Handle of the backend process while a run is in flight.
    pub handle: Option<ProcessHandle>,

    /// Run submissions since the last reset.
    pub attempts: u32,

    pub last_error: Option<String>,
}

impl NodeState {
    pub fn is_running(&self) -> bool {
        self.status == NodeStatus::Running
    }

    /// `idle/failed/completed/stopped -> running`.
    pub fn start(&mut self) {
        self.status = NodeStatus::Running;
        self.handle = None;
        self.attempts += 1;
        self.last_error = None;
    }

    pub fn complete(&mut self) {
        self.status = NodeStatus::Completed;
        self.handle = None;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = NodeStatus::Failed;
        self.handle = None;
        self.last_error = Some(error.into());
    }

    /// Returns the handle that was in flight, if any.
    pub fn stop(&mut self) -> Option<ProcessHandle> {
        self.status = NodeStatus::Stopped;
        self.handle.take()
    }

    /// Back to a pristine `idle` record. Returns the handle that was in
    /// flight, if any.
    pub fn reset(&mut self) -> Option<ProcessHandle> {
        let handle = self.handle.take();
        *self = Self::default();
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_counts_attempts_and_clears_error() {
        let mut node = NodeState::default();
        node.start();
        node.fail("boom");
        assert_eq!(node.last_error.as_deref(), Some("boom"));

        node.start();
        assert_eq!(node.status, NodeStatus::Running);
        assert_eq!(node.attempts, 2);
        assert!(node.last_error.is_none());
    }

    #[test]
    fn test_reset_returns_handle_and_clears_everything() {
        let mut node = NodeState::default();
        node.start();
        node.handle = Some(ProcessHandle("p-1".to_string()));

        assert_eq!(node.reset(), Some(ProcessHandle("p-1".to_string())));
        assert_eq!(node, NodeState::default());
    }
}

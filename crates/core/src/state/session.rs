//! The session: everything that changes while a pipeline is being driven.
//!
//! The session is owned by the engine behind a single async mutex. Every
//! method here is synchronous and is meant to be called while that lock is
//! held, so each one is one critical section. Methods that apply the result
//! of a backend call re-check that the node is still running the same
//! process under a live token before touching anything.

use crate::state::cancellation::CancellationRegistry;
use crate::state::node::NodeState;
use crate::state::output_cache::OutputCache;
use crate::store::PersistedSession;
use cr_protocol::pipeline_models::StageId;
use cr_protocol::process_models::{
    NodeOutput, NodeSnapshot, NodeStatus, ProcessHandle, RunParameters,
};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// Result of [`Session::begin_run`].
#[derive(Debug, Clone)]
pub enum BeginRun {
    /// The node is now `running`.
    Started {
        token: CancellationToken,
        attempt: u32,
    },
    /// Another run of this node is in flight.
    AlreadyRunning,
    /// The node was cancelled before it could start.
    Cancelled,
}

#[derive(Debug, Default)]
pub struct Session {
    /// Declaration order of the pipeline's nodes.
    order: Vec<StageId>,
    nodes: BTreeMap<StageId, NodeState>,
    outputs: OutputCache,
    parameters: Option<RunParameters>,
    cancellation: CancellationRegistry,
}

impl Session {
    pub fn new(node_ids: impl IntoIterator<Item = StageId>) -> Self {
        let order: Vec<StageId> = node_ids.into_iter().collect();
        let nodes = order
            .iter()
            .map(|id| (id.clone(), NodeState::default()))
            .collect();
        Self {
            order,
            nodes,
            ..Self::default()
        }
    }

    pub fn node(&self, node_id: &str) -> Option<&NodeState> {
        self.nodes.get(node_id)
    }

    /// Status of `node_id`; unknown nodes read as `idle`.
    pub fn status(&self, node_id: &str) -> NodeStatus {
        self.nodes
            .get(node_id)
            .map(|node| node.status)
            .unwrap_or_default()
    }

    pub fn outputs(&self) -> &OutputCache {
        &self.outputs
    }

    pub fn parameters(&self) -> Option<&RunParameters> {
        self.parameters.as_ref()
    }

    pub fn set_parameters(&mut self, parameters: Option<RunParameters>) {
        self.parameters = parameters;
    }

    pub fn is_cancelled(&self, node_id: &str) -> bool {
        self.cancellation.is_cancelled(node_id)
    }

    pub fn cancel(&mut self, node_id: &str) {
        self.cancellation.cancel(node_id);
    }

    /// Forget all cancellations. Called at the start of each top-level run.
    pub fn clear_cancellations(&mut self) {
        self.cancellation.clear();
    }

    pub fn cancelled_nodes(&self) -> Vec<StageId> {
        self.cancellation.cancelled()
    }

    /// Check-and-set `running`.
    pub fn begin_run(&mut self, node_id: &str) -> BeginRun {
        if self.cancellation.is_cancelled(node_id) {
            return BeginRun::Cancelled;
        }
        let node = self.nodes.entry(node_id.to_string()).or_default();
        if node.is_running() {
            return BeginRun::AlreadyRunning;
        }
        node.start();
        let attempt = node.attempts;
        BeginRun::Started {
            token: self.cancellation.fresh_token(node_id),
            attempt,
        }
    }

    /// True if `node_id` is running `handle` (or is about to, when `handle`
    /// is `None`) and `token` is live.
    fn owns_run(
        &self,
        node_id: &str,
        handle: Option<&ProcessHandle>,
        token: &CancellationToken,
    ) -> bool {
        if token.is_cancelled() {
            return false;
        }
        match self.nodes.get(node_id) {
            Some(node) if node.is_running() => match handle {
                Some(handle) => node.handle.as_ref() == Some(handle),
                None => true,
            },
            _ => false,
        }
    }

    /// Record the backend handle of a run started by [`Self::begin_run`].
    ///
    /// Returns false if the run was stopped or reset in the meantime.
    pub fn attach_handle(
        &mut self,
        node_id: &str,
        handle: ProcessHandle,
        token: &CancellationToken,
    ) -> bool {
        if !self.owns_run(node_id, None, token) {
            return false;
        }
        match self.nodes.get_mut(node_id) {
            Some(node) => {
                node.handle = Some(handle);
                true
            }
            None => false,
        }
    }

    /// `running -> completed`, caching `output` when there is one.
    pub fn complete(
        &mut self,
        node_id: &str,
        handle: &ProcessHandle,
        token: &CancellationToken,
        output: Option<NodeOutput>,
    ) -> bool {
        if !self.owns_run(node_id, Some(handle), token) {
            return false;
        }
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.complete();
        }
        match output {
            Some(output) => self.outputs.insert(node_id, output),
            None => {
                self.outputs.remove(node_id);
            }
        }
        true
    }

    /// `running -> failed`. `handle` is `None` when submission itself failed.
    pub fn fail(
        &mut self,
        node_id: &str,
        handle: Option<&ProcessHandle>,
        token: &CancellationToken,
        error: impl Into<String>,
    ) -> bool {
        if !self.owns_run(node_id, handle, token) {
            return false;
        }
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.fail(error);
        }
        true
    }

    /// `running -> stopped` after the backend itself reported the process
    /// stopped.
    pub fn settle_stopped(
        &mut self,
        node_id: &str,
        handle: &ProcessHandle,
        token: &CancellationToken,
    ) -> bool {
        if !self.owns_run(node_id, Some(handle), token) {
            return false;
        }
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.stop();
        }
        true
    }

    /// Cancel `node_id` and, if it is running or waiting on dependencies,
    /// mark it `stopped`.
    ///
    /// Returns `None` if the node was not active, otherwise the backend
    /// handle that was in flight (if any).
    pub fn stop(&mut self, node_id: &str) -> Option<Option<ProcessHandle>> {
        self.cancellation.cancel(node_id);
        let node = self.nodes.get_mut(node_id)?;
        match node.status {
            NodeStatus::Running | NodeStatus::Standby => Some(node.stop()),
            _ => None,
        }
    }

    /// Cancel `node_id`, set it `idle` and drop its cached output.
    ///
    /// Returns the handle that was in flight, if any.
    pub fn reset(&mut self, node_id: &str) -> Option<ProcessHandle> {
        self.cancellation.cancel(node_id);
        self.outputs.remove(node_id);
        self.nodes.get_mut(node_id).and_then(NodeState::reset)
    }

    /// Cancel and reset every node. Returns every handle that was in flight.
    pub fn reset_all(&mut self) -> Vec<(StageId, ProcessHandle)> {
        let ids: Vec<StageId> = self.nodes.keys().cloned().collect();
        let mut handles = Vec::new();
        for id in ids {
            if let Some(handle) = self.reset(&id) {
                handles.push((id, handle));
            }
        }
        self.outputs.clear();
        handles
    }

    /// `-> standby`: run requested but dependencies are not all completed.
    ///
    /// A running node is left alone. Returns whether the status changed.
    pub fn set_standby(&mut self, node_id: &str) -> bool {
        match self.nodes.get_mut(node_id) {
            Some(node) if !node.is_running() && node.status != NodeStatus::Standby => {
                node.status = NodeStatus::Standby;
                true
            }
            _ => false,
        }
    }

    pub fn all_completed(&self, node_ids: &[StageId]) -> bool {
        node_ids
            .iter()
            .all(|id| self.status(id) == NodeStatus::Completed)
    }

    /// Running nodes that have a backend handle.
    pub fn pending_handles(&self) -> BTreeMap<StageId, ProcessHandle> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.is_running())
            .filter_map(|(id, node)| {
                node.handle
                    .clone()
                    .map(|handle| (id.clone(), handle))
            })
            .collect()
    }

    /// Token and handle for re-attaching a poll loop to a restored run.
    pub fn resume(&mut self, node_id: &str) -> Option<(ProcessHandle, CancellationToken)> {
        let handle = self
            .nodes
            .get(node_id)
            .filter(|node| node.is_running())
            .and_then(|node| node.handle.clone())?;
        Some((handle, self.cancellation.fresh_token(node_id)))
    }

    /// One snapshot per node, in declaration order.
    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|node| (id, node)))
            .map(|(id, node)| NodeSnapshot {
                node_id: id.clone(),
                status: node.status,
                attempts: node.attempts,
                process_id: node.handle.clone(),
                has_output: self.outputs.contains(id),
                last_error: node.last_error.clone(),
            })
            .collect()
    }

    /// Load persisted state.
    ///
    /// Nodes with a cached output come back `completed`; nodes with a
    /// pending handle come back `running` with that handle. Entries for
    /// nodes this pipeline does not declare are dropped.
    pub fn restore(&mut self, persisted: PersistedSession) {
        self.parameters = persisted.parameters;
        for (id, output) in persisted.outputs {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.status = NodeStatus::Completed;
                self.outputs.insert(id, output);
            }
        }
        for (id, handle) in persisted.pending {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.status = NodeStatus::Running;
                node.handle = Some(handle);
                node.attempts = node.attempts.max(1);
            }
        }
    }

    /// State worth persisting. The graph layout is filled in by the caller.
    pub fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            parameters: self.parameters.clone(),
            outputs: self.outputs.snapshot(),
            pending: self.pending_handles(),
            ..PersistedSession::default()
        }
    }
}

//! In-memory backend used by tests and `control-room --mock`.
//!
//! Each submitted run gets its own copy of the node's poll script. Once the
//! script is exhausted the process keeps reporting `running`.

use crate::backend::base::{Backend, BackendError, BackendResult};
use async_trait::async_trait;
use cr_protocol::api_models::{
    AckResponse, BackendStatus, HealthResponse, RunRequest, StatusResponse,
};
use cr_protocol::pipeline_models::StageId;
use cr_protocol::process_models::{NodeOutput, ProcessHandle};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// One answer to a status poll.
#[derive(Debug, Clone, PartialEq)]
pub enum MockPoll {
    Pending,
    Running,
    Completed(NodeOutput),
    Failed(String),
    Stopped,
    /// The poll itself fails, as if the connection dropped.
    Error(String),
}

#[derive(Default)]
struct MockState {
    scripts: HashMap<StageId, Vec<MockPoll>>,
    rejected: HashSet<StageId>,
    failing_controls: bool,
    processes: HashMap<ProcessHandle, (StageId, VecDeque<MockPoll>)>,
    handles: Vec<(StageId, ProcessHandle)>,
    submissions: Vec<RunRequest>,
    status_calls: Vec<ProcessHandle>,
    stop_calls: Vec<ProcessHandle>,
    reset_calls: Vec<ProcessHandle>,
}

/// Scriptable [`Backend`] that records every call it receives.
///
/// Clones share state, so a test can keep one clone for assertions and hand
/// another to the engine.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Every node reports `running` once, then completes with
    /// `{"node": <id>}`.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the poll script of `node_id`.
    pub fn script(self, node_id: &str, polls: Vec<MockPoll>) -> Self {
        self.lock().scripts.insert(node_id.to_string(), polls);
        self
    }

    /// Complete `node_id` with `output` on the first poll.
    pub fn complete_with(self, node_id: &str, output: NodeOutput) -> Self {
        self.script(node_id, vec![MockPoll::Completed(output)])
    }

    /// Fail `node_id` on the first poll.
    pub fn fail_with(self, node_id: &str, error: &str) -> Self {
        self.script(node_id, vec![MockPoll::Failed(error.to_string())])
    }

    /// Keep `node_id` running forever.
    pub fn hang(self, node_id: &str) -> Self {
        self.script(node_id, Vec::new())
    }

    /// Answer `POST /run/{node_id}` with HTTP 500.
    pub fn reject_runs(self, node_id: &str) -> Self {
        self.lock().rejected.insert(node_id.to_string());
        self
    }

    /// Make every stop and reset call fail.
    pub fn failing_controls(self) -> Self {
        self.lock().failing_controls = true;
        self
    }

    /// Every accepted run request, in submission order.
    pub fn submissions(&self) -> Vec<RunRequest> {
        self.lock().submissions.clone()
    }

    /// Node ids of every accepted run, in submission order.
    pub fn submitted_nodes(&self) -> Vec<StageId> {
        self.lock()
            .submissions
            .iter()
            .map(|r| r.node_id.clone())
            .collect()
    }

    /// Number of status polls issued for runs of `node_id`.
    pub fn status_calls_for(&self, node_id: &str) -> usize {
        let state = self.lock();
        state
            .status_calls
            .iter()
            .filter(|handle| {
                state
                    .processes
                    .get(*handle)
                    .is_some_and(|(node, _)| node == node_id)
            })
            .count()
    }

    pub fn stop_calls(&self) -> Vec<ProcessHandle> {
        self.lock().stop_calls.clone()
    }

    pub fn reset_calls(&self) -> Vec<ProcessHandle> {
        self.lock().reset_calls.clone()
    }

    /// Handle of the most recent run of `node_id`.
    pub fn last_handle(&self, node_id: &str) -> Option<ProcessHandle> {
        self.lock()
            .handles
            .iter()
            .rev()
            .find(|(node, _)| node == node_id)
            .map(|(_, handle)| handle.clone())
    }

    fn default_script(node_id: &str) -> Vec<MockPoll> {
        vec![
            MockPoll::Running,
            MockPoll::Completed(serde_json::json!({ "node": node_id })),
        ]
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn submit_run(&self, request: &RunRequest) -> BackendResult<ProcessHandle> {
        let mut state = self.lock();
        if state.rejected.contains(&request.node_id) {
            return Err(BackendError::Status {
                url: format!("mock://run/{}", request.node_id),
                status: 500,
                body: "Internal Server Error".to_string(),
            });
        }

        let handle = ProcessHandle(Uuid::new_v4().to_string());
        let script = state
            .scripts
            .get(&request.node_id)
            .cloned()
            .unwrap_or_else(|| Self::default_script(&request.node_id));
        state.processes.insert(
            handle.clone(),
            (request.node_id.clone(), script.into_iter().collect()),
        );
        state
            .handles
            .push((request.node_id.clone(), handle.clone()));
        state.submissions.push(request.clone());
        Ok(handle)
    }

    async fn status(&self, handle: &ProcessHandle) -> BackendResult<StatusResponse> {
        let mut state = self.lock();
        state.status_calls.push(handle.clone());
        let Some((_, polls)) = state.processes.get_mut(handle) else {
            return Err(BackendError::UnknownProcess(handle.to_string()));
        };

        let poll = polls.pop_front().unwrap_or(MockPoll::Running);
        let response = |status| StatusResponse {
            status,
            output: None,
            error: None,
        };
        match poll {
            MockPoll::Pending => Ok(response(BackendStatus::Pending)),
            MockPoll::Running => Ok(response(BackendStatus::Running)),
            MockPoll::Stopped => Ok(response(BackendStatus::Stopped)),
            MockPoll::Completed(output) => Ok(StatusResponse {
                output: Some(output),
                ..response(BackendStatus::Completed)
            }),
            MockPoll::Failed(error) => Ok(StatusResponse {
                error: Some(error),
                ..response(BackendStatus::Failed)
            }),
            MockPoll::Error(reason) => Err(BackendError::Unavailable(reason)),
        }
    }

    async fn stop(&self, handle: &ProcessHandle) -> BackendResult<AckResponse> {
        let mut state = self.lock();
        state.stop_calls.push(handle.clone());
        if state.failing_controls {
            return Err(BackendError::Unavailable("stop refused".to_string()));
        }
        if let Some((_, polls)) = state.processes.get_mut(handle) {
            *polls = VecDeque::from([MockPoll::Stopped]);
        }
        Ok(AckResponse {
            status: Some("stopped".to_string()),
            message: None,
        })
    }

    async fn reset(&self, handle: &ProcessHandle) -> BackendResult<AckResponse> {
        let mut state = self.lock();
        state.reset_calls.push(handle.clone());
        if state.failing_controls {
            return Err(BackendError::Unavailable("reset refused".to_string()));
        }
        Ok(AckResponse {
            status: None,
            message: Some("Process reset successfully".to_string()),
        })
    }

    async fn health(&self) -> BackendResult<HealthResponse> {
        Ok(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Some(chrono::Utc::now().timestamp() as f64),
        })
    }
}

//! Run/poll session: submit one node and follow it to a terminal status.

use super::ExecutionEngine;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::poll::status_stream;
use crate::params::check_complete;
use crate::state::process::{publish_completed, publish_failed, publish_status, publish_submitted};
use crate::state::session::BeginRun;
use chrono::Utc;
use cr_protocol::api_models::{BackendStatus, RunRequest};
use cr_protocol::pipeline_models::StageId;
use cr_protocol::process_models::{NodeOutput, NodeStatus, ProcessHandle};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

impl ExecutionEngine {
    /// Submit `node_id` with `previous_outputs` and poll it to completion.
    ///
    /// Fails fast with [`EngineError::ParametersMissing`] before contacting
    /// the backend. Returns `Ok(None)` without submitting if the node is
    /// already running or was cancelled.
    pub(crate) async fn run_and_await(
        &self,
        node_id: &str,
        previous_outputs: BTreeMap<StageId, NodeOutput>,
    ) -> EngineResult<Option<NodeOutput>> {
        let (parameters, token, attempt) = {
            let mut session = self.session.lock().await;
            check_complete(session.parameters())?;
            let parameters = session.parameters().cloned().unwrap_or_default();
            match session.begin_run(node_id) {
                BeginRun::Started { token, attempt } => (parameters, token, attempt),
                BeginRun::AlreadyRunning => {
                    info!(node_id, "Node is already running, not submitting again");
                    return Ok(None);
                }
                BeginRun::Cancelled => {
                    debug!(node_id, "Node cancelled before submission");
                    return Ok(None);
                }
            }
        };
        publish_status(&self.events_tx, node_id, NodeStatus::Running).await;

        let request = RunRequest {
            node_id: node_id.to_string(),
            parameters,
            previous_outputs,
            timestamp: Utc::now(),
        };

        let handle = match self.backend.submit_run(&request).await {
            Ok(handle) => handle,
            Err(source) => {
                let error = EngineError::RunSubmissionFailed {
                    node_id: node_id.to_string(),
                    source,
                };
                warn!(node_id, error = %error, "Run submission failed");
                self.settle_failure(node_id, None, &token, error.to_string())
                    .await;
                return Err(error);
            }
        };

        let attached = self
            .session
            .lock()
            .await
            .attach_handle(node_id, handle.clone(), &token);
        if !attached {
            // Stopped or reset while the submission was in flight.
            info!(node_id, process_id = %handle, "Run cancelled during submission, stopping it");
            if let Err(e) = self.backend.stop(&handle).await {
                warn!(node_id, process_id = %handle, error = %e, "Backend stop failed");
            }
            return Ok(None);
        }

        info!(node_id, process_id = %handle, attempt, "Run submitted");
        publish_submitted(&self.events_tx, node_id, &handle, attempt).await;
        self.persist().await;

        self.await_completion(node_id, handle, token).await
    }

    /// Poll `handle` until it is terminal or `token` is cancelled.
    ///
    /// A cancelled token means the node was stopped or reset; whoever did
    /// that already owns the node's state, so nothing is applied.
    pub(crate) async fn await_completion(
        &self,
        node_id: &str,
        handle: ProcessHandle,
        token: CancellationToken,
    ) -> EngineResult<Option<NodeOutput>> {
        let mut polls = status_stream(
            Arc::clone(&self.backend),
            handle.clone(),
            self.settings.poll_interval,
            self.settings.poll_error_retries,
        );
        let mut attempts = 0u32;

        loop {
            let next = tokio::select! {
                _ = token.cancelled() => {
                    debug!(node_id, process_id = %handle, "Polling abandoned");
                    return Ok(None);
                }
                next = polls.next() => next,
            };
            let Some(next) = next else {
                return Ok(None);
            };
            attempts += 1;

            let response = match next {
                Ok(response) => response,
                Err(source) => {
                    let error = EngineError::PollFailed {
                        node_id: node_id.to_string(),
                        source,
                    };
                    warn!(node_id, process_id = %handle, error = %error, "Polling failed");
                    self.settle_failure(node_id, Some(&handle), &token, error.to_string())
                        .await;
                    return Err(error);
                }
            };

            match response.status {
                BackendStatus::Completed => {
                    let output = response.output;
                    let applied = self.session.lock().await.complete(
                        node_id,
                        &handle,
                        &token,
                        output.clone(),
                    );
                    if !applied {
                        return Ok(None);
                    }
                    info!(node_id, process_id = %handle, polls = attempts, "Node completed");
                    publish_completed(&self.events_tx, node_id, output.clone()).await;
                    self.persist().await;
                    return Ok(output);
                }
                BackendStatus::Failed => {
                    let message = response
                        .error
                        .unwrap_or_else(|| "Backend reported failure".to_string());
                    warn!(node_id, process_id = %handle, error = %message, "Node failed");
                    self.settle_failure(node_id, Some(&handle), &token, message)
                        .await;
                    return Ok(None);
                }
                BackendStatus::Stopped => {
                    let applied = self
                        .session
                        .lock()
                        .await
                        .settle_stopped(node_id, &handle, &token);
                    if applied {
                        info!(node_id, process_id = %handle, "Backend reported the process stopped");
                        publish_status(&self.events_tx, node_id, NodeStatus::Stopped).await;
                        self.persist().await;
                    }
                    return Ok(None);
                }
                other => {
                    debug!(node_id, process_id = %handle, status = ?other, "Still running");
                }
            }

            if let Some(max) = self.settings.max_poll_attempts {
                if attempts >= max {
                    let error = EngineError::Timeout {
                        node_id: node_id.to_string(),
                        attempts,
                    };
                    warn!(node_id, process_id = %handle, error = %error, "Giving up on node");
                    self.settle_failure(node_id, Some(&handle), &token, error.to_string())
                        .await;
                    return Err(error);
                }
            }
        }
    }

    /// Mark the run failed if it still owns the node, then report it.
    async fn settle_failure(
        &self,
        node_id: &str,
        handle: Option<&ProcessHandle>,
        token: &CancellationToken,
        message: String,
    ) {
        let applied = self
            .session
            .lock()
            .await
            .fail(node_id, handle, token, message.clone());
        if applied {
            publish_failed(&self.events_tx, node_id, message).await;
            self.persist().await;
        }
    }
}

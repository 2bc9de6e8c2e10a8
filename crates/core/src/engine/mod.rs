//! Dependency-aware execution engine.
//!
//! The ExecutionEngine runs a node by first running whatever it depends on,
//! left to right and paced by `step_delay`, then submitting the node itself
//! to the backend and polling it to completion. Every state change goes
//! through the [`Session`] and is reported as an [`Event`].

pub mod error;
pub mod poll;
mod reset;
mod run;

use crate::backend::Backend;
use crate::engine::error::{EngineError, EngineResult};
use crate::graph::{
    build_dependency_map, build_downstream_map, find_cycle, topological_order, DependencyMap,
    DownstreamMap,
};
use crate::params::{check_complete, validate_parameters};
use crate::state::process::{publish_log, publish_status};
use crate::state::session::Session;
use crate::store::{GraphLayout, PersistedSession, SessionStore};
use cr_protocol::api_models::HealthResponse;
use cr_protocol::config_models::ExecutionConfig;
use cr_protocol::ipc::Event;
use cr_protocol::pipeline_models::{PipelineDefinition, StageId};
use cr_protocol::process_models::{NodeOutput, NodeSnapshot, NodeStatus, RunParameters};
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Pacing and polling knobs, resolved from `[execution]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub poll_interval: Duration,
    pub step_delay: Duration,
    pub poll_error_retries: u32,
    pub max_poll_attempts: Option<u32>,
}

impl From<&ExecutionConfig> for EngineSettings {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            step_delay: Duration::from_millis(config.step_delay_ms),
            poll_error_retries: config.poll_error_retries,
            max_poll_attempts: config.max_poll_attempts,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&ExecutionConfig::default())
    }
}

/// Bookkeeping for one top-level `run_node` call.
#[derive(Debug, Default)]
struct RunContext {
    /// Nodes already processed during this call, whatever the outcome.
    already_run: HashSet<StageId>,
    /// Current recursion path, for cycle detection.
    path: Vec<StageId>,
}

type ResolveFuture<'a> =
    Pin<Box<dyn Future<Output = EngineResult<Option<NodeOutput>>> + Send + 'a>>;

/// Drives one pipeline against one backend.
pub struct ExecutionEngine {
    pipeline: PipelineDefinition,
    dependency_map: DependencyMap,
    downstream_map: DownstreamMap,
    backend: Arc<dyn Backend>,
    session: Mutex<Session>,
    store: Option<Arc<dyn SessionStore>>,
    settings: EngineSettings,
    events_tx: Sender<Event>,
}

impl ExecutionEngine {
    /// Create an engine with a fresh, all-idle session.
    ///
    /// # Arguments
    ///
    /// * `pipeline` - The stages and edges to drive
    /// * `backend` - The processing backend
    /// * `settings` - Pacing and polling knobs
    /// * `events_tx` - Channel for sending events to the front end
    pub fn new(
        pipeline: PipelineDefinition,
        backend: Arc<dyn Backend>,
        settings: EngineSettings,
        events_tx: Sender<Event>,
    ) -> Self {
        let dependency_map = build_dependency_map(&pipeline.edges);
        let downstream_map = build_downstream_map(&pipeline.edges);
        let session = Session::new(pipeline.node_ids());

        Self {
            pipeline,
            dependency_map,
            downstream_map,
            backend,
            session: Mutex::new(session),
            store: None,
            settings,
            events_tx,
        }
    }

    /// Attach a store and restore whatever it holds for this pipeline.
    ///
    /// Missing or corrupt state yields an empty session; corrupt state is
    /// logged.
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        match PersistedSession::load_from(store.as_ref(), &self.pipeline.name) {
            Ok(persisted) => {
                if !persisted.layout.nodes.is_empty() && persisted.layout != self.layout() {
                    info!(
                        pipeline = %self.pipeline.name,
                        "Pipeline layout changed since last session, dropping state of removed nodes"
                    );
                }
                self.session.get_mut().restore(persisted);
            }
            Err(e) => {
                warn!(pipeline = %self.pipeline.name, error = %e, "Ignoring unreadable session state");
            }
        }
        self.store = Some(store);
        self
    }

    pub fn pipeline(&self) -> &PipelineDefinition {
        &self.pipeline
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Direct dependencies of `node_id`.
    pub fn dependencies(&self, node_id: &str) -> &[StageId] {
        self.dependency_map
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Direct dependents of `node_id`.
    pub fn dependents(&self, node_id: &str) -> &[StageId] {
        self.downstream_map
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub async fn status(&self, node_id: &str) -> NodeStatus {
        self.session.lock().await.status(node_id)
    }

    pub async fn output(&self, node_id: &str) -> Option<NodeOutput> {
        self.session.lock().await.outputs().get(node_id).cloned()
    }

    pub async fn parameters(&self) -> Option<RunParameters> {
        self.session.lock().await.parameters().cloned()
    }

    pub async fn snapshot(&self) -> Vec<NodeSnapshot> {
        self.session.lock().await.snapshot()
    }

    /// Running nodes with a backend handle. Right after a restore these are
    /// the runs that need [`Self::resume_node`].
    pub async fn pending_runs(&self) -> Vec<StageId> {
        self.session
            .lock()
            .await
            .pending_handles()
            .into_keys()
            .collect()
    }

    fn ensure_known(&self, node_id: &str) -> EngineResult<()> {
        if self.pipeline.contains(node_id) {
            Ok(())
        } else {
            Err(EngineError::UnknownNode(node_id.to_string()))
        }
    }

    fn layout(&self) -> GraphLayout {
        GraphLayout {
            nodes: self.pipeline.node_ids(),
            edges: self.pipeline.edges.clone(),
        }
    }

    /// Write the session to the store, if there is one. Failures are logged.
    async fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let mut persisted = self.session.lock().await.to_persisted();
        persisted.layout = self.layout();
        if let Err(e) = persisted.save_to(store.as_ref(), &self.pipeline.name) {
            warn!(pipeline = %self.pipeline.name, error = %e, "Failed to persist session state");
        }
    }

    async fn pace(&self) {
        if !self.settings.step_delay.is_zero() {
            tokio::time::sleep(self.settings.step_delay).await;
        }
    }

    async fn is_cancelled(&self, node_id: &str) -> bool {
        self.session.lock().await.is_cancelled(node_id)
    }

    /// Validate and store run parameters.
    ///
    /// On failure the previously stored parameters are cleared, so nothing
    /// can run until valid parameters are applied again.
    pub async fn apply_parameters(&self, parameters: &RunParameters) -> EngineResult<()> {
        let result = validate_parameters(parameters);
        {
            let mut session = self.session.lock().await;
            session.set_parameters(result.as_ref().ok().cloned());
        }
        self.persist().await;

        result?;
        info!(pipeline = %self.pipeline.name, "Run parameters applied");
        let _ = self.events_tx.send(Event::ParametersApplied).await;
        Ok(())
    }

    /// Run `node_id`, running its unmet dependencies first.
    ///
    /// Returns the node's output when it completed during this call or was
    /// already completed. Returns `Ok(None)` when the node was already
    /// running, was cancelled, failed on the backend, or is waiting on a
    /// dependency that did not complete (`standby`).
    ///
    /// # Errors
    ///
    /// - [`EngineError::UnknownNode`] for ids outside the pipeline
    /// - [`EngineError::ParametersMissing`] before anything is submitted
    /// - [`EngineError::CycleDetected`] if the upstream closure has a cycle
    /// - [`EngineError::RunSubmissionFailed`], [`EngineError::PollFailed`],
    ///   [`EngineError::Timeout`] when the node itself could not be run
    pub async fn run_node(&self, node_id: &str) -> EngineResult<Option<NodeOutput>> {
        self.ensure_known(node_id)?;
        {
            let mut session = self.session.lock().await;
            if session.status(node_id) == NodeStatus::Running {
                info!(node_id, "Node is already running, ignoring run request");
                return Ok(None);
            }
            check_complete(session.parameters())?;
            session.clear_cancellations();
        }

        let mut context = RunContext::default();
        self.resolve(node_id.to_string(), &mut context).await
    }

    /// Recursive step of [`Self::run_node`].
    fn resolve<'a>(&'a self, node_id: StageId, context: &'a mut RunContext) -> ResolveFuture<'a> {
        Box::pin(async move {
            {
                let session = self.session.lock().await;
                if session.is_cancelled(&node_id) {
                    debug!(node_id = %node_id, "Skipping cancelled node");
                    return Ok(None);
                }
                if context.already_run.contains(&node_id)
                    || session.status(&node_id) == NodeStatus::Completed
                {
                    return Ok(session.outputs().get(&node_id).cloned());
                }
            }

            if context.path.contains(&node_id) {
                let mut path = context.path.clone();
                path.push(node_id);
                return Err(EngineError::CycleDetected { path });
            }

            let deps = self.dependencies(&node_id).to_vec();
            let mut previous_outputs = BTreeMap::new();
            context.path.push(node_id.clone());
            for (index, dep) in deps.iter().enumerate() {
                if self.is_cancelled(&node_id).await {
                    context.path.pop();
                    return Ok(None);
                }
                match self.resolve(dep.clone(), context).await {
                    Ok(Some(output)) => {
                        previous_outputs.insert(dep.clone(), output);
                    }
                    Ok(None) => {}
                    // Contained to the dependency; this node goes to standby below.
                    Err(e) if e.is_node_level() => {
                        warn!(node_id = %dep, error = %e, "Dependency did not run");
                    }
                    Err(e) => {
                        context.path.pop();
                        return Err(e);
                    }
                }
                if index + 1 < deps.len() {
                    self.pace().await;
                }
            }
            context.path.pop();

            if !deps.is_empty() {
                self.pace().await;
            }
            if self.is_cancelled(&node_id).await {
                return Ok(None);
            }

            let merged = {
                let mut session = self.session.lock().await;
                if !session.all_completed(&deps) {
                    let waiting: Vec<&str> = deps
                        .iter()
                        .filter(|dep| session.status(dep) != NodeStatus::Completed)
                        .map(String::as_str)
                        .collect();
                    let message = format!("Waiting on {}", waiting.join(", "));
                    let parked = session.set_standby(&node_id);
                    drop(session);
                    if parked {
                        info!(node_id = %node_id, %message, "Dependencies not completed, node on standby");
                        publish_status(&self.events_tx, &node_id, NodeStatus::Standby).await;
                        publish_log(&self.events_tx, &node_id, message).await;
                    }
                    context.already_run.insert(node_id);
                    return Ok(None);
                }
                let mut merged = session.outputs().snapshot();
                merged.extend(previous_outputs);
                merged
            };

            // Processed whatever the outcome, so a second branch reaching
            // this node does not submit it again.
            let result = self.run_and_await(&node_id, merged).await;
            context.already_run.insert(node_id);
            result
        })
    }

    /// Run every node in dependency order, one at a time.
    ///
    /// Completed nodes are skipped. Stops at the first node that does not
    /// end `completed`.
    pub async fn run_all(&self) -> EngineResult<()> {
        check_complete(self.session.lock().await.parameters())?;

        let order = topological_order(&self.pipeline.node_ids(), &self.dependency_map).map_err(
            |stuck| {
                let path = stuck
                    .first()
                    .and_then(|start| find_cycle(start, &self.dependency_map))
                    .unwrap_or(stuck);
                EngineError::CycleDetected { path }
            },
        )?;

        info!(pipeline = %self.pipeline.name, nodes = order.len(), "Running all nodes");
        for node_id in order {
            if self.status(&node_id).await == NodeStatus::Completed {
                continue;
            }
            match self.run_node(&node_id).await {
                Ok(_) => {}
                Err(e) if e.is_node_level() => {}
                Err(e) => return Err(e),
            }
            let status = self.status(&node_id).await;
            if status != NodeStatus::Completed {
                warn!(node_id = %node_id, %status, "Run-all halted");
                return Err(EngineError::PipelineHalted { node_id, status });
            }
        }
        Ok(())
    }

    /// Stop `node_id`: cancel its poll loop, ask the backend to stop the
    /// process (best effort) and mark it `stopped`.
    ///
    /// Stopping a node that is not running only cancels it.
    pub async fn stop_node(&self, node_id: &str) -> EngineResult<()> {
        self.ensure_known(node_id)?;
        let outcome = self.session.lock().await.stop(node_id);

        let Some(handle) = outcome else {
            debug!(node_id, "Stop requested for inactive node");
            return Ok(());
        };

        if let Some(handle) = handle {
            if let Err(e) = self.backend.stop(&handle).await {
                warn!(node_id, process_id = %handle, error = %e, "Backend stop failed");
            }
        }
        info!(node_id, "Node stopped");
        publish_status(&self.events_tx, node_id, NodeStatus::Stopped).await;
        self.persist().await;
        Ok(())
    }

    /// Reset every node and clear every cached output.
    pub async fn reset_all(&self) -> EngineResult<()> {
        let handles = self.session.lock().await.reset_all();

        for (node_id, handle) in &handles {
            if let Err(e) = self.backend.reset(handle).await {
                warn!(node_id = %node_id, process_id = %handle, error = %e, "Backend reset failed");
            }
        }
        for node_id in self.pipeline.node_ids() {
            publish_status(&self.events_tx, &node_id, NodeStatus::Idle).await;
        }
        info!(pipeline = %self.pipeline.name, "All nodes reset");
        self.persist().await;
        Ok(())
    }

    /// `GET /health` on the backend.
    pub async fn health(&self) -> EngineResult<HealthResponse> {
        self.backend.health().await.map_err(EngineError::from)
    }

    /// Re-attach a poll loop to a run restored as `running`.
    ///
    /// Returns `Ok(None)` if the node has no pending run.
    pub async fn resume_node(&self, node_id: &str) -> EngineResult<Option<NodeOutput>> {
        self.ensure_known(node_id)?;
        let Some((handle, token)) = self.session.lock().await.resume(node_id) else {
            return Ok(None);
        };
        info!(node_id, process_id = %handle, "Resuming poll of restored run");
        self.await_completion(node_id, handle, token).await
    }
}

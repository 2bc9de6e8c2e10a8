//! Session manager: dispatches front-end operations to the engine.
//!
//! The SessionManager owns the engine behind an `Arc`. Runs are spawned as
//! background tasks so that stop and reset can be issued while a run is in
//! flight; every other operation is handled inline. Failures are reported
//! on the events channel rather than returned.

use crate::engine::error::EngineError;
use crate::engine::ExecutionEngine;
use crate::state::process::publish_pipeline_error;
use cr_protocol::ipc::{Event, Op};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info};

pub struct SessionManager {
    engine: Arc<ExecutionEngine>,

    /// Channel for sending events to the front end.
    events_tx: mpsc::Sender<Event>,

    /// Background run tasks.
    tasks: Mutex<JoinSet<()>>,
}

impl SessionManager {
    /// Create a new SessionManager.
    ///
    /// # Arguments
    ///
    /// * `engine` - The engine driving the pipeline
    /// * `events_tx` - Channel for sending events to the front end; usually
    ///   the same one the engine reports on
    pub fn new(engine: Arc<ExecutionEngine>, events_tx: mpsc::Sender<Event>) -> Self {
        Self {
            engine,
            events_tx,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// Handle one operation.
    ///
    /// Returns `false` once [`Op::Shutdown`] has been handled.
    pub async fn handle_op(&self, op: Op) -> bool {
        debug!(?op, "Handling operation");
        match op {
            Op::ApplyParameters { parameters } => {
                if let Err(e) = self.engine.apply_parameters(&parameters).await {
                    self.report(e).await;
                }
            }
            Op::RunNode { node_id } => {
                let engine = Arc::clone(&self.engine);
                let events_tx = self.events_tx.clone();
                self.spawn(async move {
                    if let Err(e) = engine.run_node(&node_id).await {
                        report_to(&events_tx, e).await;
                    }
                })
                .await;
            }
            Op::RunAll => {
                let engine = Arc::clone(&self.engine);
                let events_tx = self.events_tx.clone();
                self.spawn(async move {
                    if let Err(e) = engine.run_all().await {
                        report_to(&events_tx, e).await;
                    }
                })
                .await;
            }
            Op::StopNode { node_id } => {
                if let Err(e) = self.engine.stop_node(&node_id).await {
                    self.report(e).await;
                }
            }
            Op::ResetNode { node_id } => {
                if let Err(e) = self.engine.reset_node_and_downstream(&node_id).await {
                    self.report(e).await;
                }
            }
            Op::ResetAll => {
                if let Err(e) = self.engine.reset_all().await {
                    self.report(e).await;
                }
            }
            Op::GetDashboardState => {
                let nodes = self.engine.snapshot().await;
                let _ = self.events_tx.send(Event::DashboardState { nodes }).await;
            }
            Op::Shutdown => {
                info!("Shutting down session, abandoning in-flight polls");
                self.tasks.lock().await.abort_all();
                return false;
            }
        }
        true
    }

    /// Handle operations until the channel closes or [`Op::Shutdown`]
    /// arrives.
    pub async fn run(&self, mut ops_rx: mpsc::Receiver<Op>) {
        while let Some(op) = ops_rx.recv().await {
            if !self.handle_op(op).await {
                break;
            }
        }
    }

    /// Spawn poll loops for every run restored as `running`.
    ///
    /// Returns the ids that were resumed.
    pub async fn resume_pending(&self) -> Vec<String> {
        let pending = self.engine.pending_runs().await;
        for node_id in &pending {
            let engine = Arc::clone(&self.engine);
            let events_tx = self.events_tx.clone();
            let node_id = node_id.clone();
            self.spawn(async move {
                if let Err(e) = engine.resume_node(&node_id).await {
                    report_to(&events_tx, e).await;
                }
            })
            .await;
        }
        pending
    }

    /// Spawn a background run, first reaping runs that already finished so
    /// a long-lived loop does not accumulate them.
    async fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// Number of background runs not yet reaped.
    pub async fn tracked_tasks(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Wait for every background run to finish.
    pub async fn wait_idle(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().await);
        while tasks.join_next().await.is_some() {}
    }

    async fn report(&self, error: EngineError) {
        report_to(&self.events_tx, error).await;
    }
}

/// Node-level errors were already reported as `NodeError` by the engine.
async fn report_to(events_tx: &mpsc::Sender<Event>, error: EngineError) {
    if !error.is_node_level() {
        publish_pipeline_error(events_tx, error.to_string()).await;
    }
}

//! Test fixtures for creating pipelines, parameters and engines.

use cr_core::backend::MockBackend;
use cr_core::engine::{EngineSettings, ExecutionEngine};
use cr_protocol::ipc::Event;
use cr_protocol::pipeline_models::{Edge, PipelineDefinition, StageSpec};
use cr_protocol::process_models::{NodeStatus, RunParameters};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Build a pipeline from node ids and `(source, target)` pairs.
pub fn create_pipeline(name: &str, nodes: &[&str], edges: &[(&str, &str)]) -> PipelineDefinition {
    PipelineDefinition {
        name: name.to_string(),
        description: format!("Test pipeline {name}"),
        nodes: nodes
            .iter()
            .map(|id| StageSpec {
                id: id.to_string(),
                label: id.replace('_', " "),
                description: String::new(),
            })
            .collect(),
        edges: edges
            .iter()
            .map(|(source, target)| Edge::new(*source, *target))
            .collect(),
    }
}

/// reading_config -> file_search -> {harmonisation_src, harmonisation_tgt}
#[allow(dead_code)]
pub fn harmonisation_pipeline() -> PipelineDefinition {
    create_pipeline(
        "config-check",
        &[
            "reading_config",
            "file_search",
            "harmonisation_src",
            "harmonisation_tgt",
        ],
        &[
            ("reading_config", "file_search"),
            ("file_search", "harmonisation_src"),
            ("file_search", "harmonisation_tgt"),
        ],
    )
}

/// a fans out to b and c, which join again at d.
#[allow(dead_code)]
pub fn diamond_pipeline() -> PipelineDefinition {
    create_pipeline(
        "diamond",
        &["a", "b", "c", "d"],
        &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
    )
}

/// No pacing, 1 ms polls, fail fast on poll errors.
pub fn fast_settings() -> EngineSettings {
    EngineSettings {
        poll_interval: Duration::from_millis(1),
        step_delay: Duration::ZERO,
        poll_error_retries: 0,
        max_poll_attempts: None,
    }
}

pub fn valid_params() -> RunParameters {
    RunParameters {
        expected_run_date: "2024-03-31".to_string(),
        input_config_file_path: "/configs/completeness.json".to_string(),
        input_config_file_pattern: "*.csv".to_string(),
        root_file_dir: "/data/in".to_string(),
        run_env: "staging".to_string(),
        temp_file_path: "/tmp/cr".to_string(),
    }
}

/// Engine over `pipeline` and `backend` with fast settings.
pub fn create_engine(
    pipeline: PipelineDefinition,
    backend: &MockBackend,
    settings: EngineSettings,
) -> (Arc<ExecutionEngine>, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(1024);
    let engine = ExecutionEngine::new(pipeline, Arc::new(backend.clone()), settings, tx);
    (Arc::new(engine), rx)
}

/// Same as [`create_engine`], with valid parameters already applied.
#[allow(dead_code)]
pub async fn create_ready_engine(
    pipeline: PipelineDefinition,
    backend: &MockBackend,
) -> (Arc<ExecutionEngine>, mpsc::Receiver<Event>) {
    let (engine, rx) = create_engine(pipeline, backend, fast_settings());
    engine
        .apply_parameters(&valid_params())
        .await
        .expect("fixture parameters should be valid");
    (engine, rx)
}

/// Everything currently buffered on the channel.
pub fn drain_events(rx: &mut mpsc::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Poll `engine` until `node_id` reaches `status`, or panic after 5 s.
#[allow(dead_code)]
pub async fn wait_for_status(engine: &ExecutionEngine, node_id: &str, status: NodeStatus) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while engine.status(node_id).await != status {
        if tokio::time::Instant::now() > deadline {
            panic!(
                "{node_id} never reached {status}, still {}",
                engine.status(node_id).await
            );
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Wait until the engine recorded a backend handle for `node_id`.
#[allow(dead_code)]
pub async fn wait_for_handle(engine: &ExecutionEngine, node_id: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = engine.snapshot().await;
        if snapshot
            .iter()
            .any(|node| node.node_id == node_id && node.process_id.is_some())
        {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("{node_id} was never submitted");
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

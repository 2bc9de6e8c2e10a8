//! Integration tests for session persistence and resuming pending runs.

mod common;

use common::*;
use cr_core::backend::{Backend, MockBackend};
use cr_core::engine::ExecutionEngine;
use cr_core::state::manager::SessionManager;
use cr_core::store::{FileStore, MemoryStore, PersistedSession, SessionStore};
use cr_protocol::api_models::RunRequest;
use cr_protocol::pipeline_models::PipelineDefinition;
use cr_protocol::process_models::NodeStatus;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::sync::mpsc;

fn engine_with_store(
    pipeline: PipelineDefinition,
    backend: &MockBackend,
    store: Arc<dyn SessionStore>,
) -> Arc<ExecutionEngine> {
    let (tx, _rx) = mpsc::channel(1024);
    Arc::new(
        ExecutionEngine::new(pipeline, Arc::new(backend.clone()), fast_settings(), tx)
            .with_store(store),
    )
}

fn chain() -> PipelineDefinition {
    create_pipeline("chain", &["a", "b", "c"], &[("a", "b"), ("b", "c")])
}

#[tokio::test]
async fn test_outputs_and_parameters_survive_restart() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn SessionStore> = Arc::new(FileStore::new(dir.path()));
    let backend = MockBackend::new().complete_with("a", json!({ "val": 5 }));

    let first = engine_with_store(chain(), &backend, store.clone());
    first.apply_parameters(&valid_params()).await.unwrap();
    first.run_node("b").await.unwrap();
    assert!(dir.path().join("chain.json").exists());

    let second = engine_with_store(chain(), &backend, store);

    assert_eq!(second.parameters().await, Some(valid_params()));
    assert_eq!(second.status("a").await, NodeStatus::Completed);
    assert_eq!(second.output("a").await, Some(json!({ "val": 5 })));
    assert_eq!(second.status("b").await, NodeStatus::Completed);
    assert_eq!(second.status("c").await, NodeStatus::Idle);

    // Restored outputs feed the next run without resubmitting anything.
    second.run_node("c").await.unwrap();
    assert_eq!(backend.submitted_nodes(), vec!["a", "b", "c"]);
    assert_eq!(
        backend.submissions()[2].previous_outputs.get("a"),
        Some(&json!({ "val": 5 }))
    );
}

#[tokio::test]
async fn test_reset_is_persisted() {
    let store = MemoryStore::new();
    let backend = MockBackend::new();

    let first = engine_with_store(chain(), &backend, Arc::new(store.clone()));
    first.apply_parameters(&valid_params()).await.unwrap();
    first.run_node("c").await.unwrap();
    first.reset_node_and_downstream("b").await.unwrap();

    let persisted = PersistedSession::load_from(&store, "chain").unwrap();
    assert_eq!(persisted.outputs.keys().collect::<Vec<_>>(), vec!["a"]);
    assert!(persisted.pending.is_empty());
    assert_eq!(persisted.layout.nodes, vec!["a", "b", "c"]);
    assert_eq!(store.keys(), vec!["chain"]);
}

#[tokio::test]
async fn test_corrupt_state_starts_empty() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path());
    std::fs::write(store.path_for("chain"), "{ not json").unwrap();

    let engine = engine_with_store(chain(), &MockBackend::new(), Arc::new(store));

    assert!(engine.parameters().await.is_none());
    for node in engine.snapshot().await {
        assert_eq!(node.status, NodeStatus::Idle);
        assert!(!node.has_output);
    }
}

#[tokio::test]
async fn test_state_of_removed_nodes_is_dropped() {
    let store = MemoryStore::new();
    let persisted = PersistedSession {
        parameters: Some(valid_params()),
        outputs: BTreeMap::from([
            ("a".to_string(), json!({ "val": 1 })),
            ("gone".to_string(), json!({ "val": 2 })),
        ]),
        ..PersistedSession::default()
    };
    persisted.save_to(&store, "chain").unwrap();

    let engine = engine_with_store(chain(), &MockBackend::new(), Arc::new(store));

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.len(), 3);
    assert!(snapshot.iter().all(|n| n.node_id != "gone"));
    assert_eq!(engine.status("a").await, NodeStatus::Completed);
}

#[tokio::test]
async fn test_pending_run_is_resumed_after_restart() {
    let backend = MockBackend::new();
    let handle = backend
        .submit_run(&RunRequest {
            node_id: "a".to_string(),
            parameters: valid_params(),
            previous_outputs: BTreeMap::new(),
            timestamp: chrono::Utc::now(),
        })
        .await
        .unwrap();

    let store = MemoryStore::new();
    PersistedSession {
        parameters: Some(valid_params()),
        pending: BTreeMap::from([("a".to_string(), handle.clone())]),
        ..PersistedSession::default()
    }
    .save_to(&store, "chain")
    .unwrap();

    let (tx, mut rx) = mpsc::channel(1024);
    let engine = ExecutionEngine::new(chain(), Arc::new(backend.clone()), fast_settings(), tx.clone())
        .with_store(Arc::new(store.clone()));
    assert_eq!(engine.status("a").await, NodeStatus::Running);
    assert_eq!(engine.pending_runs().await, vec!["a"]);

    let manager = SessionManager::new(Arc::new(engine), tx);
    assert_eq!(manager.resume_pending().await, vec!["a"]);
    manager.wait_idle().await;

    let engine = manager.engine();
    assert_eq!(engine.status("a").await, NodeStatus::Completed);
    assert_eq!(engine.output("a").await, Some(json!({ "node": "a" })));
    assert!(engine.pending_runs().await.is_empty());
    // Resuming polls the existing process instead of submitting a new one.
    assert_eq!(backend.submissions().len(), 1);

    let persisted = PersistedSession::load_from(&store, "chain").unwrap();
    assert!(persisted.pending.is_empty());
    assert!(persisted.outputs.contains_key("a"));

    let events = drain_events(&mut rx);
    assert_eq!(statuses_of(&events, "a"), vec![NodeStatus::Completed]);
}

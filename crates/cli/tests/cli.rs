//! End-to-end tests of the control-room binary against the mock backend.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const FAST_CONFIG: &str = r#"
[execution]
poll_interval_ms = 5
step_delay_ms = 0
"#;

fn control_room(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("control-room").unwrap();
    cmd.arg("--root")
        .arg(root)
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "warn")
        .env_remove("CONTROL_ROOM_BACKEND_URL");
    cmd
}

/// An initialized project with fast polling and no pacing.
fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    control_room(dir.path()).arg("init").assert().success();
    std::fs::write(dir.path().join(".control-room/config.toml"), FAST_CONFIG).unwrap();
    dir
}

fn set_params(root: &Path, run_env: &str) -> assert_cmd::assert::Assert {
    control_room(root)
        .args([
            "--mock",
            "params",
            "set",
            "--expected-run-date",
            "2024-03-31",
            "--input-config-file-path",
            "/configs/completeness.json",
            "--input-config-file-pattern",
            "*.csv",
            "--root-file-dir",
            "/data/in",
            "--run-env",
            run_env,
            "--temp-file-path",
            "/tmp/cr",
        ])
        .assert()
}

#[test]
fn test_init_writes_templates() {
    let dir = tempfile::tempdir().unwrap();

    control_room(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized .control-room/"))
        .stdout(predicate::str::contains("pipelines/completeness.yaml"));

    assert!(dir.path().join(".control-room/config.toml").exists());
    assert!(dir.path().join(".control-room/pipelines/config-check.yaml").exists());
}

#[test]
fn test_init_refuses_to_overwrite() {
    let dir = project();

    control_room(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already holds a control-room project"));

    control_room(dir.path())
        .args(["init", "--force", "--minimal"])
        .assert()
        .success();
}

#[test]
fn test_graph_lists_and_describes_pipelines() {
    let dir = project();

    control_room(dir.path())
        .args(["graph", "--list"])
        .assert()
        .success()
        .stdout("completeness\nconfig-check\n");

    control_room(dir.path())
        .args(["--pipeline", "config-check", "graph"])
        .assert()
        .success()
        .stdout(predicate::str::contains("after: reading_config"))
        .stdout(predicate::str::contains("Run order: reading_config -> file_search"));
}

#[test]
fn test_unknown_pipeline() {
    let dir = project();

    control_room(dir.path())
        .args(["--pipeline", "nope", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Pipeline 'nope' not found"));
}

#[test]
fn test_run_without_parameters_fails() {
    let dir = project();

    control_room(dir.path())
        .args(["--mock", "run", "reading_config"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Missing run parameters"));
}

#[test]
fn test_invalid_parameters_are_rejected() {
    let dir = project();

    set_params(dir.path(), "qa")
        .failure()
        .stdout(predicate::str::contains("Invalid run parameters"));
}

#[test]
fn test_run_persists_across_invocations() {
    let dir = project();
    set_params(dir.path(), "staging")
        .success()
        .stdout(predicate::str::contains("Parameters applied"));

    control_room(dir.path())
        .args(["--mock", "--pipeline", "config-check", "run", "file_search"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reading_config completed"))
        .stdout(predicate::str::contains("file_search is completed"));

    control_room(dir.path())
        .args(["--mock", "--pipeline", "config-check", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("parameters applied"))
        .stdout(predicate::str::is_match(r"file_search\s+completed").unwrap())
        .stdout(predicate::str::is_match(r"harmonisation_src\s+idle").unwrap());

    control_room(dir.path())
        .args(["--mock", "--pipeline", "config-check", "reset", "reading_config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("file_search idle"));

    control_room(dir.path())
        .args(["--mock", "--pipeline", "config-check", "status"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"reading_config\s+idle").unwrap());
}

#[test]
fn test_run_all_with_mock_backend() {
    let dir = project();
    set_params(dir.path(), "development").success();

    control_room(dir.path())
        .args(["--mock", "--pipeline", "config-check", "run-all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("harmonisation_tgt completed"));

    control_room(dir.path())
        .args(["--mock", "--pipeline", "config-check", "params", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"runEnv\": \"development\""));
}

#[test]
fn test_unknown_node_is_reported() {
    let dir = project();
    set_params(dir.path(), "staging").success();

    control_room(dir.path())
        .args(["--mock", "run", "nope"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Unknown node: nope"));
}

#[test]
fn test_health_with_mock_backend() {
    let dir = project();

    control_room(dir.path())
        .args(["--mock", "health"])
        .assert()
        .success()
        .stdout("Backend is healthy\n");
}

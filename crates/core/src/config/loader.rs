//! Configuration file loader for `.control-room/` directory structure.
//!
//! This module provides functionality to load and parse all configuration files
//! from the `.control-room/` directory, including:
//! - `config.toml`: Global settings
//! - `pipelines/*.yaml`: Pipeline definitions

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::AppConfig;
use cr_protocol::config_models::GlobalConfig;
use cr_protocol::pipeline_models::PipelineDefinition;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Environment variable that replaces `backend.base_url`.
pub const BACKEND_URL_ENV: &str = "CONTROL_ROOM_BACKEND_URL";

/// Loads all configuration from the `.control-room/` directory.
///
/// This function scans the `.control-room/` directory and loads:
/// - Global configuration from `config.toml`
/// - Pipeline definitions from `pipelines/*.yaml` files
///
/// Environment overrides are applied afterwards (see
/// [`apply_env_overrides`]).
///
/// # Arguments
///
/// * `root` - Root directory containing the `.control-room/` folder
///
/// # Returns
///
/// An `AppConfig` containing all loaded configuration. If directories or files
/// are missing, returns a default configuration rather than an error.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Files exist but cannot be read
/// - Files have invalid TOML or YAML syntax
/// - A pipeline definition is structurally invalid
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let cr_dir = root.join(".control-room");

    let mut config = if cr_dir.exists() {
        AppConfig {
            global: load_global_config(&cr_dir)?,
            pipelines: load_pipelines(&cr_dir)?,
        }
    } else {
        AppConfig::default()
    };

    apply_env_overrides(&mut config.global, |key| std::env::var(key).ok());
    Ok(config)
}

/// Apply environment overrides through `lookup`.
///
/// Only [`BACKEND_URL_ENV`] is recognised. Empty values are ignored.
pub fn apply_env_overrides(global: &mut GlobalConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(BACKEND_URL_ENV).filter(|url| !url.trim().is_empty()) {
        debug!(%url, "Backend URL overridden from environment");
        global.backend.base_url = url.trim().to_string();
    }
}

/// Loads global configuration from `config.toml`.
fn load_global_config(cr_dir: &Path) -> ConfigResult<GlobalConfig> {
    let config_path = cr_dir.join("config.toml");

    // If config.toml doesn't exist, return default
    if !config_path.exists() {
        return Ok(GlobalConfig::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: config_path,
        source,
    })
}

/// Loads all pipeline definitions from `pipelines/*.yaml`.
fn load_pipelines(cr_dir: &Path) -> ConfigResult<Vec<PipelineDefinition>> {
    let pipelines_dir = cr_dir.join("pipelines");

    // If pipelines directory doesn't exist, return empty vector
    if !pipelines_dir.exists() {
        return Ok(Vec::new());
    }

    let mut pipelines: Vec<PipelineDefinition> = Vec::new();

    // Walk through all .yaml and .yml files in the pipelines directory
    for entry in WalkDir::new(&pipelines_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: pipelines_dir.clone(),
            source,
        })?;

        let path = entry.path();

        // Only process .yaml and .yml files
        let ext = path.extension().and_then(|s| s.to_str());
        if ext != Some("yaml") && ext != Some("yml") {
            continue;
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let pipeline: PipelineDefinition =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
                path: path.to_path_buf(),
                source,
            })?;

        validate_pipeline(&pipeline, path)?;
        if pipelines.iter().any(|p| p.name == pipeline.name) {
            return Err(ConfigError::InvalidConfig {
                path: path.to_path_buf(),
                reason: format!("Duplicate pipeline name '{}'", pipeline.name),
            });
        }

        debug!(
            pipeline = %pipeline.name,
            nodes = pipeline.nodes.len(),
            edges = pipeline.edges.len(),
            "Loaded pipeline"
        );
        pipelines.push(pipeline);
    }

    pipelines.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(pipelines)
}

/// Reject definitions with no nodes, duplicate node ids, or edges whose
/// endpoints are not declared nodes.
///
/// Cycles are allowed here; they are detected when a node is run.
pub fn validate_pipeline(pipeline: &PipelineDefinition, path: &Path) -> ConfigResult<()> {
    let invalid = |reason: String| ConfigError::InvalidConfig {
        path: path.to_path_buf(),
        reason,
    };

    if pipeline.nodes.is_empty() {
        return Err(invalid(format!("Pipeline '{}' has no nodes", pipeline.name)));
    }

    let mut seen = HashSet::new();
    for node in &pipeline.nodes {
        if node.id.trim().is_empty() {
            return Err(invalid("Node with an empty id".to_string()));
        }
        if !seen.insert(node.id.as_str()) {
            return Err(invalid(format!("Duplicate node id '{}'", node.id)));
        }
    }

    for edge in &pipeline.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !seen.contains(endpoint.as_str()) {
                return Err(invalid(format!(
                    "Edge {} -> {} references unknown node '{}'",
                    edge.source, edge.target, endpoint
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const CHAIN_YAML: &str = r#"name: config-check
description: Configuration and file discovery checks
nodes:
  - id: reading_config
    label: Reading Config
  - id: file_search
    label: File Search
  - id: harmonisation_src
  - id: harmonisation_tgt
edges:
  - source: reading_config
    target: file_search
  - source: file_search
    target: harmonisation_src
  - source: file_search
    target: harmonisation_tgt
"#;

    /// A complete `.control-room/` structure loads both the global settings
    /// and the pipelines.
    #[tokio::test]
    async fn test_load_config_acceptance() {
        let dir = tempdir().expect("Failed to create temp dir");
        let root = dir.path();
        let cr_dir = root.join(".control-room");

        fs::create_dir_all(cr_dir.join("pipelines")).expect("Failed to create pipelines dir");

        let config_toml = r#"
[backend]
base_url = "http://backend.internal:9000"

[execution]
poll_interval_ms = 250
step_delay_ms = 0
max_poll_attempts = 40
"#;
        fs::write(cr_dir.join("config.toml"), config_toml).expect("Failed to write config.toml");
        fs::write(cr_dir.join("pipelines/config-check.yaml"), CHAIN_YAML)
            .expect("Failed to write pipeline file");

        let config = load_config(root).await.expect("Failed to load config");

        assert_eq!(config.global.backend.base_url, "http://backend.internal:9000");
        assert_eq!(config.global.backend.request_timeout_ms, 30_000);
        assert_eq!(config.global.execution.poll_interval_ms, 250);
        assert_eq!(config.global.execution.step_delay_ms, 0);
        assert_eq!(config.global.execution.max_poll_attempts, Some(40));

        assert_eq!(config.pipelines.len(), 1, "Should load 1 pipeline");
        let pipeline = config.pipeline("config-check").expect("pipeline by name");
        assert_eq!(pipeline.nodes.len(), 4);
        assert_eq!(pipeline.edges.len(), 3);
        assert_eq!(pipeline.nodes[0].label, "Reading Config");
    }

    /// No `.control-room` folder means defaults, not an error.
    #[tokio::test]
    async fn test_load_config_empty_directory() {
        let dir = tempdir().expect("Failed to create temp dir");

        let config = load_config(dir.path())
            .await
            .expect("Should handle missing .control-room");

        assert_eq!(config.global.execution.step_delay_ms, 5_000);
        assert!(config.pipelines.is_empty(), "Should have no pipelines");
        assert!(matches!(
            config.pipeline("completeness"),
            Err(ConfigError::PipelineNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_config_invalid_toml() {
        let dir = tempdir().expect("Failed to create temp dir");
        let cr_dir = dir.path().join(".control-room");
        fs::create_dir_all(&cr_dir).expect("Failed to create .control-room");

        fs::write(cr_dir.join("config.toml"), "[backend\nbase_url = 1")
            .expect("Failed to write config.toml");

        match load_config(dir.path()).await {
            Err(ConfigError::TomlParse { path, .. }) => assert!(path.ends_with("config.toml")),
            other => panic!("Expected TomlParse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_config_invalid_yaml() {
        let dir = tempdir().expect("Failed to create temp dir");
        let cr_dir = dir.path().join(".control-room");
        fs::create_dir_all(cr_dir.join("pipelines")).expect("Failed to create pipelines dir");

        fs::write(cr_dir.join("pipelines/test.yaml"), "name: test\n  nodes: [yaml")
            .expect("Failed to write pipeline file");

        match load_config(dir.path()).await {
            Err(ConfigError::YamlParse { path, .. }) => assert!(path.ends_with("test.yaml")),
            other => panic!("Expected YamlParse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_edge_endpoint_is_rejected() {
        let dir = tempdir().expect("Failed to create temp dir");
        let cr_dir = dir.path().join(".control-room");
        fs::create_dir_all(cr_dir.join("pipelines")).expect("Failed to create pipelines dir");

        let yaml = r#"name: broken
nodes:
  - id: a
edges:
  - source: a
    target: ghost
"#;
        fs::write(cr_dir.join("pipelines/broken.yaml"), yaml).expect("Failed to write file");

        match load_config(dir.path()).await {
            Err(ConfigError::InvalidConfig { reason, .. }) => {
                assert!(reason.contains("unknown node 'ghost'"));
            }
            other => panic!("Expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_node_and_empty_pipeline_are_rejected() {
        let path = Path::new("pipelines/x.yaml");
        let mut pipeline: PipelineDefinition =
            serde_yaml::from_str(CHAIN_YAML).expect("fixture parses");
        assert!(validate_pipeline(&pipeline, path).is_ok());

        let first = pipeline.nodes[0].clone();
        pipeline.nodes.push(first);
        assert!(matches!(
            validate_pipeline(&pipeline, path),
            Err(ConfigError::InvalidConfig { reason, .. }) if reason.contains("Duplicate node id")
        ));

        pipeline.nodes.clear();
        pipeline.edges.clear();
        assert!(validate_pipeline(&pipeline, path).is_err());
    }

    #[test]
    fn test_cycles_are_accepted_at_load_time() {
        let pipeline: PipelineDefinition = serde_yaml::from_str(
            r#"name: loop
nodes: [{ id: a }, { id: b }]
edges: [{ source: a, target: b }, { source: b, target: a }]
"#,
        )
        .expect("fixture parses");

        assert!(validate_pipeline(&pipeline, Path::new("loop.yaml")).is_ok());
    }

    /// Files with other extensions are skipped; `.yml` is accepted.
    #[tokio::test]
    async fn test_load_config_ignores_non_matching_files() {
        let dir = tempdir().expect("Failed to create temp dir");
        let cr_dir = dir.path().join(".control-room");
        fs::create_dir_all(cr_dir.join("pipelines")).expect("Failed to create pipelines dir");

        fs::write(cr_dir.join("pipelines/notes.txt"), "Not a yaml file")
            .expect("Failed to write txt file");
        fs::write(cr_dir.join("pipelines/chain.yml"), CHAIN_YAML)
            .expect("Failed to write pipeline file");

        let config = load_config(dir.path())
            .await
            .expect("Should ignore non-matching files");

        assert_eq!(config.pipeline_names(), vec!["config-check"]);
    }

    #[test]
    fn test_env_override_replaces_backend_url() {
        let mut global = GlobalConfig::default();

        apply_env_overrides(&mut global, |_| Some("  ".to_string()));
        assert_eq!(global.backend.base_url, "http://localhost:8000");

        apply_env_overrides(&mut global, |key| {
            (key == BACKEND_URL_ENV).then(|| "http://10.0.0.5:8000".to_string())
        });
        assert_eq!(global.backend.base_url, "http://10.0.0.5:8000");
    }
}

//! Global configuration models for `.control-room/config.toml`.
//!
//! This module defines the structure of the global configuration file that
//! controls how the client talks to the backend and paces execution.

use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

/// Represents global settings from `.control-room/config.toml`.
///
/// Every section and field is optional; missing values fall back to the
/// defaults documented on each field.
///
/// # Example
///
/// ```toml
/// # .control-room/config.toml
/// [backend]
/// base_url = "http://localhost:8000"
///
/// [execution]
/// poll_interval_ms = 1000
/// step_delay_ms = 5000
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, TS)]
#[serde(default)]
pub struct GlobalConfig {
    pub backend: BackendConfig,
    pub execution: ExecutionConfig,
    pub storage: StorageConfig,
}

/// Where the processing backend lives.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the REST API. Defaults to `http://localhost:8000`.
    pub base_url: String,

    /// Per-request timeout in milliseconds. Defaults to 30 seconds.
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

/// Pacing and polling knobs of the execution engine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Interval between two status polls of a running node.
    pub poll_interval_ms: u64,

    /// Delay inserted between finishing one dependency and starting the
    /// next one, and before the target node after its last dependency.
    pub step_delay_ms: u64,

    /// Consecutive status-poll errors tolerated before the node is marked
    /// failed. `0` fails on the first error.
    pub poll_error_retries: u32,

    /// Upper bound on status polls per run. Unset polls until the backend
    /// reports a terminal status.
    pub max_poll_attempts: Option<u32>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            step_delay_ms: 5_000,
            poll_error_retries: 0,
            max_poll_attempts: None,
        }
    }
}

/// Where session state (parameters, outputs, pending runs) is persisted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for session state, relative to the project root.
    pub state_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: ".control-room/state".to_string(),
        }
    }
}

//! Runtime node state models.
//!
//! This module defines the structures for tracking the state of pipeline
//! nodes while they are run against the processing backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::pipeline_models::StageId;

/// Payload returned by the backend when a node completes.
///
/// Free-form JSON: tabular results, log lines, echoed parameters.
pub type NodeOutput = serde_json::Value;

/// Represents the current lifecycle status of a pipeline node.
///
/// Normal progression: Idle -> Running -> Completed
///
/// Special states:
/// - Standby: run requested but blocked on unmet dependencies
/// - Stopped: explicitly stopped by the user while running
/// - Failed: the backend reported failure or polling broke down
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TS)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Node has not been run since the last reset.
    #[default]
    Idle,

    /// A backend process for this node is in flight.
    Running,

    Completed,

    Failed,

    /// The user stopped the node while it was running.
    Stopped,

    /// Run was requested but at least one dependency is not completed.
    Standby,
}

impl NodeStatus {
    /// Whether the status is a settled outcome of a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
            Self::Standby => "standby",
        };
        f.write_str(s)
    }
}

/// Opaque id issued by the backend when it accepts a run.
///
/// Used to poll, stop and reset that specific run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, TS)]
#[serde(transparent)]
pub struct ProcessHandle(pub String);

impl ProcessHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The shared configuration payload required before any stage may execute.
///
/// Field names are serialized in camelCase to match what the backend and
/// browser front ends expect.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "camelCase")]
pub struct RunParameters {
    /// Business date of the run, `YYYY-MM-DD`.
    pub expected_run_date: String,
    pub input_config_file_path: String,
    pub input_config_file_pattern: String,
    pub root_file_dir: String,
    /// One of `development`, `staging`, `production`.
    pub run_env: String,
    pub temp_file_path: String,
}

impl RunParameters {
    /// All fields paired with their wire names, in declaration order.
    pub fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("expectedRunDate", self.expected_run_date.as_str()),
            ("inputConfigFilePath", self.input_config_file_path.as_str()),
            ("inputConfigFilePattern", self.input_config_file_pattern.as_str()),
            ("rootFileDir", self.root_file_dir.as_str()),
            ("runEnv", self.run_env.as_str()),
            ("tempFilePath", self.temp_file_path.as_str()),
        ]
    }

    /// Copy of the parameters with surrounding whitespace removed from
    /// every field.
    pub fn trimmed(&self) -> Self {
        Self {
            expected_run_date: self.expected_run_date.trim().to_string(),
            input_config_file_path: self.input_config_file_path.trim().to_string(),
            input_config_file_pattern: self.input_config_file_pattern.trim().to_string(),
            root_file_dir: self.root_file_dir.trim().to_string(),
            run_env: self.run_env.trim().to_string(),
            temp_file_path: self.temp_file_path.trim().to_string(),
        }
    }
}

/// Point-in-time view of one node, as reported to front ends.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct NodeSnapshot {
    pub node_id: StageId,
    pub status: NodeStatus,

    /// Number of run submissions since the last reset.
    pub attempts: u32,

    /// Handle of the in-flight backend process, if any.
    pub process_id: Option<ProcessHandle>,

    pub has_output: bool,

    pub last_error: Option<String>,
}

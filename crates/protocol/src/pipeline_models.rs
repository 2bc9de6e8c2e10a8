//! Pipeline definition models for `.control-room/pipelines/*.yaml`.
//!
//! A pipeline is a fixed set of named stages ("nodes") connected by
//! dependency edges. The definition is immutable once loaded.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Identifier of a pipeline stage, unique within one pipeline.
pub type StageId = String;

/// A dependency edge: `target` may only run after `source` has completed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, TS)]
pub struct Edge {
    pub source: StageId,
    pub target: StageId,
}

impl Edge {
    pub fn new(source: impl Into<StageId>, target: impl Into<StageId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// One stage of a pipeline as declared in the definition file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct StageSpec {
    /// Stage identifier, sent to the backend as `/run/{id}`.
    pub id: StageId,

    /// Human-readable name shown by front ends.
    ///
    /// Defaults to empty string if not specified.
    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub description: String,
}

/// Defines a full pipeline: its stages and the dependency edges between them.
///
/// # Example
///
/// ```yaml
/// name: completeness
/// description: Generic completeness control
/// nodes:
///   - id: reading_config
///     label: Reading Config
///   - id: file_search
///     label: File Search
/// edges:
///   - source: reading_config
///     target: file_search
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct PipelineDefinition {
    /// Unique name identifying this pipeline. Also used as the
    /// persistence key of its session state.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Stages in declaration order.
    pub nodes: Vec<StageSpec>,

    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl PipelineDefinition {
    /// Stage ids in declaration order.
    pub fn node_ids(&self) -> Vec<StageId> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == node_id)
    }

    pub fn stage(&self, node_id: &str) -> Option<&StageSpec> {
        self.nodes.iter().find(|n| n.id == node_id)
    }
}

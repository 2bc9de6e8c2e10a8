//! Last successful output per node.

use cr_protocol::pipeline_models::StageId;
use cr_protocol::process_models::NodeOutput;
use std::collections::BTreeMap;

/// StageId -> last successful [`NodeOutput`].
///
/// Written on completion, read to build `previousOutputs`, removed on
/// reset. Missing entries are normal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputCache {
    outputs: BTreeMap<StageId, NodeOutput>,
}

impl OutputCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node_id: &str) -> Option<&NodeOutput> {
        self.outputs.get(node_id)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.outputs.contains_key(node_id)
    }

    pub fn insert(&mut self, node_id: impl Into<StageId>, output: NodeOutput) {
        self.outputs.insert(node_id.into(), output);
    }

    pub fn remove(&mut self, node_id: &str) -> Option<NodeOutput> {
        self.outputs.remove(node_id)
    }

    pub fn clear(&mut self) {
        self.outputs.clear();
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Owned copy of every entry, as sent in `previousOutputs`.
    pub fn snapshot(&self) -> BTreeMap<StageId, NodeOutput> {
        self.outputs.clone()
    }
}

impl From<BTreeMap<StageId, NodeOutput>> for OutputCache {
    fn from(outputs: BTreeMap<StageId, NodeOutput>) -> Self {
        Self { outputs }
    }
}

//! Reset propagation through downstream dependents.

use super::ExecutionEngine;
use crate::engine::error::EngineResult;
use crate::graph::all_downstream_nodes;
use crate::state::process::publish_status;
use cr_protocol::pipeline_models::StageId;
use cr_protocol::process_models::NodeStatus;
use tracing::{info, warn};

impl ExecutionEngine {
    /// Reset `node_id` and every transitive dependent.
    ///
    /// Every member is cancelled first, so no recursion or poll loop can
    /// start or settle one of them while the sweep runs. Members are then
    /// reset one after another: backend reset (best effort), `idle`, cached
    /// output removed. Backend failures are logged and never abort the
    /// sweep.
    ///
    /// Returns the ids that were reset.
    pub async fn reset_node_and_downstream(&self, node_id: &str) -> EngineResult<Vec<StageId>> {
        self.ensure_known(node_id)?;
        let to_reset = all_downstream_nodes(node_id, &self.downstream_map);

        {
            let mut session = self.session.lock().await;
            for id in &to_reset {
                session.cancel(id);
            }
        }

        for id in &to_reset {
            let handle = self.session.lock().await.reset(id);
            if let Some(handle) = handle {
                if let Err(e) = self.backend.reset(&handle).await {
                    warn!(node_id = %id, process_id = %handle, error = %e, "Backend reset failed");
                }
            }
            publish_status(&self.events_tx, id, NodeStatus::Idle).await;
        }

        info!(node_id, reset = to_reset.len(), "Node and downstream reset");
        self.persist().await;
        Ok(to_reset)
    }
}

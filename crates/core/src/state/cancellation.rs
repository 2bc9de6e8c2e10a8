//! Per-node cancellation registry.
//!
//! Each node owns a [`CancellationToken`]. Cancelling a node cancels the
//! token held by its in-flight poll loop, which wakes it immediately.
//! Clearing the registry swaps cancelled tokens for fresh ones; anything
//! still holding an old token keeps observing the cancellation.

use cr_protocol::pipeline_models::StageId;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct CancellationRegistry {
    tokens: HashMap<StageId, CancellationToken>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token of `node_id`, created on first use.
    pub fn token(&mut self, node_id: &str) -> CancellationToken {
        self.tokens
            .entry(node_id.to_string())
            .or_insert_with(CancellationToken::new)
            .clone()
    }

    /// Current token of `node_id`, replacing it first if it was cancelled.
    pub fn fresh_token(&mut self, node_id: &str) -> CancellationToken {
        let token = self
            .tokens
            .entry(node_id.to_string())
            .or_insert_with(CancellationToken::new);
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
        token.clone()
    }

    pub fn cancel(&mut self, node_id: &str) {
        self.tokens
            .entry(node_id.to_string())
            .or_insert_with(CancellationToken::new)
            .cancel();
    }

    pub fn is_cancelled(&self, node_id: &str) -> bool {
        self.tokens
            .get(node_id)
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Ids of every node currently marked cancelled.
    pub fn cancelled(&self) -> Vec<StageId> {
        let mut ids: Vec<StageId> = self
            .tokens
            .iter()
            .filter(|(_, token)| token.is_cancelled())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Forget every cancellation so later runs are not blocked.
    pub fn clear(&mut self) {
        self.tokens.retain(|_, token| !token.is_cancelled());
    }
}

//! Persistence port for session state.
//!
//! The engine only sees [`SessionStore`]: a key-value store of JSON
//! documents. One key per pipeline holds its [`PersistedSession`].

pub mod file_store;
pub mod memory_store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;

use cr_protocol::pipeline_models::{Edge, StageId};
use cr_protocol::process_models::{NodeOutput, ProcessHandle, RunParameters};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing persisted state.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read state file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write state file {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt state for {key}: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },
}

/// Type alias for Result with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value storage of JSON documents.
pub trait SessionStore: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    fn load(&self, key: &str) -> StoreResult<Option<Value>>;

    fn save(&self, key: &str, value: &Value) -> StoreResult<()>;

    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Graph layout stored next to the session so a reload can tell whether
/// the pipeline changed shape.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphLayout {
    pub nodes: Vec<StageId>,
    pub edges: Vec<Edge>,
}

/// Everything that survives a restart.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedSession {
    /// Validated run parameters, if any were applied.
    pub parameters: Option<RunParameters>,

    /// Cached output per node.
    pub outputs: BTreeMap<StageId, NodeOutput>,

    /// Backend handles of runs that were in flight.
    pub pending: BTreeMap<StageId, ProcessHandle>,

    pub layout: GraphLayout,
}

impl PersistedSession {
    /// Read the session stored under `key`.
    ///
    /// Missing data yields the default; corrupt data is an error the caller
    /// is expected to log and replace with the default.
    pub fn load_from(store: &dyn SessionStore, key: &str) -> StoreResult<Self> {
        match store.load(key)? {
            Some(value) => serde_json::from_value(value).map_err(|source| StoreError::Corrupt {
                key: key.to_string(),
                source,
            }),
            None => Ok(Self::default()),
        }
    }

    pub fn save_to(&self, store: &dyn SessionStore, key: &str) -> StoreResult<()> {
        let value = serde_json::to_value(self).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        store.save(key, &value)
    }
}

//! Failures of `control-room init`.

use std::path::PathBuf;
use thiserror::Error;

pub type InitResult<T> = Result<T, InitError>;

#[derive(Debug, Error)]
pub enum InitError {
    /// A project is already set up here; `--force` replaces its config and
    /// pipelines but leaves `state/` alone.
    #[error("{0:?} already holds a control-room project. Use --force to overwrite its config and pipelines.")]
    AlreadyInitialized(PathBuf),

    /// The binary was built without this template.
    #[error("Template {0} is not embedded in this build")]
    MissingTemplate(String),

    /// An embedded pipeline template would be rejected by the config
    /// loader, so writing it would leave a project that cannot start.
    #[error("Embedded pipeline template {path} is invalid: {reason}")]
    InvalidPipelineTemplate { path: String, reason: String },

    #[error("Failed to create directory {path:?}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

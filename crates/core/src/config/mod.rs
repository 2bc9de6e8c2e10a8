//! Configuration loading and management.
//!
//! This module provides functionality to load and parse all configuration files
//! from the `.control-room/` directory structure.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::{apply_env_overrides, load_config, validate_pipeline, BACKEND_URL_ENV};
pub use models::AppConfig;

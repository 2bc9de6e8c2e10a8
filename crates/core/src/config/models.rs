//! Configuration models that aggregate all settings.
//!
//! This module provides the unified `AppConfig` structure that combines
//! global settings and pipeline definitions into a single configuration
//! object.

use crate::config::error::{ConfigError, ConfigResult};
use cr_protocol::config_models::GlobalConfig;
use cr_protocol::pipeline_models::PipelineDefinition;

/// Unified application configuration loaded from `.control-room/` directory.
///
/// This structure aggregates all configuration sources:
/// - `config.toml`: Global settings
/// - `pipelines/*.yaml`: Pipeline definitions
///
/// # Example
///
/// ```rust,no_run
/// use cr_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Backend at {}, {} pipelines",
///          config.global.backend.base_url,
///          config.pipelines.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Global settings from `config.toml`.
    pub global: GlobalConfig,

    /// All pipeline definitions loaded from `pipelines/*.yaml`, sorted by
    /// name.
    pub pipelines: Vec<PipelineDefinition>,
}

impl AppConfig {
    /// Look up a pipeline by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PipelineNotFound`] listing the names that do
    /// exist.
    pub fn pipeline(&self, name: &str) -> ConfigResult<&PipelineDefinition> {
        self.pipelines
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::PipelineNotFound {
                name: name.to_string(),
                available: if self.pipelines.is_empty() {
                    "none".to_string()
                } else {
                    self.pipeline_names().join(", ")
                },
            })
    }

    pub fn pipeline_names(&self) -> Vec<String> {
        self.pipelines.iter().map(|p| p.name.clone()).collect()
    }
}

//! Directory structure and file generation for .control-room initialization.

use super::error::{InitError, InitResult};
use super::templates::{get_template, list_templates};
use crate::config::validate_pipeline;
use cr_protocol::pipeline_models::PipelineDefinition;
use std::fs;
use std::path::{Path, PathBuf};

/// Pipeline written in minimal mode.
const MINIMAL_PIPELINE: &str = "pipelines/completeness.yaml";

/// Options for initializing a .control-room directory.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Target directory where .control-room will be created.
    pub target_dir: PathBuf,

    /// Overwrite existing .control-room directory if it exists.
    pub force: bool,

    /// Only write the config and the completeness pipeline.
    pub minimal: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            force: false,
            minimal: false,
        }
    }
}

/// Generate a .control-room directory structure with templates.
///
/// This function creates the following structure:
/// ```text
/// .control-room/
/// ├── config.toml
/// └── pipelines/
///     ├── completeness.yaml
///     └── config-check.yaml (unless minimal)
/// ```
///
/// Returns the paths written, relative to `.control-room/`.
///
/// # Errors
/// - The .control-room directory already exists (without force flag)
/// - An embedded pipeline template is invalid
/// - A template file cannot be found
/// - File system operations fail
pub async fn generate_control_room_structure(options: InitOptions) -> InitResult<Vec<String>> {
    let cr_dir = options.target_dir.join(".control-room");

    if cr_dir.exists() && !options.force {
        return Err(InitError::AlreadyInitialized(cr_dir));
    }

    fs::create_dir_all(cr_dir.join("pipelines")).map_err(|source| InitError::DirectoryCreate {
        path: cr_dir.join("pipelines"),
        source,
    })?;

    let mut written = vec!["config.toml".to_string()];
    if options.minimal {
        written.push(MINIMAL_PIPELINE.to_string());
    } else {
        written.extend(list_templates("pipelines/"));
    }

    for template_path in &written {
        write_template_file(&cr_dir, template_path)?;
    }

    Ok(written)
}

/// Refuse a pipeline template the config loader would reject.
fn check_pipeline_template(path: &str, content: &str) -> InitResult<()> {
    let invalid = |reason: String| InitError::InvalidPipelineTemplate {
        path: path.to_string(),
        reason,
    };
    let pipeline: PipelineDefinition =
        serde_yaml::from_str(content).map_err(|e| invalid(e.to_string()))?;
    validate_pipeline(&pipeline, Path::new(path)).map_err(|e| invalid(e.to_string()))
}

/// Write one embedded template below `cr_dir`, creating parent directories.
fn write_template_file(cr_dir: &Path, template_path: &str) -> InitResult<()> {
    let content = get_template(template_path)
        .ok_or_else(|| InitError::MissingTemplate(template_path.to_string()))?;
    if template_path.starts_with("pipelines/") {
        check_pipeline_template(template_path, &content)?;
    }

    let target_path = cr_dir.join(template_path);

    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|source| InitError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&target_path, content).map_err(|source| InitError::FileWrite {
        path: target_path,
        source,
    })
}

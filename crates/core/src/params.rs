//! Run parameter validation.
//!
//! No node may be submitted with parameters that have not passed
//! [`check_complete`]. [`validate_parameters`] is the stricter check used
//! when parameters are applied.

use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDate;
use cr_protocol::process_models::RunParameters;

/// Accepted values of `runEnv`.
pub const RUN_ENVIRONMENTS: [&str; 3] = ["development", "staging", "production"];

/// Names of the fields that are empty after trimming.
pub fn missing_fields(params: &RunParameters) -> Vec<String> {
    params
        .fields()
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| (*name).to_string())
        .collect()
}

/// Every field is present and non-empty after trimming.
///
/// This is the precondition for submitting a run.
pub fn check_complete(params: Option<&RunParameters>) -> EngineResult<()> {
    let Some(params) = params else {
        return Err(EngineError::ParametersMissing {
            fields: RunParameters::default()
                .fields()
                .iter()
                .map(|(name, _)| (*name).to_string())
                .collect(),
        });
    };

    let fields = missing_fields(params);
    if fields.is_empty() {
        Ok(())
    } else {
        Err(EngineError::ParametersMissing { fields })
    }
}

/// Full validation applied when a user submits parameters.
///
/// Returns the trimmed parameters on success.
///
/// # Errors
///
/// - [`EngineError::ParametersMissing`] if any field is empty.
/// - [`EngineError::ParametersInvalid`] if the date is not `YYYY-MM-DD`, the
///   config file path has no path separator, or the environment is unknown.
pub fn validate_parameters(params: &RunParameters) -> EngineResult<RunParameters> {
    let params = params.trimmed();
    check_complete(Some(&params))?;

    let date = params.expected_run_date.as_str();
    if date.len() != 10 || NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return Err(EngineError::ParametersInvalid {
            reason: format!("expectedRunDate must be YYYY-MM-DD, got '{date}'"),
        });
    }

    let path = params.input_config_file_path.as_str();
    if !path.contains('/') && !path.contains('\\') {
        return Err(EngineError::ParametersInvalid {
            reason: format!("inputConfigFilePath must be a path, got '{path}'"),
        });
    }

    let env = params.run_env.to_lowercase();
    if !RUN_ENVIRONMENTS.contains(&env.as_str()) {
        return Err(EngineError::ParametersInvalid {
            reason: format!(
                "runEnv must be one of {}, got '{}'",
                RUN_ENVIRONMENTS.join("|"),
                params.run_env
            ),
        });
    }

    Ok(params)
}

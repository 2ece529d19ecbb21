//! Tool argument types.
//!
//! These types represent the JSON arguments an LLM host passes to each tool.
//! Missing or `null` arguments are treated as an empty object.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TutorError};

/// Arguments for `register_user`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegisterArgs {
    /// Contact email stored with the profile.
    #[serde(default)]
    pub email: Option<String>,
}

/// Arguments for tools that address one course level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LevelArgs {
    /// Course level (e.g. `beginner`).
    pub level: String,
}

/// Arguments for `next_course_step`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NextArgs {
    /// Level to advance; defaults to the level most recently started.
    #[serde(default)]
    pub level: Option<String>,
}

/// Arguments for `clear_course_history`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClearArgs {
    /// Must be `true` for anything to be deleted.
    #[serde(default)]
    pub confirm: bool,
    /// Level to clear; defaults to the level most recently started.
    #[serde(default)]
    pub level: Option<String>,
}

/// Arguments for `jump_to_module` and `get_module_content`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleArgs {
    pub level: String,
    /// Module name as shown in the course outline.
    #[serde(alias = "module_id")]
    pub module: String,
}

/// Arguments for `get_step_content`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepArgs {
    pub level: String,
    #[serde(alias = "module_id")]
    pub module: String,
    /// Step name as shown in the course outline.
    pub step: String,
}

/// Arguments for `search_course_content`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchArgs {
    pub query: String,
    /// Restrict the search to one level.
    #[serde(default)]
    pub level: Option<String>,
}

/// Parse tool arguments from a JSON value.
///
/// # Errors
///
/// Returns `InvalidInput` if the value does not match the expected shape.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = match args {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(args).map_err(|e| TutorError::invalid_input(e.to_string()))
}

/// Parse tool arguments from raw JSON text. Blank input is an empty object.
pub fn parse_args_str<T: DeserializeOwned>(input: &str) -> Result<T> {
    if input.trim().is_empty() {
        return parse_args(Value::Null);
    }
    let value: Value =
        serde_json::from_str(input).map_err(|e| TutorError::invalid_input(e.to_string()))?;
    parse_args(value)
}

/// Reject blank level names before they reach the scanner.
pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TutorError::invalid_input(format!(
            "`{}` must not be empty",
            field
        )));
    }
    Ok(())
}

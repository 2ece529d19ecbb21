//! Error taxonomy for the tutor engine.
//!
//! Every failure is scoped to a single tool invocation. User-correctable
//! errors are rendered back to the caller as text; corrupt persisted state is
//! recovered locally and never reaches the caller.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for tutor operations.
#[derive(Error, Debug)]
pub enum TutorError {
    /// Level directory or its modules could not be found.
    #[error("course not found for level '{level}'{}", list_choices("available levels", .available))]
    ManifestNotFound { level: String, available: Vec<String> },

    /// An operation needs a course that was started first.
    #[error("no active course: use `start_course` with a level to begin")]
    NoActiveCourse,

    /// A jump-to-module request named a module that does not exist.
    #[error("unknown module '{module}'{}", list_choices("valid modules", .available))]
    UnknownModule { module: String, available: Vec<String> },

    /// Persisted progress could not be parsed.
    #[error("corrupt progress file at {path}: {message}")]
    CorruptState { path: PathBuf, message: String },

    /// A destructive operation was requested without confirmation.
    #[error("confirmation required: call again with `confirm: true` to clear your course history")]
    ConfirmationRequired,

    /// I/O errors from progress or profile files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// Malformed tool arguments.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

fn list_choices(label: &str, choices: &[String]) -> String {
    if choices.is_empty() {
        String::new()
    } else {
        format!(" ({}: {})", label, choices.join(", "))
    }
}

/// A specialized Result type for tutor operations.
pub type Result<T> = std::result::Result<T, TutorError>;

impl TutorError {
    /// Create a manifest-not-found error listing the valid levels.
    pub fn manifest_not_found(level: impl Into<String>, available: Vec<String>) -> Self {
        Self::ManifestNotFound {
            level: level.into(),
            available,
        }
    }

    /// Create an unknown-module error listing the valid module names.
    pub fn unknown_module(module: impl Into<String>, available: Vec<String>) -> Self {
        Self::UnknownModule {
            module: module.into(),
            available,
        }
    }

    /// Create a corrupt-state error.
    pub fn corrupt_state(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CorruptState {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Whether the caller can fix this error by retrying with different input.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::ManifestNotFound { .. }
                | Self::NoActiveCourse
                | Self::UnknownModule { .. }
                | Self::ConfirmationRequired
                | Self::InvalidInput { .. }
        )
    }
}

impl From<io::Error> for TutorError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for TutorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Log-and-substitute handling for side effects that must not fail a call.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the tutor CLI.
pub mod exit_codes {
    /// The tool call succeeded.
    pub const SUCCESS: i32 = 0;

    /// The tool call returned a caller-facing error.
    pub const TOOL_ERROR: i32 = 1;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_not_found_lists_levels() {
        let err = TutorError::manifest_not_found(
            "expert",
            vec!["beginner".to_string(), "advanced".to_string()],
        );
        assert_eq!(
            err.to_string(),
            "course not found for level 'expert' (available levels: beginner, advanced)"
        );
    }

    #[test]
    fn test_manifest_not_found_without_levels() {
        let err = TutorError::manifest_not_found("expert", vec![]);
        assert_eq!(err.to_string(), "course not found for level 'expert'");
    }

    #[test]
    fn test_unknown_module_lists_modules() {
        let err = TutorError::unknown_module("outro", vec!["intro".into(), "basics".into()]);
        let msg = err.to_string();
        assert!(msg.contains("unknown module 'outro'"));
        assert!(msg.contains("valid modules: intro, basics"));
    }

    #[test]
    fn test_storage_error_display() {
        let err = TutorError::storage(
            "/tmp/test.json",
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        );
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("/tmp/test.json"));
    }

    #[test]
    fn test_confirmation_required_mentions_confirm() {
        let err = TutorError::ConfirmationRequired;
        assert!(err.to_string().contains("confirm: true"));
    }

    #[test]
    fn test_is_user_facing() {
        assert!(TutorError::NoActiveCourse.is_user_facing());
        assert!(TutorError::ConfirmationRequired.is_user_facing());
        assert!(TutorError::manifest_not_found("x", vec![]).is_user_facing());
        assert!(TutorError::unknown_module("x", vec![]).is_user_facing());
        assert!(!TutorError::corrupt_state("/tmp/x.json", "bad").is_user_facing());
        assert!(!TutorError::serde("bad").is_user_facing());
        assert!(!TutorError::config("bad").is_user_facing());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: TutorError = io_err.into();
        assert!(matches!(err, TutorError::Storage { .. }));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: TutorError = json_err.into();
        assert!(matches!(err, TutorError::Serde { .. }));
    }

    #[test]
    fn test_fail_open_default() {
        let result: Result<Vec<String>> = Err(TutorError::serde("test"));
        let value = result.fail_open_default("test context");
        assert!(value.is_empty());
    }

    #[test]
    fn test_fail_open_with() {
        let result: Result<i32> = Err(TutorError::config("test"));
        assert_eq!(result.fail_open_with("test context", 42), 42);
    }

    #[test]
    fn test_fail_open_success() {
        let result: Result<i32> = Ok(100);
        assert_eq!(result.fail_open_default("test context"), 100);
    }
}

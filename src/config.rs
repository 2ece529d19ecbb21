//! Configuration loading for the tutor.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.tutor/config.toml`)
//! 3. User config (`~/.tutor/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The engine runs with defaults when no
//! config exists, and a layer that cannot be read or parsed is skipped
//! with a warning.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FailOpen, Result, TutorError};

/// Default course content root, relative to the working directory.
pub const DEFAULT_CONTENT_DIR: &str = "course_output";

/// Default log filter.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Valid values for `log.level`.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Course content configuration.
    pub course: CourseConfig,
    /// Logging configuration.
    pub log: LogConfig,
}

/// Course content configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CourseConfig {
    /// Directory holding one subdirectory per course level.
    pub content_dir: PathBuf,
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter level when `TUTOR_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl LogConfig {
    /// Check if a level value is valid.
    pub fn is_valid_level(value: &str) -> bool {
        VALID_LOG_LEVELS.contains(&value)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    ///
    /// A relative `course.content_dir` is resolved against `cwd`.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        if config.course.content_dir.is_relative() {
            config.course.content_dir = cwd.join(&config.course.content_dir);
        }
        config
    }

    fn load_user_config() -> Option<Config> {
        let config_path = tutor_home()?.join("config.toml");
        Self::load_layer(&config_path)
    }

    fn load_project_config(cwd: &Path) -> Option<Config> {
        let config_path = cwd.join(".tutor").join("config.toml");
        Self::load_layer(&config_path)
    }

    /// Load one config layer, skipping it with a warning if it is unusable.
    fn load_layer(path: &Path) -> Option<Config> {
        Self::load_from_file(path)
            .fail_open_with(&format!("loading config {}", path.display()), None)
    }

    /// Load config from a specific file path.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    fn load_from_file(path: &Path) -> Result<Option<Config>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TutorError::storage(path, e)),
        };
        let config = toml::from_str(&content).map_err(|e| TutorError::config(e.to_string()))?;
        Ok(Some(config))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // TUTOR_COURSE_DIR, then the legacy COURSE_DIR
        let content_dir = env::var("TUTOR_COURSE_DIR")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| env::var("COURSE_DIR").ok().filter(|v| !v.is_empty()));
        if let Some(dir) = content_dir {
            self.course.content_dir = PathBuf::from(dir);
        }

        if let Ok(val) = env::var("TUTOR_LOG_LEVEL") {
            let val = val.to_lowercase();
            if LogConfig::is_valid_level(&val) {
                self.log.level = val;
            } else {
                eprintln!(
                    "Warning: Invalid TUTOR_LOG_LEVEL value '{}'. \
                    Valid values: {:?}. Using '{}'.",
                    val, VALID_LOG_LEVELS, self.log.level
                );
            }
        }

        if let Ok(val) = env::var("TUTOR_LOG_JSON") {
            self.log.json = val == "true" || val == "1";
        }
    }

    /// Merge another config into this one, field by field.
    ///
    /// Non-default fields of `other` win. A layer cannot reset a value back
    /// to its default once a lower layer changed it.
    fn merge(mut self, other: Config) -> Self {
        let default_course = CourseConfig::default();
        if other.course.content_dir != default_course.content_dir {
            self.course.content_dir = other.course.content_dir;
        }

        let default_log = LogConfig::default();
        if other.log.level != default_log.level {
            self.log.level = other.log.level;
        }
        if other.log.json != default_log.json {
            self.log.json = other.log.json;
        }

        self
    }
}

/// Get the tutor home directory.
///
/// Checks `TUTOR_HOME` first, then falls back to `~/.tutor`, then to a
/// per-uid directory under `/tmp`.
pub fn tutor_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("TUTOR_HOME") {
        if home.is_empty() {
            tracing::warn!("TUTOR_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("TUTOR_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".tutor"));
    }

    let fallback_path = fallback_tutor_home();
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

#[cfg(unix)]
fn fallback_tutor_home() -> PathBuf {
    use std::os::unix::fs::MetadataExt;
    let uid = std::fs::metadata("/").map(|m| m.uid()).unwrap_or(0);
    PathBuf::from(format!("/tmp/tutor-{}", uid))
}

#[cfg(not(unix))]
fn fallback_tutor_home() -> PathBuf {
    std::env::temp_dir().join("tutor")
}

/// Get the progress directory.
///
/// Returns `<tutor_home>/progress/`.
pub fn progress_dir() -> Option<PathBuf> {
    tutor_home().map(|h| h.join("progress"))
}

/// Get the profile path.
///
/// Returns `<tutor_home>/profile.json`.
pub fn profile_path() -> Option<PathBuf> {
    tutor_home().map(|h| h.join("profile.json"))
}

/// Get the crash log path.
pub fn crash_log_path() -> Option<PathBuf> {
    tutor_home().map(|h| h.join("crash.log"))
}

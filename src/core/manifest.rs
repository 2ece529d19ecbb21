//! Course manifest reader.
//!
//! A level lives in `<content_dir>/<level>/`. It may carry a
//! `course_info.json` written by the content pipeline:
//!
//! ```json
//! {
//!   "title": "Rust for Beginners",
//!   "description": "...",
//!   "modules": [
//!     { "module_id": "01_intro", "files": ["01_welcome.md", "02_setup.md"] }
//!   ]
//! }
//! ```
//!
//! The manifest is optional. Without a `modules` key the directory tree
//! itself defines the order.

use std::fs;
use std::path::{Component, Path};

use serde::Deserialize;

use crate::error::{Result, TutorError};

/// File name of the per-level manifest.
pub const MANIFEST_FILE: &str = "course_info.json";

/// Extension of step files discovered without an explicit file list.
pub const STEP_EXTENSION: &str = "md";

const DEFAULT_TITLE: &str = "Untitled Course";
const DEFAULT_DESCRIPTION: &str = "No description available.";

/// Author-declared description of a course level.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CourseManifest {
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Display description.
    #[serde(default)]
    pub description: Option<String>,
    /// Declared module order. `None` means "use directory order".
    #[serde(default)]
    pub modules: Option<Vec<ManifestModule>>,
}

/// One module entry in the manifest.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ManifestModule {
    /// Module directory name, relative to the level directory.
    pub module_id: String,
    /// Step files relative to the module directory. `None` means "use directory order".
    #[serde(default)]
    pub files: Option<Vec<String>>,
}

impl CourseManifest {
    /// Load the manifest of a level directory.
    ///
    /// Returns `Ok(None)` when the level has no manifest file.
    pub fn load(level_dir: &Path) -> Result<Option<Self>> {
        let path = level_dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| TutorError::storage(&path, e))?;
        let manifest = serde_json::from_str(&content)
            .map_err(|e| TutorError::serde(format!("{}: {}", path.display(), e)))?;
        Ok(Some(manifest))
    }

    /// Display title, with a placeholder when none is declared.
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    /// Display description, with a placeholder when none is declared.
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION)
    }
}

/// Whether a level name is safe to use as a single path component.
pub fn is_valid_level(level: &str) -> bool {
    !level.is_empty()
        && !level.starts_with('.')
        && !level.contains(['/', '\\'])
        && Path::new(level).components().count() == 1
}

/// Whether a manifest path stays below the directory it is joined onto.
///
/// Only plain relative components are accepted: no root, prefix, `.` or `..`.
pub fn is_contained_path(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_manifest() {
        let dir = TempDir::new().unwrap();
        assert!(CourseManifest::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_full_manifest() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{
                "title": "Rust Basics",
                "description": "Learn Rust",
                "modules": [
                    {"module_id": "01_intro", "files": ["01_welcome.md"]},
                    {"module_id": "02_types", "documents_count": 3}
                ]
            }"#,
        )
        .unwrap();

        let manifest = CourseManifest::load(dir.path()).unwrap().unwrap();
        assert_eq!(manifest.title(), "Rust Basics");
        assert_eq!(manifest.description(), "Learn Rust");

        let modules = manifest.modules.unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].module_id, "01_intro");
        assert_eq!(modules[0].files.as_deref(), Some(&["01_welcome.md".to_string()][..]));
        assert!(modules[1].files.is_none());
    }

    #[test]
    fn test_load_metadata_only_manifest() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "{}").unwrap();

        let manifest = CourseManifest::load(dir.path()).unwrap().unwrap();
        assert!(manifest.modules.is_none());
        assert_eq!(manifest.title(), "Untitled Course");
        assert_eq!(manifest.description(), "No description available.");
    }

    #[test]
    fn test_load_invalid_manifest() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "not json").unwrap();

        let err = CourseManifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, TutorError::Serde { .. }));
    }

    #[test]
    fn test_is_valid_level() {
        assert!(is_valid_level("beginner"));
        assert!(is_valid_level("level-2"));
        assert!(!is_valid_level(""));
        assert!(!is_valid_level(".hidden"));
        assert!(!is_valid_level(".."));
        assert!(!is_valid_level("a/b"));
        assert!(!is_valid_level("a\\b"));
    }

    #[test]
    fn test_contained_paths() {
        assert!(is_contained_path("01_intro"));
        assert!(is_contained_path("lessons/01_welcome.md"));
        assert!(!is_contained_path(""));
        assert!(!is_contained_path("../other"));
        assert!(!is_contained_path("intro/../../x.md"));
        assert!(!is_contained_path("/etc/passwd"));
        assert!(!is_contained_path("./intro"));
    }
}

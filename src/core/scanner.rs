//! Structural scanner.
//!
//! Walks a level's manifest and directory tree into a [`CourseLayout`]
//! (names plus file locations) and from there into a fresh [`CourseState`]
//! with every step not started. Step bodies are only read on request.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::manifest::{
    is_contained_path, is_valid_level, CourseManifest, ManifestModule, STEP_EXTENSION,
};
use crate::core::state::{CourseState, ModuleState, StepState};
use crate::error::{Result, TutorError};
use crate::util::{natural_order, read_to_string_limited, strip_order_prefix};

/// Location of a step file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLayout {
    /// Step name (file stem without ordering prefix).
    pub name: String,
    /// Absolute path of the step file.
    pub path: PathBuf,
}

/// Location of a module directory and its steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLayout {
    /// Module name (directory name without ordering prefix).
    pub name: String,
    /// Module directory.
    pub dir: PathBuf,
    /// Steps in author order.
    pub steps: Vec<StepLayout>,
}

/// Current shape of a course level on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseLayout {
    pub level: String,
    pub title: String,
    pub description: String,
    pub modules: Vec<ModuleLayout>,
}

impl CourseLayout {
    /// Project the layout into a course state with every step not started.
    pub fn to_state(&self) -> CourseState {
        CourseState::new(
            self.level.clone(),
            self.modules
                .iter()
                .map(|m| {
                    ModuleState::new(
                        m.name.clone(),
                        m.steps.iter().map(|s| StepState::new(s.name.clone())).collect(),
                    )
                })
                .collect(),
        )
    }

    /// Find a module by name.
    pub fn module(&self, name: &str) -> Option<&ModuleLayout> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Module names in order.
    pub fn module_names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name.clone()).collect()
    }

    /// Find a step by module and step name.
    ///
    /// # Errors
    ///
    /// `UnknownModule` if the module does not exist, `InvalidInput` if the
    /// step does not.
    pub fn step(&self, module: &str, step: &str) -> Result<&StepLayout> {
        let module_layout = self
            .module(module)
            .ok_or_else(|| TutorError::unknown_module(module, self.module_names()))?;
        module_layout
            .steps
            .iter()
            .find(|s| s.name == step)
            .ok_or_else(|| {
                let names: Vec<&str> = module_layout.steps.iter().map(|s| s.name.as_str()).collect();
                TutorError::invalid_input(format!(
                    "unknown step '{}' in module '{}' (valid steps: {})",
                    step,
                    module,
                    names.join(", ")
                ))
            })
    }
}

/// Scanner over a course content root.
#[derive(Debug, Clone)]
pub struct Scanner {
    content_dir: PathBuf,
}

impl Scanner {
    /// Create a scanner over `content_dir`, which holds one directory per level.
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
        }
    }

    /// The content root.
    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Scan a level into a fresh, not-started course state.
    ///
    /// # Errors
    ///
    /// `ManifestNotFound` if the level directory is missing, its manifest is
    /// unreadable, or it contains no modules with steps.
    pub fn scan(&self, level: &str) -> Result<CourseState> {
        Ok(self.layout(level)?.to_state())
    }

    /// Resolve the full layout of a level.
    pub fn layout(&self, level: &str) -> Result<CourseLayout> {
        self.try_layout(level)
            .ok_or_else(|| TutorError::manifest_not_found(level, self.levels()))
    }

    /// Levels under the content root that scan to at least one module.
    pub fn levels(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.content_dir) else {
            return Vec::new();
        };

        let mut levels: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .filter(|name| self.try_layout(name).is_some())
            .collect();
        levels.sort_by(|a, b| natural_order(a, b));
        levels
    }

    /// Read the body of one step.
    ///
    /// # Errors
    ///
    /// `UnknownModule` if the module does not exist, `InvalidInput` if the
    /// step does not, and a storage error if the file cannot be read.
    pub fn read_step(&self, level: &str, module: &str, step: &str) -> Result<String> {
        let layout = self.layout(level)?;
        read_to_string_limited(&layout.step(module, step)?.path)
    }

    fn try_layout(&self, level: &str) -> Option<CourseLayout> {
        if !is_valid_level(level) {
            warn!(level, "rejecting invalid level name");
            return None;
        }

        let level_dir = self.content_dir.join(level);
        if !level_dir.is_dir() {
            debug!(level, dir = %level_dir.display(), "level directory not found");
            return None;
        }

        let manifest = match CourseManifest::load(&level_dir) {
            Ok(manifest) => manifest.unwrap_or_default(),
            Err(e) => {
                warn!(level, error = %e, "unreadable course manifest");
                return None;
            }
        };

        let modules = match &manifest.modules {
            Some(declared) => declared
                .iter()
                .filter_map(|entry| scan_declared_module(&level_dir, entry))
                .collect(),
            None => list_dir(&level_dir, true)
                .into_iter()
                .filter_map(|dir_name| scan_module_dir(&level_dir, &dir_name, None))
                .collect(),
        };
        let modules = dedup_by_name(modules, |m: &ModuleLayout| &m.name, level);

        if modules.is_empty() {
            warn!(level, "no modules with steps found");
            return None;
        }

        debug!(level, modules = modules.len(), "scanned course layout");
        Some(CourseLayout {
            level: level.to_string(),
            title: manifest.title().to_string(),
            description: manifest.description().to_string(),
            modules,
        })
    }
}

fn scan_declared_module(level_dir: &Path, entry: &ManifestModule) -> Option<ModuleLayout> {
    if !is_contained_path(&entry.module_id) {
        warn!(module = %entry.module_id, "module path leaves the level directory, skipping");
        return None;
    }
    scan_module_dir(level_dir, &entry.module_id, entry.files.as_deref())
}

fn scan_module_dir(
    level_dir: &Path,
    dir_name: &str,
    files: Option<&[String]>,
) -> Option<ModuleLayout> {
    let dir = level_dir.join(dir_name);
    if !dir.is_dir() {
        warn!(module = dir_name, "module directory not found, skipping");
        return None;
    }

    let steps: Vec<StepLayout> = match files {
        Some(files) => files
            .iter()
            .filter_map(|file| {
                if !is_contained_path(file) {
                    warn!(
                        module = dir_name,
                        file = %file,
                        "step path leaves the module directory, skipping"
                    );
                    return None;
                }
                let path = dir.join(file);
                if !path.is_file() {
                    warn!(module = dir_name, file = %file, "step file not found, skipping");
                    return None;
                }
                Some(step_layout(path))
            })
            .collect(),
        None => list_dir(&dir, false)
            .into_iter()
            .map(|file| dir.join(file))
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(STEP_EXTENSION))
            .map(step_layout)
            .collect(),
    };
    let steps = dedup_by_name(steps, |s: &StepLayout| &s.name, dir_name);

    if steps.is_empty() {
        debug!(module = dir_name, "module has no steps, skipping");
        return None;
    }

    Some(ModuleLayout {
        name: strip_order_prefix(dir_name).to_string(),
        dir,
        steps,
    })
}

fn step_layout(path: PathBuf) -> StepLayout {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    StepLayout {
        name: strip_order_prefix(&stem).to_string(),
        path,
    }
}

/// Visible entries of a directory in natural order, either subdirectories or files.
fn list_dir(dir: &Path, dirs: bool) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let path = entry.path();
            if dirs {
                path.is_dir()
            } else {
                path.is_file()
            }
        })
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort_by(|a, b| natural_order(a, b));
    names
}

fn dedup_by_name<T>(items: Vec<T>, name: impl Fn(&T) -> &String, context: &str) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let fresh = seen.insert(name(item).clone());
            if !fresh {
                warn!(context, name = %name(item), "duplicate name, keeping first occurrence");
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::state::Status;
    use tempfile::TempDir;

    /// Write a level with the given modules as `NN_module/NN_step.md` files.
    pub(crate) fn write_level(root: &Path, level: &str, modules: &[(&str, &[&str])]) {
        let level_dir = root.join(level);
        for (i, (module, steps)) in modules.iter().enumerate() {
            let module_dir = level_dir.join(format!("{:02}_{}", i + 1, module));
            fs::create_dir_all(&module_dir).unwrap();
            for (j, step) in steps.iter().enumerate() {
                fs::write(
                    module_dir.join(format!("{:02}_{}.md", j + 1, step)),
                    format!("# {} / {}\n", module, step),
                )
                .unwrap();
            }
        }
    }

    #[test]
    fn test_scan_directory_order() {
        let dir = TempDir::new().unwrap();
        write_level(
            dir.path(),
            "beginner",
            &[("intro", &["welcome", "setup"]), ("basics", &["types"])],
        );

        let state = Scanner::new(dir.path()).scan("beginner").unwrap();
        assert_eq!(state.level, "beginner");
        assert_eq!(state.module_names(), vec!["intro", "basics"]);
        assert_eq!(state.modules[0].steps[0].name, "welcome");
        assert_eq!(state.modules[0].steps[1].name, "setup");
        assert!(state
            .modules
            .iter()
            .flat_map(|m| &m.steps)
            .all(|s| s.status == Status::NotStarted));
    }

    #[test]
    fn test_scan_numeric_prefix_order() {
        let dir = TempDir::new().unwrap();
        let module_dir = dir.path().join("beginner").join("01_intro");
        fs::create_dir_all(&module_dir).unwrap();
        for file in ["10_last.md", "2_second.md", "1_first.md"] {
            fs::write(module_dir.join(file), "x").unwrap();
        }

        let state = Scanner::new(dir.path()).scan("beginner").unwrap();
        let names: Vec<&str> = state.modules[0].steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "last"]);
    }

    #[test]
    fn test_scan_manifest_order_wins() {
        let dir = TempDir::new().unwrap();
        write_level(
            dir.path(),
            "beginner",
            &[("intro", &["welcome", "setup"]), ("basics", &["types"])],
        );
        fs::write(
            dir.path().join("beginner").join("course_info.json"),
            r#"{"title": "Rust", "modules": [
                {"module_id": "02_basics"},
                {"module_id": "01_intro", "files": ["02_setup.md", "01_welcome.md"]}
            ]}"#,
        )
        .unwrap();

        let layout = Scanner::new(dir.path()).layout("beginner").unwrap();
        assert_eq!(layout.title, "Rust");
        assert_eq!(layout.module_names(), vec!["basics", "intro"]);
        let intro: Vec<&str> = layout.modules[1].steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(intro, vec!["setup", "welcome"]);
    }

    #[test]
    fn test_scan_manifest_skips_missing_entries() {
        let dir = TempDir::new().unwrap();
        write_level(dir.path(), "beginner", &[("intro", &["welcome"])]);
        fs::write(
            dir.path().join("beginner").join("course_info.json"),
            r#"{"modules": [
                {"module_id": "01_intro", "files": ["01_welcome.md", "99_gone.md"]},
                {"module_id": "07_missing"}
            ]}"#,
        )
        .unwrap();

        let state = Scanner::new(dir.path()).scan("beginner").unwrap();
        assert_eq!(state.module_names(), vec!["intro"]);
        assert_eq!(state.total_steps(), 1);
    }

    #[test]
    fn test_scan_manifest_entries_stay_inside_level() {
        let dir = TempDir::new().unwrap();
        write_level(dir.path(), "beginner", &[("intro", &["welcome"])]);
        write_level(dir.path(), "private", &[("hidden", &["notes"])]);
        fs::write(dir.path().join("secret.md"), "secret").unwrap();
        fs::write(
            dir.path().join("beginner").join("course_info.json"),
            r#"{"modules": [
                {"module_id": "../private/01_hidden"},
                {"module_id": "01_intro", "files": ["01_welcome.md", "../../secret.md"]}
            ]}"#,
        )
        .unwrap();

        let layout = Scanner::new(dir.path()).layout("beginner").unwrap();
        assert_eq!(layout.module_names(), vec!["intro"]);
        let steps: Vec<&str> = layout.modules[0].steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(steps, vec!["welcome"]);
    }

    #[test]
    fn test_scan_ignores_non_markdown_and_empty_modules() {
        let dir = TempDir::new().unwrap();
        write_level(dir.path(), "beginner", &[("intro", &["welcome"])]);
        let level_dir = dir.path().join("beginner");
        fs::write(level_dir.join("01_intro").join("notes.txt"), "x").unwrap();
        fs::create_dir_all(level_dir.join("02_empty")).unwrap();

        let state = Scanner::new(dir.path()).scan("beginner").unwrap();
        assert_eq!(state.module_names(), vec!["intro"]);
        assert_eq!(state.modules[0].steps.len(), 1);
    }

    #[test]
    fn test_scan_dedups_step_names() {
        let dir = TempDir::new().unwrap();
        let module_dir = dir.path().join("beginner").join("01_intro");
        fs::create_dir_all(&module_dir).unwrap();
        fs::write(module_dir.join("01_welcome.md"), "a").unwrap();
        fs::write(module_dir.join("02_welcome.md"), "b").unwrap();

        let scanner = Scanner::new(dir.path());
        let state = scanner.scan("beginner").unwrap();
        assert_eq!(state.modules[0].steps.len(), 1);
        assert_eq!(scanner.read_step("beginner", "intro", "welcome").unwrap(), "a");
    }

    #[test]
    fn test_scan_is_idempotent() {
        let dir = TempDir::new().unwrap();
        write_level(dir.path(), "beginner", &[("intro", &["a", "b"]), ("next", &["c"])]);

        let scanner = Scanner::new(dir.path());
        assert_eq!(scanner.scan("beginner").unwrap(), scanner.scan("beginner").unwrap());
    }

    #[test]
    fn test_scan_unknown_level_lists_available() {
        let dir = TempDir::new().unwrap();
        write_level(dir.path(), "beginner", &[("intro", &["a"])]);
        write_level(dir.path(), "advanced", &[("deep", &["b"])]);

        let err = Scanner::new(dir.path()).scan("expert").unwrap_err();
        match err {
            TutorError::ManifestNotFound { level, available } => {
                assert_eq!(level, "expert");
                assert_eq!(available, vec!["advanced", "beginner"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_scan_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        write_level(dir.path(), "beginner", &[("intro", &["a"])]);

        let scanner = Scanner::new(dir.path().join("beginner").join("01_intro"));
        assert!(scanner.scan("..").is_err());
    }

    #[test]
    fn test_scan_level_without_steps() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("beginner").join("01_intro")).unwrap();

        let err = Scanner::new(dir.path()).scan("beginner").unwrap_err();
        assert!(matches!(err, TutorError::ManifestNotFound { .. }));
    }

    #[test]
    fn test_scan_invalid_manifest() {
        let dir = TempDir::new().unwrap();
        write_level(dir.path(), "beginner", &[("intro", &["a"])]);
        fs::write(dir.path().join("beginner").join("course_info.json"), "{{").unwrap();

        let err = Scanner::new(dir.path()).scan("beginner").unwrap_err();
        assert!(matches!(err, TutorError::ManifestNotFound { .. }));
    }

    #[test]
    fn test_read_step() {
        let dir = TempDir::new().unwrap();
        write_level(dir.path(), "beginner", &[("intro", &["welcome"])]);

        let scanner = Scanner::new(dir.path());
        assert_eq!(
            scanner.read_step("beginner", "intro", "welcome").unwrap(),
            "# intro / welcome\n"
        );
        assert!(matches!(
            scanner.read_step("beginner", "outro", "welcome").unwrap_err(),
            TutorError::UnknownModule { .. }
        ));
        assert!(matches!(
            scanner.read_step("beginner", "intro", "missing").unwrap_err(),
            TutorError::InvalidInput { .. }
        ));
    }

    #[test]
    fn test_levels() {
        let dir = TempDir::new().unwrap();
        write_level(dir.path(), "beginner", &[("intro", &["a"])]);
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("README.md"), "x").unwrap();

        assert_eq!(Scanner::new(dir.path()).levels(), vec!["beginner"]);
    }

    #[test]
    fn test_levels_missing_root() {
        let dir = TempDir::new().unwrap();
        assert!(Scanner::new(dir.path().join("nope")).levels().is_empty());
    }
}

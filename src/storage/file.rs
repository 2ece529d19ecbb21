//! File-based progress storage.
//!
//! Progress is stored as one JSON file per level in `~/.tutor/progress/`.
//! Writes go to a writer-unique temp file which is synced and then renamed
//! over the target, so readers see either the old or the new document.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::progress_dir;
use crate::core::manifest::is_valid_level;
use crate::core::CourseState;
use crate::error::{FailOpen, Result, TutorError};
use crate::storage::ProgressStore;

/// File holding the active-level pointer.
const ACTIVE_FILE: &str = ".active.json";

/// Distinguishes temp files written concurrently by one process.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct ActiveLevel {
    level: String,
}

/// File-based progress storage.
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    /// Directory where progress files are stored.
    progress_dir: PathBuf,
}

impl FileProgressStore {
    /// Create a store in the default directory.
    ///
    /// Uses `~/.tutor/progress/` or `$TUTOR_HOME/progress/`.
    pub fn new() -> Result<Self> {
        let dir = progress_dir().ok_or_else(|| {
            TutorError::config("Could not determine progress directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a store in a custom directory.
    pub fn with_dir(progress_dir: impl Into<PathBuf>) -> Result<Self> {
        let progress_dir = progress_dir.into();

        if !progress_dir.exists() {
            fs::create_dir_all(&progress_dir).map_err(|e| TutorError::storage(&progress_dir, e))?;
        }

        Ok(Self { progress_dir })
    }

    /// The directory holding progress files.
    pub fn dir(&self) -> &Path {
        &self.progress_dir
    }

    /// Get the path for a level's progress file.
    fn progress_path(&self, level: &str) -> Result<PathBuf> {
        if !is_valid_level(level) {
            return Err(TutorError::invalid_input(format!(
                "invalid level name '{}'",
                level
            )));
        }
        Ok(self.progress_dir.join(format!("{}.json", level)))
    }

    fn active_path(&self) -> PathBuf {
        self.progress_dir.join(ACTIVE_FILE)
    }

    /// Write bytes atomically using a unique temp file + rename.
    fn atomic_write(&self, final_path: &Path, contents: &[u8]) -> Result<()> {
        let temp_path = temp_path_for(final_path);

        let written = (|| {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(contents)?;
            file.sync_all()
        })();
        if let Err(e) = written {
            remove_quietly(&temp_path);
            return Err(TutorError::storage(&temp_path, e));
        }

        if let Err(e) = fs::rename(&temp_path, final_path) {
            remove_quietly(&temp_path);
            return Err(TutorError::storage(final_path, e));
        }
        Ok(())
    }

    /// Parse a progress document. Undecodable content is a `CorruptState`.
    fn parse(path: &Path, content: &[u8], level: &str) -> Result<CourseState> {
        let state: CourseState = serde_json::from_slice(content)
            .map_err(|e| TutorError::corrupt_state(path, e.to_string()))?;
        if state.level != level {
            return Err(TutorError::corrupt_state(
                path,
                format!("document is for level '{}'", state.level),
            ));
        }
        Ok(state)
    }
}

/// Writer-unique hidden temp path next to `final_path`.
pub(crate) fn temp_path_for(final_path: &Path) -> PathBuf {
    let file_name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    final_path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ))
}

pub(crate) fn remove_quietly(path: &Path) {
    let result: Result<()> = fs::remove_file(path).map_err(|e| TutorError::storage(path, e));
    result.fail_open_default("removing temp file");
}

impl ProgressStore for FileProgressStore {
    fn load(&self, level: &str) -> Result<Option<CourseState>> {
        let path = self.progress_path(level)?;

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read(&path).map_err(|e| TutorError::storage(&path, e))?;
        match Self::parse(&path, &content, level) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(error = %e, "discarding unreadable progress, starting from course content");
                Ok(None)
            }
        }
    }

    fn save(&self, state: &CourseState) -> Result<()> {
        let path = self.progress_path(&state.level)?;
        let json = serde_json::to_string_pretty(state)?;
        self.atomic_write(&path, json.as_bytes())?;
        debug!(level = %state.level, path = %path.display(), "saved progress");
        Ok(())
    }

    fn delete(&self, level: &str) -> Result<bool> {
        let path = self.progress_path(level)?;

        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| TutorError::storage(&path, e))?;
        info!(level, "deleted progress");
        Ok(true)
    }

    fn active_level(&self) -> Result<Option<String>> {
        let path = self.active_path();
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| TutorError::storage(&path, e))?;
        match serde_json::from_str::<ActiveLevel>(&content) {
            Ok(active) if is_valid_level(&active.level) => Ok(Some(active.level)),
            Ok(active) => {
                warn!(level = %active.level, "ignoring invalid active level");
                Ok(None)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable active level");
                Ok(None)
            }
        }
    }

    fn set_active_level(&self, level: &str) -> Result<()> {
        let json = serde_json::to_string(&ActiveLevel {
            level: level.to_string(),
        })?;
        self.atomic_write(&self.active_path(), json.as_bytes())
    }

    fn clear_active_level(&self) -> Result<()> {
        let path = self.active_path();
        if path.exists() {
            fs::remove_file(&path).map_err(|e| TutorError::storage(&path, e))?;
        }
        Ok(())
    }
}

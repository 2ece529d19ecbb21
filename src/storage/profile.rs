//! Local learner profile.
//!
//! The profile is created once and never rewritten while the file exists.
//! Clearing course history leaves it alone.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::profile_path;
use crate::core::UserProfile;
use crate::error::{Result, TutorError};
use crate::storage::file::{remove_quietly, temp_path_for};

/// What the profile file holds.
enum Stored {
    Missing,
    Valid(UserProfile),
    Unreadable,
}

/// File-backed store for the single local [`UserProfile`].
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Create a store at the default location (`<tutor_home>/profile.json`).
    pub fn new() -> Result<Self> {
        let path = profile_path().ok_or_else(|| {
            TutorError::config("Could not determine profile path (no home directory)")
        })?;
        Ok(Self::with_path(path))
    }

    /// Create a store at a custom path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the profile.
    ///
    /// Returns `Ok(None)` when there is no profile or it lacks credentials.
    pub fn get(&self) -> Result<Option<UserProfile>> {
        match self.read()? {
            Stored::Valid(profile) => Ok(Some(profile)),
            Stored::Missing | Stored::Unreadable => Ok(None),
        }
    }

    fn read(&self) -> Result<Stored> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Stored::Missing),
            Err(e) => return Err(TutorError::storage(&self.path, e)),
        };

        match serde_json::from_slice::<UserProfile>(&content) {
            Ok(profile) if !profile.user_id.is_empty() && !profile.key.is_empty() => {
                Ok(Stored::Valid(profile))
            }
            Ok(_) => {
                warn!(path = %self.path.display(), "profile has empty credentials");
                Ok(Stored::Unreadable)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable profile");
                Ok(Stored::Unreadable)
            }
        }
    }

    /// Return the existing profile, or create one.
    ///
    /// The boolean is `true` when the profile was created by this call.
    /// Concurrent callers all receive the credentials that reached disk.
    pub fn get_or_create(&self, email: Option<String>) -> Result<(UserProfile, bool)> {
        match self.read()? {
            Stored::Valid(profile) => return Ok((profile, false)),
            Stored::Missing => {}
            Stored::Unreadable => {
                info!(path = %self.path.display(), "replacing unreadable profile");
                if let Err(e) = fs::remove_file(&self.path) {
                    if e.kind() != io::ErrorKind::NotFound {
                        return Err(TutorError::storage(&self.path, e));
                    }
                }
            }
        }

        let profile = UserProfile::generate(email);
        if self.publish(&profile)? {
            info!(user_id = %profile.user_id, "created user profile");
            return Ok((profile, true));
        }

        debug!(path = %self.path.display(), "profile created concurrently, using it");
        let existing = self.get()?.ok_or_else(|| {
            TutorError::corrupt_state(&self.path, "profile written concurrently is unreadable")
        })?;
        Ok((existing, false))
    }

    /// Write `profile` to a temp file and link it into place.
    ///
    /// Returns `false` without touching the existing file if a profile
    /// already exists.
    fn publish(&self, profile: &UserProfile) -> Result<bool> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| TutorError::storage(parent, e))?;
        }

        let json = serde_json::to_string_pretty(profile)?;
        let temp_path = temp_path_for(&self.path);
        let written = create_private(&temp_path).and_then(|mut file| {
            file.write_all(json.as_bytes())
                .and_then(|_| file.sync_all())
                .map_err(|e| TutorError::storage(&temp_path, e))
        });
        if let Err(e) = written {
            remove_quietly(&temp_path);
            return Err(e);
        }

        let linked = fs::hard_link(&temp_path, &self.path);
        remove_quietly(&temp_path);
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(TutorError::storage(&self.path, e)),
        }
    }
}

/// Create a file readable and writable by the owner only.
#[cfg(unix)]
fn create_private(path: &Path) -> Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| TutorError::storage(path, e))
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| TutorError::storage(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_missing() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::with_path(dir.path().join("profile.json"));
        assert!(store.get().unwrap().is_none());
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::with_path(dir.path().join("home").join("profile.json"));

        let (first, created) = store.get_or_create(Some("a@example.com".into())).unwrap();
        assert!(created);
        assert_eq!(first.email.as_deref(), Some("a@example.com"));
        assert_eq!(first.key.len(), 32);

        let (second, created) = store.get_or_create(Some("b@example.com".into())).unwrap();
        assert!(!created);
        assert_eq!(second, first);
    }

    #[test]
    fn test_profile_file_format() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::with_path(dir.path().join("profile.json"));
        let (profile, _) = store.get_or_create(None).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(value["user_id"], profile.user_id.as_str());
        assert_eq!(value["key"], profile.key.as_str());
        assert!(value.get("email").is_none());
    }

    #[test]
    fn test_reads_minimal_profile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, r#"{"user_id": "u-1", "key": "k-1"}"#).unwrap();

        let (profile, created) = ProfileStore::with_path(&path).get_or_create(None).unwrap();
        assert!(!created);
        assert_eq!(profile.user_id, "u-1");
    }

    #[test]
    fn test_corrupt_profile_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "not json").unwrap();

        let store = ProfileStore::with_path(&path);
        let (_, created) = store.get_or_create(None).unwrap();
        assert!(created);
        assert!(store.get().unwrap().is_some());
    }

    #[test]
    fn test_concurrent_creation_hands_out_one_profile() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::with_path(dir.path().join("profile.json"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.get_or_create(None).unwrap())
            })
            .collect();
        let results: Vec<(UserProfile, bool)> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        let on_disk = store.get().unwrap().unwrap();
        assert!(results.iter().all(|(profile, _)| *profile == on_disk));
        assert_eq!(results.iter().filter(|(_, created)| *created).count(), 1);

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_existing_profile_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::with_path(dir.path().join("profile.json"));
        let (first, _) = store.get_or_create(None).unwrap();

        assert!(!store.publish(&UserProfile::generate(None)).unwrap());
        assert_eq!(store.get().unwrap().unwrap(), first);
    }

    #[cfg(unix)]
    #[test]
    fn test_profile_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = ProfileStore::with_path(dir.path().join("profile.json"));
        store.get_or_create(None).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

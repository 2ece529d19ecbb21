//! Progress storage traits.
//!
//! This module defines the `ProgressStore` trait for per-level progress
//! persistence.

use std::sync::Arc;

use crate::core::CourseState;
use crate::error::Result;

/// Trait for progress storage backends.
///
/// One document per course level. The store also remembers which level was
/// started most recently so callers can resume without naming it.
pub trait ProgressStore: Send + Sync {
    /// Load the progress of a level.
    ///
    /// Returns `Ok(None)` if no progress exists or it cannot be parsed.
    fn load(&self, level: &str) -> Result<Option<CourseState>>;

    /// Save the progress of a level, replacing any previous document.
    fn save(&self, state: &CourseState) -> Result<()>;

    /// Delete the progress of a level.
    ///
    /// Returns whether a document existed. Deleting a missing level succeeds.
    fn delete(&self, level: &str) -> Result<bool>;

    /// The level most recently started, if any.
    fn active_level(&self) -> Result<Option<String>>;

    /// Record the level most recently started.
    fn set_active_level(&self, level: &str) -> Result<()>;

    /// Forget the active level.
    fn clear_active_level(&self) -> Result<()>;

    /// Check if progress exists for a level.
    fn exists(&self, level: &str) -> Result<bool> {
        Ok(self.load(level)?.is_some())
    }
}

/// Blanket implementation of ProgressStore for Arc-wrapped stores.
///
/// This allows using `Arc<T>` where `T: ProgressStore` is expected,
/// which is useful for sharing stores between tests and threads.
impl<T: ProgressStore + ?Sized> ProgressStore for Arc<T> {
    fn load(&self, level: &str) -> Result<Option<CourseState>> {
        (**self).load(level)
    }

    fn save(&self, state: &CourseState) -> Result<()> {
        (**self).save(state)
    }

    fn delete(&self, level: &str) -> Result<bool> {
        (**self).delete(level)
    }

    fn active_level(&self) -> Result<Option<String>> {
        (**self).active_level()
    }

    fn set_active_level(&self, level: &str) -> Result<()> {
        (**self).set_active_level(level)
    }

    fn clear_active_level(&self) -> Result<()> {
        (**self).clear_active_level()
    }
}

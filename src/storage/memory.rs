//! In-memory progress storage for testing.
//!
//! This module provides a thread-safe in-memory implementation of the
//! ProgressStore trait, primarily for use in unit tests.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::core::CourseState;
use crate::error::Result;
use crate::storage::ProgressStore;

/// In-memory progress store for testing.
///
/// Thread-safe implementation using `RwLock<HashMap>`.
/// Progress is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    levels: RwLock<HashMap<String, CourseState>>,
    active: RwLock<Option<String>>,
}

impl MemoryProgressStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of levels with saved progress.
    pub fn len(&self) -> usize {
        self.levels.read().unwrap().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.levels.read().unwrap().is_empty()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self, level: &str) -> Result<Option<CourseState>> {
        let levels = self.levels.read().unwrap();
        Ok(levels.get(level).cloned())
    }

    fn save(&self, state: &CourseState) -> Result<()> {
        let mut levels = self.levels.write().unwrap();
        levels.insert(state.level.clone(), state.clone());
        Ok(())
    }

    fn delete(&self, level: &str) -> Result<bool> {
        let mut levels = self.levels.write().unwrap();
        Ok(levels.remove(level).is_some())
    }

    fn active_level(&self) -> Result<Option<String>> {
        Ok(self.active.read().unwrap().clone())
    }

    fn set_active_level(&self, level: &str) -> Result<()> {
        *self.active.write().unwrap() = Some(level.to_string());
        Ok(())
    }

    fn clear_active_level(&self) -> Result<()> {
        *self.active.write().unwrap() = None;
        Ok(())
    }
}

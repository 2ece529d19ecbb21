//! Core types and logic for the tutor.
//!
//! This module contains the course progress model, the manifest reader and
//! scanner, the merge engine, the progression state machine, and content
//! search.

pub mod manifest;
pub mod merge;
pub mod progression;
pub mod scanner;
pub mod search;
pub mod state;

pub use manifest::{CourseManifest, ManifestModule, MANIFEST_FILE};
pub use merge::{merge, merge_with_report, MergeReport};
pub use progression::{advance, begin, current, start_at, Advance, Position, Progress};
pub use scanner::{CourseLayout, ModuleLayout, Scanner, StepLayout};
pub use search::{search, SearchHit};
pub use state::{Completion, CourseState, ModuleState, Status, StepState, UserProfile};

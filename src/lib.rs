//! Tutor - progress-tracked course engine for LLM tool hosts
//!
//! Tutor turns a static course directory into a sequence of lessons. It
//! scans the course structure, reconciles it with the learner's saved
//! progress, and advances the learner step by step through a small set of
//! tools.

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod storage;
pub mod tools;
pub mod util;

pub use config::Config;
pub use core::{
    advance, current, merge, start_at, CourseState, ModuleState, Position, Progress, Scanner,
    Status, StepState, UserProfile,
};
pub use error::{Result, TutorError};
pub use storage::{FileProgressStore, MemoryProgressStore, ProfileStore, ProgressStore};
pub use tools::{ToolName, ToolOutput, ToolRunner};

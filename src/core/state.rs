//! Course progress types.
//!
//! These types represent a learner's progress through one level of a course.
//! Module and course status are projections over step status: they are
//! computed on demand and never trusted from disk.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress status of a step, module or course.
///
/// Serialized as the integers `0`, `1`, `2` at the storage boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum Status {
    /// Not opened yet.
    #[default]
    NotStarted,
    /// Opened but not completed.
    InProgress,
    /// Completed.
    Completed,
}

impl Status {
    /// Roll up a sequence of child statuses.
    ///
    /// Completed iff every child is Completed (and there is at least one),
    /// InProgress iff any child has been started, NotStarted otherwise.
    pub fn roll_up<I>(children: I) -> Status
    where
        I: IntoIterator<Item = Status>,
    {
        let mut any = false;
        let mut all_completed = true;
        let mut any_started = false;

        for status in children {
            any = true;
            all_completed &= status == Status::Completed;
            any_started |= status != Status::NotStarted;
        }

        if any && all_completed {
            Status::Completed
        } else if any_started {
            Status::InProgress
        } else {
            Status::NotStarted
        }
    }

    /// Status icon used in text reports.
    pub fn icon(&self) -> &'static str {
        match self {
            Status::NotStarted => "⬜",
            Status::InProgress => "🔶",
            Status::Completed => "✅",
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        match status {
            Status::NotStarted => 0,
            Status::InProgress => 1,
            Status::Completed => 2,
        }
    }
}

impl TryFrom<u8> for Status {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Status::NotStarted),
            1 => Ok(Status::InProgress),
            2 => Ok(Status::Completed),
            other => Err(format!("invalid status {} (expected 0, 1 or 2)", other)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::NotStarted => "not started",
            Status::InProgress => "in progress",
            Status::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// One leaf unit of course content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepState {
    /// Step name derived from the file name without ordering prefix or extension.
    pub name: String,
    /// Progress on this step.
    #[serde(default)]
    pub status: Status,
}

impl StepState {
    /// Create a step that has not been started.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::NotStarted,
        }
    }

    /// Create a step with an explicit status.
    pub fn with_status(name: impl Into<String>, status: Status) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }

    /// Whether this step is completed.
    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }
}

/// Ordered container of steps.
///
/// The on-disk record carries a `status` field for compatibility; it is
/// written from [`ModuleState::status`] and discarded on read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(into = "ModuleRecord", from = "ModuleRecord")]
pub struct ModuleState {
    /// Module name derived from the directory name.
    pub name: String,
    /// Steps in author order.
    pub steps: Vec<StepState>,
}

impl ModuleState {
    /// Create a module from its steps.
    pub fn new(name: impl Into<String>, steps: Vec<StepState>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Status derived from the module's steps.
    pub fn status(&self) -> Status {
        Status::roll_up(self.steps.iter().map(|s| s.status))
    }

    /// Number of completed steps.
    pub fn completed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.is_completed()).count()
    }

    /// Find a step by name.
    pub fn step(&self, name: &str) -> Option<&StepState> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Serialized shape of a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModuleRecord {
    name: String,
    #[serde(default)]
    status: Status,
    #[serde(default)]
    steps: Vec<StepState>,
}

impl From<ModuleState> for ModuleRecord {
    fn from(module: ModuleState) -> Self {
        Self {
            status: module.status(),
            name: module.name,
            steps: module.steps,
        }
    }
}

impl From<ModuleRecord> for ModuleState {
    fn from(record: ModuleRecord) -> Self {
        Self {
            name: record.name,
            steps: record.steps,
        }
    }
}

/// Ordered container of modules for one level of a course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourseState {
    /// Level identifier (e.g. `beginner`).
    pub level: String,
    /// Modules in author order.
    #[serde(default)]
    pub modules: Vec<ModuleState>,
}

impl CourseState {
    /// Create a course state.
    pub fn new(level: impl Into<String>, modules: Vec<ModuleState>) -> Self {
        Self {
            level: level.into(),
            modules,
        }
    }

    /// Status derived from every step of every module.
    pub fn status(&self) -> Status {
        Status::roll_up(self.modules.iter().map(ModuleState::status))
    }

    /// Whether every step is completed.
    pub fn is_completed(&self) -> bool {
        self.status() == Status::Completed
    }

    /// Find a module by name.
    pub fn module(&self, name: &str) -> Option<&ModuleState> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Module names in order.
    pub fn module_names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name.clone()).collect()
    }

    /// Total number of steps.
    pub fn total_steps(&self) -> usize {
        self.modules.iter().map(|m| m.steps.len()).sum()
    }

    /// Number of completed steps.
    pub fn completed_steps(&self) -> usize {
        self.modules.iter().map(ModuleState::completed_steps).sum()
    }

    /// Aggregate progress counts.
    pub fn completion(&self) -> Completion {
        Completion {
            steps_completed: self.completed_steps(),
            steps_total: self.total_steps(),
            modules_completed: self
                .modules
                .iter()
                .filter(|m| m.status() == Status::Completed)
                .count(),
            modules_total: self.modules.len(),
        }
    }
}

/// Aggregate progress counts for a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub steps_completed: usize,
    pub steps_total: usize,
    pub modules_completed: usize,
    pub modules_total: usize,
}

impl Completion {
    /// Completed steps as a whole percentage, rounded down.
    pub fn percent(&self) -> u32 {
        if self.steps_total == 0 {
            return 0;
        }
        ((self.steps_completed * 100) / self.steps_total) as u32
    }
}

/// Local learner identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    /// Opaque stable identifier.
    pub user_id: String,
    /// Opaque secret paired with `user_id`.
    pub key: String,
    /// Contact email given at registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// When the profile was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Generate fresh credentials.
    pub fn generate(email: Option<String>) -> Self {
        Self {
            user_id: uuid::Uuid::new_v4().to_string(),
            key: uuid::Uuid::new_v4().simple().to_string(),
            email,
            created_at: Some(Utc::now()),
        }
    }
}

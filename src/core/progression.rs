//! Progression state machine.
//!
//! The cursor is never stored. It is the first step, in document order,
//! that is not completed; when there is none the course is complete.

use std::fmt;

use tracing::{debug, info};

use crate::core::state::{CourseState, Status};
use crate::error::{Result, TutorError};

/// A (module, step) pair within a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Index of the module in the course.
    pub module_index: usize,
    /// Index of the step in the module.
    pub step_index: usize,
    /// Module name.
    pub module: String,
    /// Step name.
    pub step: String,
}

impl Position {
    fn at(state: &CourseState, module_index: usize, step_index: usize) -> Self {
        let module = &state.modules[module_index];
        Self {
            module_index,
            step_index,
            module: module.name.clone(),
            step: module.steps[step_index].name.clone(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.module, self.step)
    }
}

/// Where the learner stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// The learner should work on this step next.
    At(Position),
    /// Every step is completed.
    Complete,
}

impl Progress {
    /// The cursor position, if the course is not complete.
    pub fn position(&self) -> Option<&Position> {
        match self {
            Progress::At(position) => Some(position),
            Progress::Complete => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Progress::Complete)
    }
}

/// Outcome of one [`advance`] transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    /// The step that was marked completed, `None` if the course was already complete.
    pub completed: Option<Position>,
    /// Name of the module this transition finished, if any.
    pub finished_module: Option<String>,
    /// The new cursor.
    pub next: Progress,
}

/// The cursor of `state`.
pub fn current(state: &CourseState) -> Progress {
    for (mi, module) in state.modules.iter().enumerate() {
        if let Some(si) = module.steps.iter().position(|s| !s.is_completed()) {
            return Progress::At(Position::at(state, mi, si));
        }
    }
    Progress::Complete
}

/// Locate the entry point of a module: its first non-completed step, or its
/// first step when everything in it is already completed.
///
/// # Errors
///
/// `UnknownModule` (listing the valid module names) if no module matches,
/// or if the module has no steps.
pub fn start_at(state: &CourseState, module_name: &str) -> Result<Position> {
    let unknown = || TutorError::unknown_module(module_name, state.module_names());

    let mi = state
        .modules
        .iter()
        .position(|m| m.name == module_name)
        .ok_or_else(unknown)?;
    let module = &state.modules[mi];
    if module.steps.is_empty() {
        return Err(unknown());
    }

    let si = module
        .steps
        .iter()
        .position(|s| !s.is_completed())
        .unwrap_or(0);
    Ok(Position::at(state, mi, si))
}

/// Mark the step at `position` as opened.
///
/// Only a not-started step moves (to InProgress); a completed step is
/// never demoted. Returns `None` when nothing changes.
pub fn begin(state: &CourseState, position: &Position) -> Option<CourseState> {
    let step = state
        .modules
        .get(position.module_index)?
        .steps
        .get(position.step_index)?;
    if step.status != Status::NotStarted {
        return None;
    }

    let mut next = state.clone();
    next.modules[position.module_index].steps[position.step_index].status = Status::InProgress;
    debug!(level = %state.level, position = %position, "step opened");
    Some(next)
}

/// Complete the cursor step and move the cursor on.
///
/// Saturating: on a completed course this returns the state unchanged and
/// reports [`Progress::Complete`] again.
pub fn advance(state: &CourseState) -> (CourseState, Advance) {
    let Progress::At(position) = current(state) else {
        debug!(level = %state.level, "advance on completed course");
        return (
            state.clone(),
            Advance {
                completed: None,
                finished_module: None,
                next: Progress::Complete,
            },
        );
    };

    let mut next_state = state.clone();
    let module = &mut next_state.modules[position.module_index];
    module.steps[position.step_index].status = Status::Completed;
    let finished_module = (module.status() == Status::Completed).then(|| module.name.clone());

    let next = current(&next_state);
    info!(
        level = %state.level,
        completed = %position,
        next = ?next.position().map(ToString::to_string),
        "step completed"
    );

    (
        next_state,
        Advance {
            completed: Some(position),
            finished_module,
            next,
        },
    )
}

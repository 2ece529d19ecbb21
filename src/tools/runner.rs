//! Tool runner.
//!
//! This module maps tool invocations onto the scanner, merge engine,
//! progression state machine and stores. Every mutating call is one
//! load → merge → transition → save unit with no state held in between.

use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::core::{
    advance, begin, current, merge, search, start_at, CourseLayout, CourseState, Position,
    Progress, Scanner,
};
use crate::error::{FailOpen, Result, TutorError};
use crate::storage::{ProfileStore, ProgressStore};
use crate::tools::input::{
    parse_args, require_non_empty, ClearArgs, LevelArgs, ModuleArgs, NextArgs, RegisterArgs,
    SearchArgs, StepArgs,
};
use crate::tools::render;
use crate::util::read_to_string_limited;

/// Tool enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    RegisterUser,
    StartCourse,
    GetCourseStatus,
    NextCourseStep,
    ClearCourseHistory,
    JumpToModule,
    ListCourses,
    GetCourseOutline,
    GetModuleContent,
    GetStepContent,
    SearchCourseContent,
}

impl ToolName {
    /// Every tool, in listing order.
    pub const ALL: [ToolName; 11] = [
        ToolName::RegisterUser,
        ToolName::StartCourse,
        ToolName::GetCourseStatus,
        ToolName::NextCourseStep,
        ToolName::ClearCourseHistory,
        ToolName::JumpToModule,
        ToolName::ListCourses,
        ToolName::GetCourseOutline,
        ToolName::GetModuleContent,
        ToolName::GetStepContent,
        ToolName::SearchCourseContent,
    ];

    /// Parse a tool name, accepting `-` in place of `_`.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|t| t.as_str() == normalized)
    }

    /// Wire name of the tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegisterUser => "register_user",
            Self::StartCourse => "start_course",
            Self::GetCourseStatus => "get_course_status",
            Self::NextCourseStep => "next_course_step",
            Self::ClearCourseHistory => "clear_course_history",
            Self::JumpToModule => "jump_to_module",
            Self::ListCourses => "list_courses",
            Self::GetCourseOutline => "get_course_outline",
            Self::GetModuleContent => "get_module_content",
            Self::GetStepContent => "get_step_content",
            Self::SearchCourseContent => "search_course_content",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::RegisterUser => {
                "Create the local learner profile. Safe to call again: existing credentials are kept."
            }
            Self::StartCourse => {
                "Start or resume a course level and return the lesson for the current step."
            }
            Self::GetCourseStatus => {
                "Show progress for a course level: completed steps, percentage and current position."
            }
            Self::NextCourseStep => {
                "Mark the current step complete and return the next lesson or a completion message."
            }
            Self::ClearCourseHistory => {
                "Delete saved progress for a course level. Requires `confirm: true`."
            }
            Self::JumpToModule => {
                "Open a specific module of a course level, at its first unfinished step."
            }
            Self::ListCourses => "List all available course levels with their titles.",
            Self::GetCourseOutline => "Get the modules and steps of a course level.",
            Self::GetModuleContent => {
                "Get the content of every step in a module. Does not change progress."
            }
            Self::GetStepContent => "Get the content of one step. Does not change progress.",
            Self::SearchCourseContent => {
                "Search course titles, module names and step content for a keyword."
            }
        }
    }

    /// JSON schema of the tool arguments.
    pub fn schema(&self) -> Value {
        let level = json!({
            "type": "string",
            "description": "Course level (e.g. beginner, intermediate, advanced)"
        });
        let module = json!({ "type": "string", "description": "Module name from the outline" });
        match self {
            Self::RegisterUser => json!({
                "type": "object",
                "properties": {
                    "email": { "type": "string", "description": "Learner email address" }
                }
            }),
            Self::StartCourse | Self::GetCourseStatus | Self::GetCourseOutline => json!({
                "type": "object",
                "properties": { "level": level },
                "required": ["level"]
            }),
            Self::NextCourseStep => json!({
                "type": "object",
                "properties": { "level": level }
            }),
            Self::ClearCourseHistory => json!({
                "type": "object",
                "properties": {
                    "confirm": {
                        "type": "boolean",
                        "description": "Must be true to delete progress"
                    },
                    "level": level
                },
                "required": ["confirm"]
            }),
            Self::JumpToModule | Self::GetModuleContent => json!({
                "type": "object",
                "properties": {
                    "level": level,
                    "module": module
                },
                "required": ["level", "module"]
            }),
            Self::GetStepContent => json!({
                "type": "object",
                "properties": {
                    "level": level,
                    "module": module,
                    "step": { "type": "string", "description": "Step name from the outline" }
                },
                "required": ["level", "module", "step"]
            }),
            Self::SearchCourseContent => json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Keyword to look for" },
                    "level": {
                        "type": "string",
                        "description": "Limit the search to one course level"
                    }
                },
                "required": ["query"]
            }),
            Self::ListCourses => json!({ "type": "object", "properties": {} }),
        }
    }
}

/// Result of a tool call as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    fn ok(text: String) -> Self {
        Self {
            text,
            is_error: false,
        }
    }

    fn error(err: &TutorError) -> Self {
        Self {
            text: err.to_string(),
            is_error: true,
        }
    }
}

/// Tool runner context.
pub struct ToolRunner<S: ProgressStore> {
    /// Progress storage.
    store: S,
    /// Learner profile storage.
    profiles: ProfileStore,
    /// Course content scanner.
    scanner: Scanner,
}

impl<S: ProgressStore> ToolRunner<S> {
    /// Create a new tool runner.
    pub fn new(store: S, profiles: ProfileStore, scanner: Scanner) -> Self {
        Self {
            store,
            profiles,
            scanner,
        }
    }

    /// Call a tool by wire name. Failures come back as error-flagged text.
    pub fn call(&self, name: &str, args: Value) -> ToolOutput {
        let Some(tool) = ToolName::parse(name) else {
            warn!(tool = name, "unknown tool");
            let known: Vec<&str> = ToolName::ALL.iter().map(ToolName::as_str).collect();
            return ToolOutput {
                text: format!("unknown tool '{}' (available: {})", name, known.join(", ")),
                is_error: true,
            };
        };

        match self.run(tool, args) {
            Ok(text) => ToolOutput::ok(text),
            Err(err) => {
                if err.is_user_facing() {
                    info!(tool = tool.as_str(), error = %err, "tool rejected call");
                } else {
                    error!(tool = tool.as_str(), error = %err, "tool failed");
                }
                ToolOutput::error(&err)
            }
        }
    }

    /// Run a tool with JSON arguments.
    pub fn run(&self, tool: ToolName, args: Value) -> Result<String> {
        match tool {
            ToolName::RegisterUser => self.register(parse_args(args)?),
            ToolName::StartCourse => self.start(parse_args(args)?),
            ToolName::GetCourseStatus => self.status(parse_args(args)?),
            ToolName::NextCourseStep => self.next(parse_args(args)?),
            ToolName::ClearCourseHistory => self.clear(parse_args(args)?),
            ToolName::JumpToModule => self.jump(parse_args(args)?),
            ToolName::ListCourses => self.list_courses(),
            ToolName::GetCourseOutline => self.outline(parse_args(args)?),
            ToolName::GetModuleContent => self.module_content(parse_args(args)?),
            ToolName::GetStepContent => self.step_content(parse_args(args)?),
            ToolName::SearchCourseContent => self.search_content(parse_args(args)?),
        }
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    fn register(&self, args: RegisterArgs) -> Result<String> {
        let (profile, created) = self.profiles.get_or_create(args.email)?;
        if created {
            Ok(render::onboarding(&profile))
        } else {
            Ok(render::already_registered(&profile))
        }
    }

    /// Load, merge, open the cursor step and save.
    ///
    /// Nothing is saved unless the lesson could be read.
    fn start(&self, args: LevelArgs) -> Result<String> {
        require_non_empty("level", &args.level)?;
        let (layout, merged) = self.load_merged(&args.level)?;

        let text = match current(&merged) {
            Progress::At(position) => {
                let text = self.lesson(&layout, &position)?;
                let state = begin(&merged, &position).unwrap_or(merged);
                self.store.save(&state)?;
                text
            }
            Progress::Complete => {
                self.store.save(&merged)?;
                render::course_complete(&layout.title)
            }
        };

        self.remember_level(&args.level);
        info!(level = %args.level, "course started");
        Ok(text)
    }

    /// Read-only: progress is merged for display but not saved.
    fn status(&self, args: LevelArgs) -> Result<String> {
        require_non_empty("level", &args.level)?;
        let (layout, merged) = self.load_merged(&args.level)?;
        Ok(render::status_report(&layout, &merged, &current(&merged)))
    }

    fn next(&self, args: NextArgs) -> Result<String> {
        let level = match args.level {
            Some(level) => {
                require_non_empty("level", &level)?;
                level
            }
            None => self.store.active_level()?.ok_or(TutorError::NoActiveCourse)?,
        };

        let persisted = self.store.load(&level)?.ok_or(TutorError::NoActiveCourse)?;
        let layout = self.scanner.layout(&level)?;
        let merged = merge(Some(&persisted), &layout.to_state());

        let (advanced, outcome) = advance(&merged);
        let text = match &outcome.next {
            Progress::At(position) => {
                let mut text = String::new();
                if let Some(finished) = &outcome.finished_module {
                    text.push_str(&render::module_complete(finished, Some(&position.module)));
                }
                text.push_str(&self.lesson(&layout, position)?);

                let state = begin(&advanced, position).unwrap_or(advanced);
                self.store.save(&state)?;
                text
            }
            Progress::Complete => {
                self.store.save(&advanced)?;
                let mut text = String::new();
                if let Some(finished) = &outcome.finished_module {
                    text.push_str(&render::module_complete(finished, None));
                }
                text.push_str(&render::course_complete(&layout.title));
                text
            }
        };

        self.remember_level(&level);
        Ok(text)
    }

    fn clear(&self, args: ClearArgs) -> Result<String> {
        if !args.confirm {
            return Err(TutorError::ConfirmationRequired);
        }

        let active = self.store.active_level().fail_open_default("reading active level");
        let Some(level) = args.level.or_else(|| active.clone()) else {
            return Ok("There was no course history to clear.".to_string());
        };
        require_non_empty("level", &level)?;

        let existed = self.store.delete(&level)?;
        if active.as_deref() == Some(level.as_str()) {
            self.store
                .clear_active_level()
                .fail_open_default("clearing active level");
        }
        info!(level = %level, existed, "course history cleared");
        Ok(render::cleared(&level, existed))
    }

    fn jump(&self, args: ModuleArgs) -> Result<String> {
        require_non_empty("level", &args.level)?;
        let (layout, merged) = self.load_merged(&args.level)?;

        let position = start_at(&merged, &args.module)?;
        let text = self.lesson(&layout, &position)?;
        let state = begin(&merged, &position).unwrap_or(merged);
        self.store.save(&state)?;
        self.remember_level(&args.level);

        info!(level = %args.level, position = %position, "jumped to module");
        Ok(text)
    }

    fn list_courses(&self) -> Result<String> {
        let courses: Vec<(String, String)> = self
            .scanner
            .levels()
            .into_iter()
            .filter_map(|level| {
                let title = self.scanner.layout(&level).ok()?.title;
                Some((level, title))
            })
            .collect();
        Ok(render::level_list(&courses))
    }

    fn outline(&self, args: LevelArgs) -> Result<String> {
        require_non_empty("level", &args.level)?;
        Ok(render::outline(&self.scanner.layout(&args.level)?))
    }

    fn module_content(&self, args: ModuleArgs) -> Result<String> {
        require_non_empty("level", &args.level)?;
        let layout = self.scanner.layout(&args.level)?;
        let module = layout
            .module(&args.module)
            .ok_or_else(|| TutorError::unknown_module(&args.module, layout.module_names()))?;
        let bodies = module
            .steps
            .iter()
            .map(|step| read_to_string_limited(&step.path))
            .collect::<Result<Vec<_>>>()?;
        Ok(render::module_content(&layout, module, &bodies))
    }

    fn step_content(&self, args: StepArgs) -> Result<String> {
        require_non_empty("level", &args.level)?;
        let layout = self.scanner.layout(&args.level)?;
        let step = layout.step(&args.module, &args.step)?;
        let content = read_to_string_limited(&step.path)?;
        Ok(render::step_content(&layout, &args.module, &args.step, &content))
    }

    fn search_content(&self, args: SearchArgs) -> Result<String> {
        let level = args.level.as_deref().filter(|l| !l.trim().is_empty());
        let hits = search(&self.scanner, &args.query, level)?;
        Ok(render::search_results(args.query.trim(), &hits))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Scan a level and merge saved progress into it.
    fn load_merged(&self, level: &str) -> Result<(CourseLayout, CourseState)> {
        let layout = self.scanner.layout(level)?;
        let persisted = self.store.load(level)?;
        let merged = merge(persisted.as_ref(), &layout.to_state());
        Ok((layout, merged))
    }

    /// Read and frame the step at `position`.
    fn lesson(&self, layout: &CourseLayout, position: &Position) -> Result<String> {
        let step = layout
            .modules
            .get(position.module_index)
            .and_then(|m| m.steps.get(position.step_index))
            .ok_or_else(|| {
                TutorError::invalid_input(format!("step '{}' is not in the course", position))
            })?;
        let content = read_to_string_limited(&step.path)?;
        Ok(render::lesson(position, &content))
    }

    fn remember_level(&self, level: &str) {
        self.store
            .set_active_level(level)
            .fail_open_default("recording active level");
    }
}

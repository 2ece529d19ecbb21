//! Tutor - progress-tracked course engine for LLM tool hosts
//!
//! CLI entry point with global panic handler.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use tutor::config::{crash_log_path, Config};
use tutor::core::Scanner;
use tutor::error::exit_codes;
use tutor::storage::{FileProgressStore, ProfileStore};
use tutor::tools::{parse_args_str, serve, ToolName, ToolOutput, ToolRunner};

// =============================================================================
// CLI Definition
// =============================================================================

/// Tutor - progress-tracked course engine for LLM tool hosts
#[derive(Parser)]
#[command(name = "tutor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Course content directory (overrides config)
    #[arg(long, global = true)]
    content_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// [User] Create the local learner profile
    Register {
        /// Contact email
        #[arg(long)]
        email: Option<String>,
    },

    /// [User] Start or resume a course level
    Start {
        /// Course level
        level: String,
    },

    /// [User] Show progress for a course level
    Status {
        /// Course level
        level: String,
    },

    /// [User] Complete the current step and show the next one
    Next {
        /// Course level (defaults to the level most recently started)
        #[arg(long)]
        level: Option<String>,
    },

    /// [User] Delete saved progress for a course level
    Clear {
        /// Course level (defaults to the level most recently started)
        #[arg(long)]
        level: Option<String>,
        /// Confirm deletion
        #[arg(long, short)]
        yes: bool,
    },

    /// [User] Open a specific module of a course level
    Jump {
        /// Course level
        level: String,
        /// Module name
        module: String,
    },

    /// [User] List available course levels
    Levels,

    /// [User] Show the modules and steps of a course level
    Outline {
        /// Course level
        level: String,
    },

    /// [User] Print a module, or one of its steps, without changing progress
    Show {
        /// Course level
        level: String,
        /// Module name
        module: String,
        /// Step name (prints the whole module when omitted)
        step: Option<String>,
    },

    /// [User] Search course content for a keyword
    Search {
        /// Keyword to look for
        query: String,
        /// Limit the search to one course level
        #[arg(long)]
        level: Option<String>,
    },

    /// [Host] Call a tool with JSON arguments read from stdin
    Tool {
        /// Tool name (e.g. start_course)
        name: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// [Host] Serve tools over JSON-RPC on stdin/stdout
    Serve,
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("tutor error: {}", e);
            ExitCode::from(exit_codes::TOOL_ERROR as u8)
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to `<tutor_home>/crash.log` and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("tutor panic: {}", info);

        if let Some(crash_log) = crash_log_path() {
            if let Some(parent) = crash_log.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = Config::load();
    if let Some(dir) = cli.content_dir {
        config.course.content_dir = dir;
    }
    tutor::logging::init(&config.log);
    tracing::debug!(content_dir = %config.course.content_dir.display(), "configuration loaded");

    let runner = ToolRunner::new(
        FileProgressStore::new()?,
        ProfileStore::new()?,
        Scanner::new(&config.course.content_dir),
    );

    let (tool, args) = match cli.command {
        Commands::Register { email } => (ToolName::RegisterUser, json!({ "email": email })),
        Commands::Start { level } => (ToolName::StartCourse, json!({ "level": level })),
        Commands::Status { level } => (ToolName::GetCourseStatus, json!({ "level": level })),
        Commands::Next { level } => (ToolName::NextCourseStep, json!({ "level": level })),
        Commands::Clear { level, yes } => (
            ToolName::ClearCourseHistory,
            json!({ "confirm": yes, "level": level }),
        ),
        Commands::Jump { level, module } => (
            ToolName::JumpToModule,
            json!({ "level": level, "module": module }),
        ),
        Commands::Levels => (ToolName::ListCourses, json!({})),
        Commands::Outline { level } => (ToolName::GetCourseOutline, json!({ "level": level })),
        Commands::Show {
            level,
            module,
            step: None,
        } => (
            ToolName::GetModuleContent,
            json!({ "level": level, "module": module }),
        ),
        Commands::Show {
            level,
            module,
            step: Some(step),
        } => (
            ToolName::GetStepContent,
            json!({ "level": level, "module": module, "step": step }),
        ),
        Commands::Search { query, level } => (
            ToolName::SearchCourseContent,
            json!({ "query": query, "level": level }),
        ),
        Commands::Tool { name, json } => return run_tool(&runner, &name, json),
        Commands::Serve => {
            tracing::info!("serving tools on stdio");
            serve(&runner, io::stdin().lock(), io::stdout().lock())?;
            return Ok(ExitCode::from(exit_codes::SUCCESS as u8));
        }
    };

    let output = runner.call(tool.as_str(), args);
    print_output(&output, false)
}

// =============================================================================
// Command Implementations
// =============================================================================

fn run_tool(
    runner: &ToolRunner<FileProgressStore>,
    name: &str,
    json: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    let output = match parse_args_str::<Value>(&input) {
        Ok(args) => runner.call(name, args),
        Err(e) => ToolOutput {
            text: e.to_string(),
            is_error: true,
        },
    };
    print_output(&output, json)
}

fn print_output(output: &ToolOutput, json: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(output)?);
    } else if output.is_error {
        eprintln!("{}", output.text);
    } else {
        println!("{}", output.text);
    }

    let code = if output.is_error {
        exit_codes::TOOL_ERROR
    } else {
        exit_codes::SUCCESS
    };
    Ok(ExitCode::from(code as u8))
}

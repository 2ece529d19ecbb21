//! Text rendering for tool responses.
//!
//! Everything a tool returns to the host is plain markdown text.

use std::fmt::Write;

use crate::core::{
    CourseLayout, CourseState, ModuleLayout, Position, Progress, SearchHit, UserProfile,
};

const LESSON_GUIDE: &str = "You are tutoring a learner through a course. Teach the lesson \
below in your own words, check understanding with a short question, and when the learner \
is ready call `next_course_step` to continue.";

/// Search results shown before the remainder is summarized.
pub const MAX_SEARCH_RESULTS: usize = 10;

/// Onboarding text shown after a first registration.
pub fn onboarding(profile: &UserProfile) -> String {
    let mut out = String::from("# Welcome!\n\n");
    out.push_str("Your learner profile has been created.\n\n");
    let _ = writeln!(out, "- **User ID**: {}", profile.user_id);
    if let Some(email) = &profile.email {
        let _ = writeln!(out, "- **Email**: {}", email);
    }
    out.push_str(
        "\nUse `list_courses` to see the available levels, then `start_course` with a \
         level to begin. Your progress is saved after every step.",
    );
    out
}

/// Response to a repeated registration.
pub fn already_registered(profile: &UserProfile) -> String {
    format!(
        "You are already registered (user ID {}). Use `start_course` to begin.",
        profile.user_id
    )
}

/// Frame a step body as a lesson for the host.
pub fn lesson(position: &Position, content: &str) -> String {
    let body = if content.trim().is_empty() {
        "No content found for this step."
    } else {
        content
    };
    format!(
        "{}\n\n## Module: {} | Step: {}\n\n---\n\n{}",
        LESSON_GUIDE, position.module, position.step, body
    )
}

/// Banner shown when a module has just been finished.
pub fn module_complete(finished: &str, next_module: Option<&str>) -> String {
    match next_module {
        Some(next) if next != finished => format!(
            "🎉 Module '{}' complete!\n\nStarting next module: '{}'.\n\n",
            finished, next
        ),
        _ => format!("🎉 Module '{}' complete!\n\n", finished),
    }
}

/// Message for a course with every step completed.
pub fn course_complete(title: &str) -> String {
    format!(
        "🎉 Congratulations! You have completed the entire course: {}.\n\n\
         Use `get_course_status` to review it, or `clear_course_history` to start over.",
        title
    )
}

/// Progress report for one level.
pub fn status_report(layout: &CourseLayout, state: &CourseState, progress: &Progress) -> String {
    let completion = state.completion();
    let mut out = format!("# Course Progress: {}\n\n", layout.title);
    let _ = writeln!(out, "**Level**: {}", state.level);
    let _ = writeln!(
        out,
        "**Steps**: {}/{} completed ({}%)",
        completion.steps_completed,
        completion.steps_total,
        completion.percent()
    );
    let _ = writeln!(
        out,
        "**Modules**: {}/{} completed",
        completion.modules_completed, completion.modules_total
    );
    match progress {
        Progress::At(position) => {
            let _ = writeln!(out, "**Current**: {}", position);
        }
        Progress::Complete => out.push_str("**Current**: course complete\n"),
    }
    out.push('\n');

    for module in &state.modules {
        let _ = writeln!(out, "### {} {}", module.status().icon(), module.name);
        for step in &module.steps {
            let _ = writeln!(out, "- {} {}", step.status.icon(), step.name);
        }
        out.push('\n');
    }
    out
}

/// Listing of available levels with their titles.
pub fn level_list(courses: &[(String, String)]) -> String {
    if courses.is_empty() {
        return "No courses found.".to_string();
    }

    let mut out = String::from("Available Courses:\n\n");
    for (level, title) in courses {
        let _ = writeln!(out, "• **{}**: {}", level, title);
    }
    out
}

/// Outline of a course level.
pub fn outline(layout: &CourseLayout) -> String {
    let mut out = format!("# {}\n\n", layout.title);
    let _ = writeln!(out, "**Level**: {}", layout.level);
    let _ = writeln!(out, "**Description**: {}\n", layout.description);
    out.push_str("## Modules\n\n");
    for (i, module) in layout.modules.iter().enumerate() {
        let _ = writeln!(out, "### {}. {}", i + 1, module.name);
        let steps: Vec<&str> = module.steps.iter().map(|s| s.name.as_str()).collect();
        let _ = writeln!(out, "**Steps**: {}\n", steps.join(", "));
    }
    out
}

/// One step body with its course context, for direct lookup.
pub fn step_content(layout: &CourseLayout, module: &str, step: &str, content: &str) -> String {
    format!(
        "# {}\n\n**Module**: {}\n**Course**: {} ({})\n\n---\n\n{}",
        step, module, layout.title, layout.level, content
    )
}

/// Every step body of a module, in order.
pub fn module_content(layout: &CourseLayout, module: &ModuleLayout, bodies: &[String]) -> String {
    let mut out = format!("# {}\n\n", module.name);
    let _ = writeln!(out, "**Course**: {} ({})", layout.title, layout.level);
    let _ = writeln!(out, "**Steps**: {}\n", module.steps.len());
    for (step, body) in module.steps.iter().zip(bodies) {
        let _ = write!(out, "## {}\n\n{}\n\n---\n\n", step.name, body.trim_end());
    }
    out
}

/// Search matches, capped at [`MAX_SEARCH_RESULTS`].
pub fn search_results(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No content found matching '{}'", query);
    }

    let entries: Vec<String> = hits
        .iter()
        .take(MAX_SEARCH_RESULTS)
        .map(|hit| match hit {
            SearchHit::Course {
                level,
                title,
                description,
            } => format!("**Course**: {} ({})\n{}", title, level, description),
            SearchHit::Module {
                course_title,
                module,
            } => format!("**Module**: {} (Course: {})", module, course_title),
            SearchHit::Step {
                course_title,
                module,
                step,
                snippet,
            } => format!(
                "**Step**: {}\n**Module**: {}\n**Course**: {}\n\n{}",
                step, module, course_title, snippet
            ),
        })
        .collect();

    let mut out = format!("Search Results for '{}':\n\n{}", query, entries.join("\n\n---\n\n"));
    if hits.len() > MAX_SEARCH_RESULTS {
        let _ = write!(out, "\n\n... and {} more results", hits.len() - MAX_SEARCH_RESULTS);
    }
    out
}

/// Confirmation after clearing history.
pub fn cleared(level: &str, existed: bool) -> String {
    if existed {
        format!("Your course history for '{}' has been cleared.", level)
    } else {
        format!("There was no course history to clear for '{}'.", level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::merge::tests::course;
    use crate::core::Status::{Completed, InProgress, NotStarted};
    use crate::core::{current, ModuleLayout, StepLayout};
    use std::path::PathBuf;

    fn layout() -> CourseLayout {
        CourseLayout {
            level: "beginner".into(),
            title: "Rust Basics".into(),
            description: "Learn Rust".into(),
            modules: vec![ModuleLayout {
                name: "intro".into(),
                dir: PathBuf::from("/c/beginner/01_intro"),
                steps: vec![
                    StepLayout {
                        name: "welcome".into(),
                        path: PathBuf::from("/c/beginner/01_intro/01_welcome.md"),
                    },
                    StepLayout {
                        name: "setup".into(),
                        path: PathBuf::from("/c/beginner/01_intro/02_setup.md"),
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_status_report() {
        let state = course(&[("intro", &[("welcome", Completed), ("setup", InProgress)])]);
        let report = status_report(&layout(), &state, &current(&state));

        assert!(report.starts_with("# Course Progress: Rust Basics"));
        assert!(report.contains("**Steps**: 1/2 completed (50%)"));
        assert!(report.contains("**Modules**: 0/1 completed"));
        assert!(report.contains("**Current**: intro / setup"));
        assert!(report.contains("### 🔶 intro"));
        assert!(report.contains("- ✅ welcome"));
        assert!(report.contains("- 🔶 setup"));
    }

    #[test]
    fn test_status_report_not_started() {
        let state = course(&[("intro", &[("welcome", NotStarted), ("setup", NotStarted)])]);
        let report = status_report(&layout(), &state, &current(&state));
        assert!(report.contains("(0%)"));
        assert!(report.contains("### ⬜ intro"));
    }

    #[test]
    fn test_lesson_frames_content() {
        let state = course(&[("intro", &[("welcome", NotStarted)])]);
        let position = current(&state).position().cloned().unwrap();

        let text = lesson(&position, "# Hello");
        assert!(text.contains("## Module: intro | Step: welcome"));
        assert!(text.ends_with("# Hello"));
        assert!(lesson(&position, "").contains("No content found"));
    }

    #[test]
    fn test_module_complete_banner() {
        assert_eq!(
            module_complete("intro", Some("basics")),
            "🎉 Module 'intro' complete!\n\nStarting next module: 'basics'.\n\n"
        );
        assert_eq!(module_complete("intro", None), "🎉 Module 'intro' complete!\n\n");
    }

    #[test]
    fn test_outline() {
        let text = outline(&layout());
        assert!(text.contains("# Rust Basics"));
        assert!(text.contains("### 1. intro"));
        assert!(text.contains("**Steps**: welcome, setup"));
    }

    #[test]
    fn test_level_list() {
        assert_eq!(level_list(&[]), "No courses found.");
        let text = level_list(&[("beginner".into(), "Rust Basics".into())]);
        assert!(text.contains("• **beginner**: Rust Basics"));
    }

    #[test]
    fn test_step_and_module_content() {
        let layout = layout();
        let text = step_content(&layout, "intro", "setup", "Install rustup.");
        assert!(text.starts_with("# setup\n\n**Module**: intro\n**Course**: Rust Basics (beginner)"));
        assert!(text.ends_with("---\n\nInstall rustup."));

        let bodies = vec!["# Welcome\n".to_string(), "# Setup\n".to_string()];
        let text = module_content(&layout, &layout.modules[0], &bodies);
        assert!(text.starts_with("# intro\n\n**Course**: Rust Basics (beginner)"));
        assert!(text.contains("**Steps**: 2"));
        assert!(text.contains("## welcome\n\n# Welcome\n\n---"));
        assert!(text.find("## welcome").unwrap() < text.find("## setup").unwrap());
    }

    #[test]
    fn test_search_results_are_capped() {
        assert_eq!(search_results("loops", &[]), "No content found matching 'loops'");

        let hits: Vec<SearchHit> = (0..13)
            .map(|i| SearchHit::Module {
                course_title: "Rust Basics".into(),
                module: format!("m{i}"),
            })
            .collect();
        let text = search_results("m", &hits);
        assert!(text.starts_with("Search Results for 'm':\n\n**Module**: m0 (Course: Rust Basics)"));
        assert!(text.contains("**Module**: m9 "));
        assert!(!text.contains("**Module**: m10 "));
        assert_eq!(text.matches("\n\n---\n\n").count(), 9);
        assert!(text.ends_with("\n\n... and 3 more results"));
    }

    #[test]
    fn test_search_result_formats() {
        let hits = vec![
            SearchHit::Course {
                level: "beginner".into(),
                title: "Rust Basics".into(),
                description: "Learn Rust".into(),
            },
            SearchHit::Step {
                course_title: "Rust Basics".into(),
                module: "intro".into(),
                step: "setup".into(),
                snippet: "Install rustup.".into(),
            },
        ];
        let text = search_results("rust", &hits);
        assert!(text.contains("**Course**: Rust Basics (beginner)\nLearn Rust"));
        assert!(text.contains(
            "**Step**: setup\n**Module**: intro\n**Course**: Rust Basics\n\nInstall rustup."
        ));
        assert!(!text.contains("more results"));
    }
}

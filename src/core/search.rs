//! Keyword search over course content.
//!
//! Matching is a case-insensitive substring test against course titles and
//! descriptions, module names, step names and step bodies. Results keep
//! course, then module, then step order.

use tracing::{debug, warn};

use crate::core::scanner::{CourseLayout, Scanner};
use crate::error::{Result, TutorError};
use crate::util::read_to_string_limited;

/// Characters of step body kept in a result snippet.
pub const SNIPPET_CHARS: usize = 200;

/// One search match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchHit {
    /// The course title or description matched.
    Course {
        level: String,
        title: String,
        description: String,
    },
    /// A module name matched.
    Module {
        course_title: String,
        module: String,
    },
    /// A step name or body matched.
    Step {
        course_title: String,
        module: String,
        step: String,
        /// Leading part of the step body.
        snippet: String,
    },
}

/// Search every level, or only `level` when given.
///
/// # Errors
///
/// `InvalidInput` for a blank query. `ManifestNotFound` when `level` is
/// given but does not exist.
pub fn search(scanner: &Scanner, query: &str, level: Option<&str>) -> Result<Vec<SearchHit>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(TutorError::invalid_input("Please provide a search query"));
    }

    let layouts = match level {
        Some(level) => vec![scanner.layout(level)?],
        None => scanner
            .levels()
            .iter()
            .filter_map(|level| scanner.layout(level).ok())
            .collect(),
    };

    let mut hits = Vec::new();
    for layout in &layouts {
        search_course(layout, &needle, &mut hits);
    }
    debug!(query = %needle, courses = layouts.len(), hits = hits.len(), "searched course content");
    Ok(hits)
}

fn search_course(layout: &CourseLayout, needle: &str, hits: &mut Vec<SearchHit>) {
    if contains(&layout.title, needle) || contains(&layout.description, needle) {
        hits.push(SearchHit::Course {
            level: layout.level.clone(),
            title: layout.title.clone(),
            description: layout.description.clone(),
        });
    }

    for module in &layout.modules {
        if contains(&module.name, needle) {
            hits.push(SearchHit::Module {
                course_title: layout.title.clone(),
                module: module.name.clone(),
            });
        }

        for step in &module.steps {
            let body = match read_to_string_limited(&step.path) {
                Ok(body) => body,
                Err(e) => {
                    warn!(path = %step.path.display(), error = %e, "skipping unreadable step body");
                    String::new()
                }
            };
            if contains(&step.name, needle) || contains(&body, needle) {
                hits.push(SearchHit::Step {
                    course_title: layout.title.clone(),
                    module: module.name.clone(),
                    step: step.name.clone(),
                    snippet: snippet(&body),
                });
            }
        }
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// First [`SNIPPET_CHARS`] characters of `body`, with `...` when cut.
pub fn snippet(body: &str) -> String {
    match body.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::tests::write_level;
    use std::fs;
    use tempfile::TempDir;

    fn scanner(dir: &TempDir) -> Scanner {
        write_level(
            dir.path(),
            "beginner",
            &[("intro", &["welcome", "setup"]), ("basics", &["types"])],
        );
        write_level(dir.path(), "advanced", &[("traits", &["generics"])]);
        fs::write(
            dir.path().join("beginner").join("course_info.json"),
            r#"{"title": "Rust Basics", "description": "Ownership from scratch"}"#,
        )
        .unwrap();
        Scanner::new(dir.path())
    }

    #[test]
    fn test_matches_every_kind_in_order() {
        let dir = TempDir::new().unwrap();
        let scanner = scanner(&dir);
        fs::write(
            dir.path().join("beginner").join("02_basics").join("01_types.md"),
            "Integers and the intro to floats",
        )
        .unwrap();

        let hits = search(&scanner, "INTRO", None).unwrap();
        let kinds: Vec<String> = hits
            .iter()
            .map(|hit| match hit {
                SearchHit::Course { level, .. } => format!("course:{level}"),
                SearchHit::Module { module, .. } => format!("module:{module}"),
                SearchHit::Step { module, step, .. } => format!("step:{module}/{step}"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "module:intro",
                "step:intro/welcome",
                "step:intro/setup",
                "step:basics/types",
            ]
        );
    }

    #[test]
    fn test_course_title_and_description_match() {
        let dir = TempDir::new().unwrap();
        let hits = search(&scanner(&dir), "ownership", None).unwrap();
        assert_eq!(
            hits,
            vec![SearchHit::Course {
                level: "beginner".into(),
                title: "Rust Basics".into(),
                description: "Ownership from scratch".into(),
            }]
        );
    }

    #[test]
    fn test_level_filter() {
        let dir = TempDir::new().unwrap();
        let scanner = scanner(&dir);

        assert_eq!(search(&scanner, "generics", None).unwrap().len(), 1);
        assert!(search(&scanner, "generics", Some("beginner")).unwrap().is_empty());
        assert!(matches!(
            search(&scanner, "generics", Some("expert")),
            Err(TutorError::ManifestNotFound { .. })
        ));
    }

    #[test]
    fn test_blank_query_is_invalid() {
        let dir = TempDir::new().unwrap();
        let err = search(&scanner(&dir), "  ", None).unwrap_err();
        assert!(matches!(err, TutorError::InvalidInput { .. }));
    }

    #[test]
    fn test_snippet_is_char_bounded() {
        assert_eq!(snippet("short"), "short");

        let exact = "a".repeat(SNIPPET_CHARS);
        assert_eq!(snippet(&exact), exact);

        let long = "é".repeat(SNIPPET_CHARS + 5);
        let cut = snippet(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), SNIPPET_CHARS + 3);
    }

    #[test]
    fn test_unreadable_step_still_matches_by_name() {
        let dir = TempDir::new().unwrap();
        let scanner = scanner(&dir);
        fs::write(
            dir.path().join("beginner").join("01_intro").join("02_setup.md"),
            [0xff, 0xfe, b'x'],
        )
        .unwrap();

        let hits = search(&scanner, "setup", Some("beginner")).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(matches!(
            &hits[0],
            SearchHit::Step { step, snippet, .. } if step == "setup" && snippet.is_empty()
        ));
    }
}

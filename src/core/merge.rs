//! Merge engine.
//!
//! Reconciles persisted progress with a freshly scanned course. Modules and
//! steps are matched by name; the fresh scan decides order and membership,
//! the persisted state decides step status.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::core::state::{CourseState, ModuleState, Status, StepState};

/// Structural differences found while merging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Steps present in the fresh scan but not in persisted progress.
    pub inserted_steps: usize,
    /// Steps present in persisted progress but not in the fresh scan.
    pub pruned_steps: usize,
    /// Modules pruned entirely.
    pub pruned_modules: Vec<String>,
}

impl MergeReport {
    /// Whether the course structure changed since progress was saved.
    pub fn is_changed(&self) -> bool {
        self.inserted_steps > 0 || self.pruned_steps > 0 || !self.pruned_modules.is_empty()
    }
}

/// Merge persisted progress into a fresh scan.
///
/// Without persisted progress the fresh state is returned unchanged.
pub fn merge(persisted: Option<&CourseState>, fresh: &CourseState) -> CourseState {
    merge_with_report(persisted, fresh).0
}

/// Merge persisted progress into a fresh scan and report what changed.
pub fn merge_with_report(
    persisted: Option<&CourseState>,
    fresh: &CourseState,
) -> (CourseState, MergeReport) {
    let Some(persisted) = persisted else {
        debug!(level = %fresh.level, "no persisted progress, using fresh scan");
        return (fresh.clone(), MergeReport::default());
    };

    let mut report = MergeReport::default();
    let previous = index_by_name(&persisted.modules, |m| &m.name);

    let modules = fresh
        .modules
        .iter()
        .map(|module| match previous.get(module.name.as_str()) {
            Some(old) => merge_module(old, module, &mut report),
            None => {
                report.inserted_steps += module.steps.len();
                reset_module(module)
            }
        })
        .collect();

    let current: HashSet<&str> = fresh.modules.iter().map(|m| m.name.as_str()).collect();
    for (name, module) in &previous {
        if !current.contains(name) {
            report.pruned_steps += module.steps.len();
            report.pruned_modules.push(name.to_string());
        }
    }
    report.pruned_modules.sort();

    let merged = CourseState::new(fresh.level.clone(), modules);
    if report.is_changed() {
        info!(
            level = %merged.level,
            inserted = report.inserted_steps,
            pruned = report.pruned_steps,
            pruned_modules = ?report.pruned_modules,
            "course content changed since progress was saved"
        );
    }
    (merged, report)
}

fn merge_module(old: &ModuleState, fresh: &ModuleState, report: &mut MergeReport) -> ModuleState {
    let previous = index_by_name(&old.steps, |s| &s.name);

    let steps = fresh
        .steps
        .iter()
        .map(|step| match previous.get(step.name.as_str()) {
            Some(old_step) => StepState::with_status(step.name.clone(), old_step.status),
            None => {
                report.inserted_steps += 1;
                StepState::new(step.name.clone())
            }
        })
        .collect();

    report.pruned_steps += previous
        .keys()
        .filter(|name| fresh.step(name).is_none())
        .count();

    ModuleState::new(fresh.name.clone(), steps)
}

fn reset_module(module: &ModuleState) -> ModuleState {
    ModuleState::new(
        module.name.clone(),
        module
            .steps
            .iter()
            .map(|s| StepState::with_status(s.name.clone(), Status::NotStarted))
            .collect(),
    )
}

/// Index items by name, keeping the first occurrence of a duplicated name.
fn index_by_name<'a, T>(
    items: &'a [T],
    name: impl Fn(&'a T) -> &'a String,
) -> HashMap<&'a str, &'a T> {
    let mut index = HashMap::with_capacity(items.len());
    for item in items {
        index.entry(name(item).as_str()).or_insert(item);
    }
    index
}

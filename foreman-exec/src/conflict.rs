//! Conflict Detector: files recorded as modified by more than one task.
//!
//! `modified_files` are relative to each task's project, so paths are joined
//! onto the project directory before comparing. Two repositories that each
//! touch their own `Cargo.toml` do not conflict.
//!
//! Report only; resolving a conflict is left to the operator.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use foreman_core::{ScanReport, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    /// Project of the first task that recorded the file.
    pub project: String,
    /// As recorded, relative to `project`.
    pub file: PathBuf,
    /// In the order the tasks were seen.
    pub tasks: Vec<TaskId>,
}

/// Every file touched by two or more tasks, sorted by resolved path.
pub fn detect(report: &ScanReport) -> Vec<Conflict> {
    let mut touched: BTreeMap<PathBuf, Conflict> = BTreeMap::new();
    for scanned in report.tasks() {
        let dir = report.project_dir(scanned.project);
        for file in &scanned.task.modified_files {
            let conflict = touched.entry(dir.join(file)).or_insert_with(|| Conflict {
                project: report.project(scanned.project).name.0.clone(),
                file: file.clone(),
                tasks: vec![],
            });
            if !conflict.tasks.contains(&scanned.task.id) {
                conflict.tasks.push(scanned.task.id.clone());
            }
        }
    }

    touched
        .into_values()
        .filter(|c| c.tasks.len() > 1)
        .collect()
}

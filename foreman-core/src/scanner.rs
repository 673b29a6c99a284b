//! Task scanner: merges every project's backlog into one annotated set.
//!
//! Failure isolation:
//! - missing backlog file → project contributes no tasks (not an error)
//! - unparseable backlog → one recorded error, project skipped
//! - task missing a required field → task excluded, error recorded
//! - unknown task field → warning only
//! - `blocked_by` naming no scanned task → warning only (checked across all
//!   projects once every backlog is loaded)
//!
//! In strict mode the first error stops the scan; the returned
//! [`ScanError::Strict`] carries everything accumulated up to that point.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::ScanError;
use crate::types::{
    BacklogFile, Milestone, MilestoneRef, ProjectEntry, ProjectRef, Registry, ScannedTask, Task,
    TaskId, TaskStatus, KNOWN_TASK_FIELDS,
};

const REQUIRED_FIELDS: &[&str] = &["id", "title", "status"];

/// Options for [`scan`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub strict: bool,
}

/// One recorded scan problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanIssue {
    pub project: String,
    pub task_id: Option<String>,
    pub message: String,
}

impl fmt::Display for ScanIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.task_id {
            Some(id) => write!(f, "{} [{}]: {}", self.project, id, self.message),
            None => write!(f, "{}: {}", self.project, self.message),
        }
    }
}

/// Merged scan output. Project and milestone tables are owned here and only
/// lent out by shared reference; tasks point into them through handles.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    projects: Vec<ProjectEntry>,
    project_dirs: Vec<PathBuf>,
    backlog_paths: Vec<PathBuf>,
    project_milestones: Vec<Option<MilestoneRef>>,
    milestones: Vec<Milestone>,
    tasks: Vec<ScannedTask>,
    pub errors: Vec<ScanIssue>,
    pub warnings: Vec<ScanIssue>,
}

impl ScanReport {
    pub fn tasks(&self) -> &[ScannedTask] {
        &self.tasks
    }

    pub fn project(&self, handle: ProjectRef) -> &ProjectEntry {
        &self.projects[handle.0]
    }

    /// Absolute working directory of a project.
    pub fn project_dir(&self, handle: ProjectRef) -> &Path {
        &self.project_dirs[handle.0]
    }

    pub fn backlog_path(&self, handle: ProjectRef) -> &Path {
        &self.backlog_paths[handle.0]
    }

    pub fn milestone(&self, handle: MilestoneRef) -> &Milestone {
        &self.milestones[handle.0]
    }

    /// The milestone declared by a project's backlog file, if any.
    pub fn active_milestone(&self, handle: ProjectRef) -> Option<&Milestone> {
        self.project_milestones[handle.0].map(|m| self.milestone(m))
    }

    /// Every project in registry order, with its handle.
    pub fn projects(&self) -> impl Iterator<Item = (ProjectRef, &ProjectEntry)> {
        self.projects
            .iter()
            .enumerate()
            .map(|(i, p)| (ProjectRef(i), p))
    }

    pub fn project_ref(&self, name: &str) -> Option<ProjectRef> {
        self.projects
            .iter()
            .position(|p| p.name.0 == name)
            .map(ProjectRef)
    }

    pub fn find(&self, id: &TaskId) -> Option<&ScannedTask> {
        self.tasks.iter().find(|t| &t.task.id == id)
    }

    pub fn tasks_of(&self, handle: ProjectRef) -> impl Iterator<Item = &ScannedTask> {
        self.tasks.iter().filter(move |t| t.project == handle)
    }

    /// Append a project to the table. Also used to build reports in memory.
    pub fn add_project(&mut self, entry: ProjectEntry, dir: PathBuf, backlog: PathBuf) -> ProjectRef {
        let handle = ProjectRef(self.projects.len());
        self.projects.push(entry);
        self.project_dirs.push(dir);
        self.backlog_paths.push(backlog);
        self.project_milestones.push(None);
        handle
    }

    /// Declare the milestone every later task of `project` shares.
    pub fn set_milestone(&mut self, project: ProjectRef, milestone: Milestone) -> MilestoneRef {
        let handle = MilestoneRef(self.milestones.len());
        self.milestones.push(milestone);
        self.project_milestones[project.0] = Some(handle);
        handle
    }

    pub fn add_task(&mut self, project: ProjectRef, task: Task) {
        let milestone = self.project_milestones[project.0];
        self.tasks.push(ScannedTask {
            task,
            project,
            milestone,
        });
    }
}

/// Absolute backlog path for a project entry.
pub fn backlog_path(registry: &Registry, entry: &ProjectEntry, backlog_file: &Path) -> PathBuf {
    registry.resolve(entry).join(backlog_file)
}

/// Scan every registered project's backlog.
pub fn scan(
    registry: &Registry,
    backlog_file: &Path,
    options: ScanOptions,
) -> Result<ScanReport, ScanError> {
    let mut report = ScanReport::default();
    let mut seen_ids = HashSet::new();

    for entry in &registry.projects {
        let path = backlog_path(registry, entry, backlog_file);
        let handle = report.add_project(entry.clone(), registry.resolve(entry), path.clone());

        let errors_before = report.errors.len();
        scan_project(&mut report, handle, &path, &mut seen_ids);

        if options.strict && report.errors.len() > errors_before {
            return Err(ScanError::Strict {
                errors: report.errors,
                warnings: report.warnings,
            });
        }
    }
    warn_unknown_blockers(&mut report);

    tracing::info!(
        projects = report.projects.len(),
        tasks = report.tasks.len(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "scan complete"
    );
    Ok(report)
}

fn scan_project(
    report: &mut ScanReport,
    handle: ProjectRef,
    path: &Path,
    seen_ids: &mut HashSet<TaskId>,
) {
    let project = report.projects[handle.0].name.0.clone();

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(%project, path = %path.display(), "no backlog file");
            return;
        }
        Err(err) => {
            record_error(report, &project, None, format!("cannot read {}: {err}", path.display()));
            return;
        }
    };

    let backlog: BacklogFile = match serde_json::from_str(&contents) {
        Ok(backlog) => backlog,
        Err(err) => {
            record_error(report, &project, None, format!("failed to parse {}: {err}", path.display()));
            return;
        }
    };

    if let Some(declared) = backlog.project.as_deref() {
        if declared != project {
            record_warning(
                report,
                &project,
                None,
                format!("backlog declares project '{declared}'"),
            );
        }
    }

    if let Some(milestone) = backlog.milestone {
        report.set_milestone(handle, milestone);
    }

    for (index, raw) in backlog.tasks.into_iter().enumerate() {
        let Some(task) = validate_task(report, &project, index, raw) else {
            continue;
        };
        if !seen_ids.insert(task.id.clone()) {
            record_warning(
                report,
                &project,
                Some(task.id.0.clone()),
                "duplicate task id; record ignored".into(),
            );
            continue;
        }
        report.add_task(handle, task);
    }
}

/// Validate one raw record; `None` means excluded (error already recorded).
fn validate_task(report: &mut ScanReport, project: &str, index: usize, raw: Value) -> Option<Task> {
    let Value::Object(fields) = &raw else {
        record_error(report, project, None, format!("task #{index} is not an object"));
        return None;
    };

    let label = fields
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| format!("#{index}"));

    for field in REQUIRED_FIELDS {
        match fields.get(*field) {
            Some(Value::String(_)) => {}
            Some(_) => {
                record_error(report, project, Some(label), format!("field '{field}' must be a string"));
                return None;
            }
            None => {
                record_error(report, project, Some(label), format!("missing required field '{field}'"));
                return None;
            }
        }
    }

    if let Some(status) = fields.get("status").and_then(Value::as_str) {
        if serde_json::from_value::<TaskStatus>(Value::from(status)).is_err() {
            record_error(report, project, Some(label), format!("invalid status '{status}'"));
            return None;
        }
    }

    for key in fields.keys() {
        if !KNOWN_TASK_FIELDS.contains(&key.as_str()) {
            record_warning(report, project, Some(label.clone()), format!("unknown field '{key}'"));
        }
    }

    let task: Task = match serde_json::from_value(raw) {
        Ok(task) => task,
        Err(err) => {
            record_error(report, project, Some(label), format!("invalid record: {err}"));
            return None;
        }
    };

    if task.id.project() != Some(project) {
        record_warning(
            report,
            project,
            Some(task.id.0.clone()),
            format!("id is not scoped as '{project}/<slug>'"),
        );
    }
    Some(task)
}

/// Blockers may live in another project, so this runs after the last backlog.
fn warn_unknown_blockers(report: &mut ScanReport) {
    let projects = &report.projects;
    let known: HashSet<&TaskId> = report.tasks.iter().map(|t| &t.task.id).collect();
    let unknown: Vec<ScanIssue> = report
        .tasks
        .iter()
        .flat_map(|t| {
            t.task
                .blocked_by
                .iter()
                .filter(|b| !known.contains(b))
                .map(move |b| ScanIssue {
                    project: projects[t.project.0].name.0.clone(),
                    task_id: Some(t.task.id.0.clone()),
                    message: format!("blocked by unknown task '{b}'"),
                })
        })
        .collect();
    for issue in unknown {
        tracing::debug!(issue = %issue, "backlog warning");
        report.warnings.push(issue);
    }
}

fn record_error(report: &mut ScanReport, project: &str, task_id: Option<String>, message: String) {
    let issue = ScanIssue {
        project: project.to_string(),
        task_id,
        message,
    };
    tracing::warn!(issue = %issue, "backlog error");
    report.errors.push(issue);
}

fn record_warning(report: &mut ScanReport, project: &str, task_id: Option<String>, message: String) {
    let issue = ScanIssue {
        project: project.to_string(),
        task_id,
        message,
    };
    tracing::debug!(issue = %issue, "backlog warning");
    report.warnings.push(issue);
}

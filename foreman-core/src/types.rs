//! Domain types for the Foreman registry and task backlogs.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! All persisted types are serializable/deserializable via serde + serde_json.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name for a project entry in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectName(pub String);

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A task identifier of the form `project/slug`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    /// The `project` half of `project/slug`, if the id is scoped.
    pub fn project(&self) -> Option<&str> {
        self.0.split_once('/').map(|(project, _)| project)
    }

    /// The `slug` half of `project/slug`; the whole id when unscoped.
    pub fn slug(&self) -> &str {
        self.0.split_once('/').map(|(_, slug)| slug).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle tag of a registered project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Maturity {
    Buildable,
    NearBuildable,
    ScaffoldingPlus,
    Scaffolding,
    Blocked,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Maturity {
    /// Short marker used by the dashboard.
    pub fn icon(&self) -> &'static str {
        match self {
            Maturity::Buildable => "OK",
            Maturity::NearBuildable => "~OK",
            Maturity::ScaffoldingPlus => "S+",
            Maturity::Scaffolding => "S",
            Maturity::Blocked => "BLK",
            Maturity::Unknown => "?",
        }
    }
}

impl fmt::Display for Maturity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Maturity::Buildable => "buildable",
            Maturity::NearBuildable => "near-buildable",
            Maturity::ScaffoldingPlus => "scaffolding-plus",
            Maturity::Scaffolding => "scaffolding",
            Maturity::Blocked => "blocked",
            Maturity::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Blocked,
        TaskStatus::Failed,
    ];

    /// Completed and failed tasks are excluded from ranking by default.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Allowed: `pending→in_progress`, `in_progress→completed|failed`, any→`blocked`.
    pub fn can_transition_to(&self, to: TaskStatus) -> bool {
        matches!(
            (self, to),
            (TaskStatus::Pending, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Completed)
                | (TaskStatus::InProgress, TaskStatus::Failed)
        ) || (to == TaskStatus::Blocked && *self != TaskStatus::Blocked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.to_ascii_lowercase().replace('-', "_"))
            .ok_or_else(|| {
                format!(
                    "unknown status '{s}'; expected: pending, in_progress, completed, blocked, failed"
                )
            })
    }
}

/// Relative size of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Complexity {
    S,
    #[default]
    M,
    L,
    XL,
}

impl Complexity {
    /// Effort discount applied to impact by the scorer.
    pub fn multiplier(&self) -> f64 {
        match self {
            Complexity::S => 1.0,
            Complexity::M => 0.75,
            Complexity::L => 0.50,
            Complexity::XL => 0.30,
        }
    }
}

/// Named execution profile a worker runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Default,
    Local,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Default => "default",
            Tier::Local => "local",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(Tier::Default),
            "local" => Ok(Tier::Local),
            other => Err(format!("unknown tier '{other}'; expected: default, local")),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry structs
// ---------------------------------------------------------------------------

/// One managed repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: ProjectName,
    /// Relative to the registry's `projects_root` unless absolute.
    pub path: PathBuf,
    #[serde(default)]
    pub status: Maturity,
    #[serde(default)]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_command: Option<String>,
}

/// Root of `~/.foreman/projects.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    pub version: u32,
    pub projects_root: PathBuf,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

impl Registry {
    pub fn find(&self, name: &str) -> Option<&ProjectEntry> {
        self.projects.iter().find(|p| p.name.0 == name)
    }

    /// Absolute working directory of a project.
    pub fn resolve(&self, entry: &ProjectEntry) -> PathBuf {
        resolve_against(&self.projects_root, &entry.path)
    }
}

pub(crate) fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

// ---------------------------------------------------------------------------
// Backlog structs
// ---------------------------------------------------------------------------

/// Completion target shared by every task of one backlog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Feature framing attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefit: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<String>,
}

/// One append-only status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub from: TaskStatus,
    pub to: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// A validated task record with defaults applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default)]
    pub blocked_by: Vec<TaskId>,
    #[serde(default)]
    pub unlocks: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<Feature>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
    #[serde(default)]
    pub relevant_files: Vec<PathBuf>,
    #[serde(default)]
    pub modified_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_override: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_tier: Option<Tier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl Task {
    /// Minimal pending task, mostly for fixtures.
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: TaskStatus::Pending,
            complexity: Complexity::default(),
            blocked_by: vec![],
            unlocks: vec![],
            description: None,
            feature: None,
            labels: vec![],
            milestone: None,
            relevant_files: vec![],
            modified_files: vec![],
            created_at: None,
            priority_override: None,
            execution_tier: None,
            external_ref: None,
            history: vec![],
        }
    }

    pub fn acceptance_criteria(&self) -> &[String] {
        self.feature
            .as_ref()
            .map(|f| f.acceptance_criteria.as_slice())
            .unwrap_or(&[])
    }
}

/// Fields the task schema knows about; anything else only warns.
pub const KNOWN_TASK_FIELDS: &[&str] = &[
    "id",
    "title",
    "status",
    "complexity",
    "blocked_by",
    "unlocks",
    "description",
    "feature",
    "labels",
    "milestone",
    "relevant_files",
    "modified_files",
    "created_at",
    "priority_override",
    "execution_tier",
    "external_ref",
    "history",
];

/// On-disk shape of one project's backlog. Tasks stay raw until validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacklogFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<Milestone>,
    #[serde(default)]
    pub tasks: Vec<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Back-reference handles
// ---------------------------------------------------------------------------

/// Read-only handle to a project in a scan report's project table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectRef(pub(crate) usize);

/// Read-only handle to a milestone in a scan report's milestone table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MilestoneRef(pub(crate) usize);

/// A task tagged with its owning project and milestone.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedTask {
    pub task: Task,
    pub project: ProjectRef,
    pub milestone: Option<MilestoneRef>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_halves() {
        let id = TaskId::from("jade-core/parser-rewrite");
        assert_eq!(id.project(), Some("jade-core"));
        assert_eq!(id.slug(), "parser-rewrite");

        let bare = TaskId::from("orphan");
        assert_eq!(bare.project(), None);
        assert_eq!(bare.slug(), "orphan");
    }

    #[test]
    fn transitions_follow_lifecycle() {
        use TaskStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Failed));
        assert!(Completed.can_transition_to(Blocked));
        assert!(!Blocked.can_transition_to(Blocked));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Failed.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(Pending));
    }

    #[test]
    fn maturity_parses_kebab_case_and_unknown() {
        let m: Maturity = serde_json::from_str("\"near-buildable\"").expect("parse");
        assert_eq!(m, Maturity::NearBuildable);
        let m: Maturity = serde_json::from_str("\"prototype\"").expect("parse");
        assert_eq!(m, Maturity::Unknown);
    }

    #[test]
    fn task_defaults_applied() {
        let task: Task =
            serde_json::from_str(r#"{"id":"a/b","title":"T","status":"pending"}"#).expect("task");
        assert_eq!(task.complexity, Complexity::M);
        assert!(task.blocked_by.is_empty());
        assert!(task.unlocks.is_empty());
        assert!(task.history.is_empty());
    }

    #[test]
    fn status_from_str_accepts_dashes() {
        assert_eq!("in-progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn complexity_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Complexity::XL).unwrap(), "\"XL\"");
        assert_eq!(Complexity::L.multiplier(), 0.5);
    }
}

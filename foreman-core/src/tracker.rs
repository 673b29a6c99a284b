//! Status tracker: the only writer of a task's `status` and `history`.
//!
//! ## Update protocol
//!
//! 1. Read the whole backlog file and SHA-256 the bytes (version stamp).
//! 2. Parse as a generic JSON value so unknown fields survive the rewrite.
//! 3. Locate the task by id and validate the transition.
//! 4. Set `status`, append a `history` entry.
//! 5. Write to `<path>.foreman.tmp`.
//! 6. Re-hash the file on disk; a different digest means another writer got in
//!    between, so the tmp file is dropped and [`TrackerError::StaleWrite`] returned.
//! 7. Rename tmp over the backlog (atomic on POSIX).
//!
//! Within one process, writes are serialized by a mutex held across 1–7.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{tracker_io, TrackerError};
use crate::scanner::backlog_path;
use crate::types::{HistoryEntry, Registry, TaskId, TaskStatus};

/// A recorded status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub task_id: TaskId,
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub at: DateTime<Utc>,
    pub summary: Option<String>,
}

/// Resolves task ids to backlog files and applies transitions.
#[derive(Debug)]
pub struct StatusTracker {
    registry: Registry,
    backlog_file: PathBuf,
    write_lock: Mutex<()>,
}

impl StatusTracker {
    pub fn new(registry: Registry, backlog_file: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            backlog_file: backlog_file.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Backlog file owning `task_id`, from the `project/` prefix.
    pub fn backlog_for(&self, task_id: &TaskId) -> Result<PathBuf, TrackerError> {
        let entry = task_id
            .project()
            .and_then(|name| self.registry.find(name))
            .ok_or_else(|| TrackerError::UnknownProject(task_id.clone()))?;
        Ok(backlog_path(&self.registry, entry, &self.backlog_file))
    }

    /// Move `task_id` to `to`, appending a history entry.
    pub fn set_status(
        &self,
        task_id: &TaskId,
        to: TaskStatus,
        summary: Option<String>,
    ) -> Result<Transition, TrackerError> {
        let path = self.backlog_for(task_id)?;
        self.set_status_in(&path, task_id, to, summary)
    }

    /// Like [`set_status`](Self::set_status), for a task the scanner already
    /// located in `backlog`. The id prefix is not consulted, so unscoped ids
    /// still resolve.
    pub fn set_status_in(
        &self,
        backlog: &Path,
        task_id: &TaskId,
        to: TaskStatus,
        summary: Option<String>,
    ) -> Result<Transition, TrackerError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        update_status_at(backlog, task_id, to, summary)
    }
}

/// Apply one transition to the backlog file at `path`.
pub fn update_status_at(
    path: &Path,
    task_id: &TaskId,
    to: TaskStatus,
    summary: Option<String>,
) -> Result<Transition, TrackerError> {
    update_with_hook(path, task_id, to, summary, || {})
}

fn update_with_hook(
    path: &Path,
    task_id: &TaskId,
    to: TaskStatus,
    summary: Option<String>,
    before_commit: impl FnOnce(),
) -> Result<Transition, TrackerError> {
    // Step 1: read + stamp.
    let bytes = std::fs::read(path).map_err(|e| tracker_io(path, e))?;
    let stamp = digest(&bytes);

    // Step 2: parse losslessly.
    let mut doc: Value = serde_json::from_slice(&bytes).map_err(|e| TrackerError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    // Step 3: locate + validate.
    let task = find_task_mut(&mut doc, path, task_id)?;
    let from = current_status(task, path)?;
    if !from.can_transition_to(to) {
        return Err(TrackerError::IllegalTransition {
            task_id: task_id.clone(),
            from,
            to,
        });
    }

    // Step 4: mutate.
    let at = Utc::now();
    let entry = HistoryEntry {
        timestamp: at,
        from,
        to,
        summary: summary.clone(),
    };
    let entry = serde_json::to_value(&entry).map_err(|e| TrackerError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    let Value::Object(fields) = task else {
        return Err(TrackerError::Malformed {
            path: path.to_path_buf(),
        });
    };
    fields.insert("status".into(), Value::from(to.as_str()));
    match fields.get_mut("history") {
        Some(Value::Array(history)) => history.push(entry),
        _ => {
            fields.insert("history".into(), Value::Array(vec![entry]));
        }
    }

    // Step 5: tmp write.
    let mut rendered = serde_json::to_string_pretty(&doc).map_err(|e| TrackerError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    rendered.push('\n');
    let tmp = PathBuf::from(format!("{}.foreman.tmp", path.display()));
    std::fs::write(&tmp, rendered).map_err(|e| tracker_io(&tmp, e))?;

    before_commit();

    // Step 6: version check.
    let on_disk = std::fs::read(path).map_err(|e| tracker_io(path, e))?;
    if digest(&on_disk) != stamp {
        let _ = std::fs::remove_file(&tmp);
        tracing::warn!(path = %path.display(), %task_id, "backlog changed underneath; update rejected");
        return Err(TrackerError::StaleWrite {
            path: path.to_path_buf(),
        });
    }

    // Step 7: commit.
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(tracker_io(path, e));
    }

    tracing::info!(%task_id, %from, %to, "status updated");
    Ok(Transition {
        task_id: task_id.clone(),
        from,
        to,
        at,
        summary,
    })
}

fn find_task_mut<'a>(
    doc: &'a mut Value,
    path: &Path,
    task_id: &TaskId,
) -> Result<&'a mut Value, TrackerError> {
    let tasks = doc
        .get_mut("tasks")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| TrackerError::Malformed {
            path: path.to_path_buf(),
        })?;
    tasks
        .iter_mut()
        .find(|t| t.get("id").and_then(Value::as_str) == Some(task_id.as_str()))
        .ok_or_else(|| TrackerError::TaskNotFound {
            task_id: task_id.clone(),
            path: path.to_path_buf(),
        })
}

fn current_status(task: &Value, path: &Path) -> Result<TaskStatus, TrackerError> {
    let raw = task.get("status").cloned().unwrap_or(Value::Null);
    serde_json::from_value(raw).map_err(|e| TrackerError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

fn digest(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_backlog(dir: &Path) -> PathBuf {
        let path = dir.join("tasks.json");
        let body = json!({
            "project": "a",
            "milestone": {"name": "v1"},
            "tasks": [
                {"id": "a/one", "title": "One", "status": "pending", "estimate_hours": 2},
                {"id": "a/two", "title": "Two", "status": "in_progress"}
            ]
        });
        std::fs::write(&path, serde_json::to_string_pretty(&body).unwrap()).unwrap();
        path
    }

    fn read(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn transition_appends_history_and_keeps_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let path = write_backlog(dir.path());

        let t = update_status_at(&path, &TaskId::from("a/one"), TaskStatus::InProgress, None)
            .expect("update");
        assert_eq!(t.from, TaskStatus::Pending);

        let doc = read(&path);
        let task = &doc["tasks"][0];
        assert_eq!(task["status"], "in_progress");
        assert_eq!(task["estimate_hours"], 2);
        assert_eq!(task["history"][0]["from"], "pending");
        assert_eq!(task["history"][0]["to"], "in_progress");
        assert_eq!(doc["milestone"]["name"], "v1");
    }

    #[test]
    fn illegal_transition_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = write_backlog(dir.path());
        let before = std::fs::read(&path).unwrap();

        let err = update_status_at(&path, &TaskId::from("a/one"), TaskStatus::Completed, None)
            .unwrap_err();
        assert!(matches!(err, TrackerError::IllegalTransition { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn unknown_task_reported() {
        let dir = TempDir::new().unwrap();
        let path = write_backlog(dir.path());
        let err = update_status_at(&path, &TaskId::from("a/nope"), TaskStatus::Blocked, None)
            .unwrap_err();
        assert!(matches!(err, TrackerError::TaskNotFound { .. }));
    }

    #[test]
    fn concurrent_writer_triggers_stale_write() {
        let dir = TempDir::new().unwrap();
        let path = write_backlog(dir.path());
        let intruder = path.clone();

        let err = update_with_hook(
            &path,
            &TaskId::from("a/two"),
            TaskStatus::Completed,
            Some("done".into()),
            move || {
                let mut doc = read(&intruder);
                doc["tasks"][0]["status"] = json!("blocked");
                std::fs::write(&intruder, doc.to_string()).unwrap();
            },
        )
        .unwrap_err();
        assert!(matches!(err, TrackerError::StaleWrite { .. }));

        let doc = read(&path);
        assert_eq!(doc["tasks"][0]["status"], "blocked", "intruder's write survives");
        assert_eq!(doc["tasks"][1]["status"], "in_progress");
        let tmp = PathBuf::from(format!("{}.foreman.tmp", path.display()));
        assert!(!tmp.exists());
    }

    #[test]
    fn summary_recorded_on_completion() {
        let dir = TempDir::new().unwrap();
        let path = write_backlog(dir.path());
        update_status_at(
            &path,
            &TaskId::from("a/two"),
            TaskStatus::Failed,
            Some("exit status 2".into()),
        )
        .expect("update");
        let doc = read(&path);
        assert_eq!(doc["tasks"][1]["history"][0]["summary"], "exit status 2");
    }
}

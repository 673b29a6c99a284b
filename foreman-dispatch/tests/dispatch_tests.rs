//! Budget packing and dispatch side effects against real project directories.

use std::fs;
use std::path::{Path, PathBuf};

use foreman_core::config::DispatchConfig;
use foreman_core::types::{Maturity, ProjectEntry, ProjectName, Registry};
use foreman_core::{scan, ScanOptions, StatusTracker, TaskId, TaskStatus};
use foreman_dispatch::{pack_files, Budget, DispatchError, Dispatcher, PreambleRenderer};
use rstest::rstest;
use serde_json::json;
use tempfile::TempDir;

const BACKLOG: &str = ".claude/tasks/tasks.json";

/// `tokens` estimated tokens of 80-char lines, once wrapped in a file section.
fn write_sized(dir: &Path, name: &str, tokens: usize) -> PathBuf {
    let lines = (tokens * 4) / 80;
    let body: String = (0..lines).map(|i| format!("{:<79}\n", format!("// line {i}"))).collect();
    fs::write(dir.join(name), body).unwrap();
    PathBuf::from(name)
}

fn setup(tasks: serde_json::Value) -> (TempDir, Registry) {
    let root = TempDir::new().unwrap();
    let backlog = root.path().join("jade").join(BACKLOG);
    fs::create_dir_all(backlog.parent().unwrap()).unwrap();
    fs::write(
        &backlog,
        json!({"project": "jade", "milestone": {"name": "v1"}, "tasks": tasks}).to_string(),
    )
    .unwrap();
    let registry = Registry {
        version: 1,
        projects_root: root.path().to_path_buf(),
        projects: vec![ProjectEntry {
            name: ProjectName::from("jade"),
            path: PathBuf::from("jade"),
            status: Maturity::Buildable,
            language: "rust".into(),
            test_command: Some("cargo test".into()),
        }],
    };
    (root, registry)
}

#[test]
fn budget_example_whole_truncated_skipped() {
    let dir = TempDir::new().unwrap();
    let files = vec![
        write_sized(dir.path(), "one.rs", 1_000),
        write_sized(dir.path(), "two.rs", 40_000),
        write_sized(dir.path(), "three.rs", 5_000),
    ];
    let budget = Budget::from(&DispatchConfig::default());
    let file_budget = budget.file_budget(3_000);
    assert_eq!(file_budget, 30_000);

    let packed = pack_files(dir.path(), &files, file_budget, &budget);

    assert_eq!(packed.included, vec![PathBuf::from("one.rs")]);
    assert_eq!(packed.truncated, vec![PathBuf::from("two.rs")]);
    assert_eq!(packed.skipped, vec![PathBuf::from("three.rs")]);
    assert!(packed.tokens <= file_budget);
}

#[test]
fn preview_does_not_change_status() {
    let (root, registry) = setup(json!([
        {"id": "jade/auth", "title": "Auth", "status": "pending", "relevant_files": ["src/lib.rs", "missing.rs"]}
    ]));
    let src = root.path().join("jade/src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("lib.rs"), "pub fn login() {}\n").unwrap();
    let backlog = root.path().join("jade").join(BACKLOG);
    let before = fs::read(&backlog).unwrap();

    let report = scan(&registry, Path::new(BACKLOG), ScanOptions::default()).unwrap();
    let dispatcher = Dispatcher::new(PreambleRenderer::new().unwrap(), DispatchConfig::default());
    let descriptor = dispatcher.preview(&report, &TaskId::from("jade/auth")).unwrap();

    assert!(descriptor.prompt.contains("pub fn login()"));
    assert_eq!(descriptor.metadata.files_included, vec![PathBuf::from("src/lib.rs")]);
    assert_eq!(descriptor.metadata.files_skipped, vec![PathBuf::from("missing.rs")]);
    assert_eq!(descriptor.working_dir, root.path().join("jade"));
    assert_eq!(fs::read(&backlog).unwrap(), before);
}

#[test]
fn dispatch_moves_task_to_in_progress() {
    let (_root, registry) = setup(json!([
        {"id": "jade/auth", "title": "Auth", "status": "pending"}
    ]));
    let report = scan(&registry, Path::new(BACKLOG), ScanOptions::default()).unwrap();
    let tracker = StatusTracker::new(registry.clone(), BACKLOG);
    let dispatcher = Dispatcher::new(PreambleRenderer::new().unwrap(), DispatchConfig::default());

    let descriptor = dispatcher
        .dispatch(&report, &tracker, &TaskId::from("jade/auth"))
        .unwrap();
    assert_eq!(descriptor.prior_status, TaskStatus::Pending);

    let rescanned = scan(&registry, Path::new(BACKLOG), ScanOptions::default()).unwrap();
    let task = rescanned.find(&TaskId::from("jade/auth")).unwrap();
    assert_eq!(task.task.status, TaskStatus::InProgress);
    assert_eq!(task.task.history.len(), 1);
}

#[rstest]
#[case("in_progress", TaskStatus::InProgress)]
#[case("completed", TaskStatus::Completed)]
#[case("blocked", TaskStatus::Blocked)]
#[case("failed", TaskStatus::Failed)]
fn only_pending_tasks_are_dispatchable(#[case] raw: &str, #[case] expected: TaskStatus) {
    let (_root, registry) = setup(json!([
        {"id": "jade/old", "title": "Old", "status": raw}
    ]));
    let report = scan(&registry, Path::new(BACKLOG), ScanOptions::default()).unwrap();
    let dispatcher = Dispatcher::new(PreambleRenderer::new().unwrap(), DispatchConfig::default());

    let err = dispatcher.preview(&report, &TaskId::from("jade/old")).unwrap_err();
    assert!(matches!(err, DispatchError::NotDispatchable { status, .. } if status == expected));
}

#[test]
fn unknown_task_is_not_dispatchable() {
    let (_root, registry) = setup(json!([]));
    let report = scan(&registry, Path::new(BACKLOG), ScanOptions::default()).unwrap();
    let dispatcher = Dispatcher::new(PreambleRenderer::new().unwrap(), DispatchConfig::default());

    let err = dispatcher.preview(&report, &TaskId::from("jade/ghost")).unwrap_err();
    assert!(matches!(err, DispatchError::UnknownTask(_)));
}

#[rstest]
#[case::unscoped("legacy-1")]
#[case::foreign_prefix("onyx/stray")]
fn dispatch_writes_to_the_backlog_the_task_came_from(#[case] id: &str) {
    let (root, mut registry) = setup(json!([
        {"id": id, "title": "Imported", "status": "pending"}
    ]));
    // A second registered project whose name matches the foreign prefix.
    let onyx_backlog = root.path().join("onyx").join(BACKLOG);
    fs::create_dir_all(onyx_backlog.parent().unwrap()).unwrap();
    fs::write(&onyx_backlog, json!({"project": "onyx", "tasks": []}).to_string()).unwrap();
    registry.projects.push(ProjectEntry {
        name: ProjectName::from("onyx"),
        path: PathBuf::from("onyx"),
        status: Maturity::Buildable,
        language: "rust".into(),
        test_command: None,
    });
    let onyx_before = fs::read(&onyx_backlog).unwrap();

    let report = scan(&registry, Path::new(BACKLOG), ScanOptions::default()).unwrap();
    let tracker = StatusTracker::new(registry.clone(), BACKLOG);
    let dispatcher = Dispatcher::new(PreambleRenderer::new().unwrap(), DispatchConfig::default());

    let descriptor = dispatcher.dispatch(&report, &tracker, &TaskId::from(id)).unwrap();
    assert_eq!(descriptor.backlog_path, root.path().join("jade").join(BACKLOG));

    let rescanned = scan(&registry, Path::new(BACKLOG), ScanOptions::default()).unwrap();
    assert_eq!(rescanned.find(&TaskId::from(id)).unwrap().task.status, TaskStatus::InProgress);
    assert_eq!(fs::read(&onyx_backlog).unwrap(), onyx_before);
}

#[test]
fn tiny_budget_still_dispatches() {
    let (_root, registry) = setup(json!([
        {"id": "jade/auth", "title": "Auth", "status": "pending"}
    ]));
    let report = scan(&registry, Path::new(BACKLOG), ScanOptions::default()).unwrap();
    let config = DispatchConfig {
        budget_tokens: 10,
        ..DispatchConfig::default()
    };
    let dispatcher = Dispatcher::new(PreambleRenderer::new().unwrap(), config);

    let descriptor = dispatcher.preview(&report, &TaskId::from("jade/auth")).unwrap();
    assert!(descriptor.over_budget());
}

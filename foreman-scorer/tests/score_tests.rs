//! Ranking behaviour over in-memory scan reports.

use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use foreman_core::{
    Complexity, Maturity, ProjectEntry, ProjectName, ProjectRef, ScanReport, Task, TaskStatus,
};
use foreman_scorer::{rank, readiness_score, score, ScoreOptions};
use rstest::rstest;

fn project(report: &mut ScanReport, name: &str, status: Maturity) -> ProjectRef {
    report.add_project(
        ProjectEntry {
            name: ProjectName::from(name),
            path: PathBuf::from(name),
            status,
            language: "rust".into(),
            test_command: None,
        },
        PathBuf::from("/code").join(name),
        PathBuf::from("/code").join(name).join("tasks.json"),
    )
}

fn with_status(id: &str, status: TaskStatus) -> Task {
    let mut task = Task::new(id, id);
    task.status = status;
    task
}

fn options() -> ScoreOptions {
    ScoreOptions::at(Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap())
}

#[rstest]
#[case::no_blockers(&[], 100.0)]
#[case::all_completed(&[TaskStatus::Completed, TaskStatus::Completed], 100.0)]
#[case::one_running(&[TaskStatus::Completed, TaskStatus::InProgress], 50.0)]
#[case::all_running(&[TaskStatus::InProgress, TaskStatus::InProgress], 50.0)]
#[case::one_pending(&[TaskStatus::InProgress, TaskStatus::Pending], 0.0)]
#[case::one_failed(&[TaskStatus::Failed], 0.0)]
#[case::one_blocked(&[TaskStatus::Blocked], 0.0)]
fn readiness_follows_blocker_states(#[case] blockers: &[TaskStatus], #[case] expected: f64) {
    let mut report = ScanReport::default();
    let p = project(&mut report, "p", Maturity::Buildable);
    let mut target = Task::new("p/target", "Target");
    for (i, status) in blockers.iter().enumerate() {
        let id = format!("p/dep{i}");
        report.add_task(p, with_status(&id, *status));
        target.blocked_by.push(id.into());
    }

    assert_eq!(readiness_score(&report, &target), expected);
}

#[test]
fn unknown_blocker_means_not_ready() {
    let report = ScanReport::default();
    let mut target = Task::new("p/target", "Target");
    target.blocked_by.push("elsewhere/ghost".into());
    assert_eq!(readiness_score(&report, &target), 0.0);
}

#[test]
fn override_wins_over_every_factor() {
    let mut report = ScanReport::default();
    let p = project(&mut report, "p", Maturity::Blocked);
    let mut task = Task::new("p/pinned", "Pinned");
    task.priority_override = Some(99.5);
    task.blocked_by.push("p/ghost".into());
    report.add_task(p, task);

    let (value, breakdown) = score(&report, &report.tasks()[0], &options());
    assert_eq!(value, 99.5);
    assert!(breakdown.is_none());

    let ranked = rank(&report, &options());
    assert_eq!(ranked[0].score, 99.5);
}

#[test]
fn scoring_is_pure() {
    let mut report = ScanReport::default();
    let p = project(&mut report, "p", Maturity::NearBuildable);
    for i in 0..4 {
        let mut task = Task::new(format!("p/t{i}"), "T");
        task.labels = vec!["bugfix".into()];
        task.complexity = Complexity::L;
        task.created_at = Some(Utc.with_ymd_and_hms(2026, 10, 1, i, 0, 0).unwrap());
        report.add_task(p, task);
    }

    let first: Vec<_> = rank(&report, &options())
        .into_iter()
        .map(|r| (r.task.task.id.clone(), r.score))
        .collect();
    let second: Vec<_> = rank(&report, &options())
        .into_iter()
        .map(|r| (r.task.task.id.clone(), r.score))
        .collect();
    assert_eq!(first, second);
}

#[test]
fn mature_projects_rank_first_across_the_ecosystem() {
    let mut report = ScanReport::default();
    let young = project(&mut report, "young", Maturity::Scaffolding);
    let ready = project(&mut report, "ready", Maturity::Buildable);
    report.add_task(young, Task::new("young/a", "A"));
    report.add_task(ready, Task::new("ready/a", "A"));

    let ranked = rank(&report, &options());
    assert_eq!(ranked[0].task.task.id.as_str(), "ready/a");
    assert!(ranked[0].score > ranked[1].score);
}

#[test]
fn breakdown_reflects_effort_multiplier() {
    let mut report = ScanReport::default();
    let p = project(&mut report, "p", Maturity::Buildable);
    for (id, complexity) in [("p/small", Complexity::S), ("p/huge", Complexity::XL)] {
        let mut task = Task::new(id, id);
        task.labels = vec!["test".into()];
        task.complexity = complexity;
        report.add_task(p, task);
    }

    let ranked = rank(&report, &options());
    let small = ranked[0].breakdown.expect("computed");
    let huge = ranked[1].breakdown.expect("computed");
    assert_eq!(ranked[0].task.task.id.as_str(), "p/small");
    assert_eq!(small.impact, 10.0);
    assert_eq!(small.effort_value, 10.0);
    assert_eq!(huge.effort_value, 3.0);
}

//! Priority scoring for `foreman-scorer`.
//!
//! `rank(report, options)` scores every eligible task 0–100 from five weighted
//! factors and returns them sorted descending. Scoring is pure: the clock is
//! part of [`ScoreOptions`], so identical inputs always give identical scores.
//!
//! | Factor                  | Weight |
//! |-------------------------|--------|
//! | maturity                | 0.20   |
//! | impact                  | 0.30   |
//! | dependency readiness    | 0.20   |
//! | effort-adjusted value   | 0.15   |
//! | preference              | 0.15   |
//!
//! A `priority_override` on the task replaces the whole computation.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use foreman_core::{Maturity, ScanReport, ScannedTask, Task, TaskStatus};

pub const WEIGHT_MATURITY: f64 = 0.20;
pub const WEIGHT_IMPACT: f64 = 0.30;
pub const WEIGHT_READINESS: f64 = 0.20;
pub const WEIGHT_EFFORT: f64 = 0.15;
pub const WEIGHT_PREFERENCE: f64 = 0.15;

/// Dependents beyond this many earn no further impact.
const MAX_COUNTED_UNLOCKS: usize = 3;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Inputs that are not part of the scanned data.
#[derive(Debug, Clone)]
pub struct ScoreOptions {
    /// Keep completed and failed tasks in the output.
    pub include_terminal: bool,
    /// Label the operator wants to favour right now.
    pub focus_label: Option<String>,
    /// Reference time for the "recently created" bonus.
    pub now: DateTime<Utc>,
}

impl ScoreOptions {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            include_terminal: false,
            focus_label: None,
            now,
        }
    }
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

/// Per-factor scores, each 0–100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Breakdown {
    pub maturity: f64,
    pub impact: f64,
    pub readiness: f64,
    pub effort_value: f64,
    pub preference: f64,
}

impl Breakdown {
    pub fn weighted_total(&self) -> f64 {
        round2(
            self.maturity * WEIGHT_MATURITY
                + self.impact * WEIGHT_IMPACT
                + self.readiness * WEIGHT_READINESS
                + self.effort_value * WEIGHT_EFFORT
                + self.preference * WEIGHT_PREFERENCE,
        )
    }
}

/// A task with its score. `breakdown` is `None` when an override was used.
#[derive(Debug, Clone)]
pub struct Ranked<'a> {
    pub task: &'a ScannedTask,
    pub score: f64,
    pub breakdown: Option<Breakdown>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Score every eligible task in `report` and sort descending. Ties keep scan order.
pub fn rank<'a>(report: &'a ScanReport, options: &ScoreOptions) -> Vec<Ranked<'a>> {
    let mut ranked: Vec<Ranked<'a>> = report
        .tasks()
        .iter()
        .filter(|t| options.include_terminal || !t.task.status.is_terminal())
        .map(|t| {
            let (score, breakdown) = score(report, t, options);
            Ranked {
                task: t,
                score,
                breakdown,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Score one task. Returns the literal override when the task carries one.
pub fn score(
    report: &ScanReport,
    scanned: &ScannedTask,
    options: &ScoreOptions,
) -> (f64, Option<Breakdown>) {
    if let Some(literal) = scanned.task.priority_override {
        return (literal, None);
    }
    let breakdown = breakdown(report, scanned, options);
    (breakdown.weighted_total(), Some(breakdown))
}

/// All five factors for one task.
pub fn breakdown(report: &ScanReport, scanned: &ScannedTask, options: &ScoreOptions) -> Breakdown {
    let impact = impact_score(report, scanned);
    Breakdown {
        maturity: maturity_score(report.project(scanned.project).status),
        impact,
        readiness: readiness_score(report, &scanned.task),
        effort_value: effort_value(impact, &scanned.task),
        preference: preference_score(&scanned.task, options),
    }
}

// ---------------------------------------------------------------------------
// Factors
// ---------------------------------------------------------------------------

pub fn maturity_score(maturity: Maturity) -> f64 {
    match maturity {
        Maturity::Buildable => 100.0,
        Maturity::NearBuildable => 80.0,
        Maturity::ScaffoldingPlus => 60.0,
        Maturity::Scaffolding => 40.0,
        Maturity::Blocked => 10.0,
        Maturity::Unknown => 0.0,
    }
}

/// Value delivered by finishing the task, capped at 100.
pub fn impact_score(report: &ScanReport, scanned: &ScannedTask) -> f64 {
    let task = &scanned.task;
    let mut impact = 0.0;

    if !task.acceptance_criteria().is_empty() {
        impact += 20.0;
    }
    if task
        .feature
        .as_ref()
        .and_then(|f| f.description.as_deref())
        .is_some_and(|d| !d.trim().is_empty())
    {
        impact += 10.0;
    }
    if task.external_ref.is_some() {
        impact += 10.0;
    }
    impact += 15.0 * task.unlocks.len().min(MAX_COUNTED_UNLOCKS) as f64;

    if let Some(active) = report.active_milestone(scanned.project) {
        if task.milestone.as_deref() == Some(active.name.as_str()) {
            impact += 15.0;
            if is_last_open_in_milestone(report, scanned, &active.name) {
                impact += 25.0;
            }
        }
    }

    impact += task.labels.iter().map(|l| label_bonus(l)).sum::<f64>();
    impact.min(100.0)
}

/// 100 when nothing blocks, 50 when every open blocker is already running, else 0.
pub fn readiness_score(report: &ScanReport, task: &Task) -> f64 {
    let mut readiness = 100.0;
    for blocker in &task.blocked_by {
        match report.find(blocker).map(|t| t.task.status) {
            Some(TaskStatus::Completed) => {}
            Some(TaskStatus::InProgress) => readiness = 50.0,
            // pending, blocked, failed or an id no backlog knows
            _ => return 0.0,
        }
    }
    readiness
}

pub fn effort_value(impact: f64, task: &Task) -> f64 {
    impact * task.complexity.multiplier()
}

pub fn preference_score(task: &Task, options: &ScoreOptions) -> f64 {
    let mut preference = 50.0;
    if task
        .created_at
        .is_some_and(|created| created <= options.now && options.now - created <= Duration::hours(24))
    {
        preference += 20.0;
    }
    if let Some(focus) = options.focus_label.as_deref() {
        if task.labels.iter().any(|l| l.eq_ignore_ascii_case(focus)) {
            preference += 30.0;
        }
    }
    preference
}

// ---------------------------------------------------------------------------
// Utilities
// ---------------------------------------------------------------------------

fn label_bonus(label: &str) -> f64 {
    match label.to_ascii_lowercase().as_str() {
        "bugfix" | "test" => 10.0,
        "feature" | "infra" => 5.0,
        _ => 0.0,
    }
}

fn is_last_open_in_milestone(report: &ScanReport, scanned: &ScannedTask, milestone: &str) -> bool {
    if scanned.task.status == TaskStatus::Completed {
        return false;
    }
    report
        .tasks_of(scanned.project)
        .filter(|t| t.task.id != scanned.task.id)
        .filter(|t| t.task.milestone.as_deref() == Some(milestone))
        .all(|t| t.task.status == TaskStatus::Completed)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

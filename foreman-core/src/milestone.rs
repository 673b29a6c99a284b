//! Milestone aggregation: completion percentages per project and overall.

use std::fmt::Write as _;

use serde::Serialize;

use crate::scanner::ScanReport;
use crate::types::TaskStatus;

/// Width of the progress bar, in cells.
pub const BAR_WIDTH: usize = 20;

/// Completion counts for one project (or the whole ecosystem).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub project: String,
    pub milestone: Option<String>,
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    /// Everything not completed or in progress: pending, blocked and failed.
    pub pending: usize,
    pub blocked: usize,
    pub failed: usize,
    pub percent: u8,
}

impl Progress {
    fn empty(project: impl Into<String>, milestone: Option<String>) -> Self {
        Self {
            project: project.into(),
            milestone,
            total: 0,
            completed: 0,
            in_progress: 0,
            pending: 0,
            blocked: 0,
            failed: 0,
            percent: 0,
        }
    }

    fn count(&mut self, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Blocked => {
                self.blocked += 1;
                self.pending += 1;
            }
            TaskStatus::Failed => {
                self.failed += 1;
                self.pending += 1;
            }
            TaskStatus::Pending => self.pending += 1,
        }
    }

    fn finish(mut self) -> Self {
        self.percent = percent(self.completed, self.total);
        self
    }
}

/// Rounded `completed / total` as a percentage; 0 when there are no tasks.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed * 100 + total / 2) / total) as u8
}

/// Per-project progress, optionally restricted to one project.
pub fn aggregate(report: &ScanReport, only: Option<&str>) -> Vec<Progress> {
    report
        .projects()
        .filter(|(_, entry)| only.map_or(true, |name| entry.name.0 == name))
        .map(|(handle, entry)| {
            let milestone = report.active_milestone(handle).map(|m| m.name.clone());
            let mut progress = Progress::empty(entry.name.0.clone(), milestone);
            for scanned in report.tasks_of(handle) {
                progress.count(scanned.task.status);
            }
            progress.finish()
        })
        .collect()
}

/// Sum of several project rows.
pub fn ecosystem(rows: &[Progress]) -> Progress {
    let mut total = Progress::empty("TOTAL", None);
    for row in rows {
        total.total += row.total;
        total.completed += row.completed;
        total.in_progress += row.in_progress;
        total.pending += row.pending;
        total.blocked += row.blocked;
        total.failed += row.failed;
    }
    total.finish()
}

/// `█` cells proportional to `percent`, padded with `░`.
pub fn bar(percent: u8, width: usize) -> String {
    let filled = (usize::from(percent.min(100)) * width) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Fixed-width text table with a TOTAL row.
pub fn render_table(rows: &[Progress]) -> String {
    let name_width = rows
        .iter()
        .map(|r| r.project.chars().count())
        .max()
        .unwrap_or(0)
        .max("TOTAL".len())
        .max("PROJECT".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<name_width$}  {:>5}  {:>5}  {:>5}  {:>5}  {:<bar$}  {:>4}  MILESTONE",
        "PROJECT",
        "DONE",
        "RUN",
        "PEND",
        "TOTAL",
        "PROGRESS",
        "%",
        bar = BAR_WIDTH,
    );
    for row in rows {
        write_row(&mut out, row, name_width);
    }
    let _ = writeln!(out, "{}", "─".repeat(name_width + BAR_WIDTH + 48));
    write_row(&mut out, &ecosystem(rows), name_width);
    out
}

fn write_row(out: &mut String, row: &Progress, name_width: usize) {
    let _ = writeln!(
        out,
        "{:<name_width$}  {:>5}  {:>5}  {:>5}  {:>5}  {}  {:>3}%  {}",
        row.project,
        row.completed,
        row.in_progress,
        row.pending,
        row.total,
        bar(row.percent, BAR_WIDTH),
        row.percent,
        row.milestone.as_deref().unwrap_or("-"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(completed: usize, in_progress: usize, pending: usize) -> Progress {
        let mut p = Progress::empty("p", None);
        for _ in 0..completed {
            p.count(TaskStatus::Completed);
        }
        for _ in 0..in_progress {
            p.count(TaskStatus::InProgress);
        }
        for _ in 0..pending {
            p.count(TaskStatus::Pending);
        }
        p.finish()
    }

    #[test]
    fn five_of_six_is_83_percent() {
        let p = row(5, 0, 1);
        assert_eq!(p.percent, 83);
        assert_eq!(p.completed, 5);
        assert_eq!(p.in_progress, 0);
        assert_eq!(p.pending, 1);
    }

    #[test]
    fn empty_project_is_zero_percent() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(row(0, 0, 0).percent, 0);
    }

    #[test]
    fn blocked_and_failed_count_as_pending() {
        let mut p = Progress::empty("p", None);
        p.count(TaskStatus::Blocked);
        p.count(TaskStatus::Failed);
        let p = p.finish();
        assert_eq!(p.pending, 2);
        assert_eq!(p.blocked, 1);
        assert_eq!(p.failed, 1);
    }

    #[test]
    fn bar_is_proportional_and_fixed_width() {
        assert_eq!(bar(0, 10), "░░░░░░░░░░");
        assert_eq!(bar(50, 10), "█████░░░░░");
        assert_eq!(bar(100, 10), "██████████");
        assert_eq!(bar(83, BAR_WIDTH).chars().count(), BAR_WIDTH);
    }

    #[test]
    fn ecosystem_sums_rows() {
        let total = ecosystem(&[row(5, 0, 1), row(1, 1, 2)]);
        assert_eq!(total.total, 10);
        assert_eq!(total.completed, 6);
        assert_eq!(total.percent, 60);
    }

    #[test]
    fn table_has_total_row() {
        let table = render_table(&[row(5, 0, 1)]);
        assert!(table.contains("TOTAL"));
        assert!(table.contains(" 83%"));
    }
}

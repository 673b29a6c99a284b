//! Template context: serializable rendering payload for one task's preamble.

use serde::{Deserialize, Serialize};

use foreman_core::{ScanReport, ScannedTask};

use crate::error::DispatchError;

/// Everything the preamble templates can reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreambleContext {
    pub task: TaskCtx,
    pub feature: FeatureCtx,
    pub project: ProjectCtx,
    pub milestone: Option<MilestoneCtx>,
    pub constraints: ConstraintsCtx,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCtx {
    pub id: String,
    pub title: String,
    pub complexity: String,
    pub description: Option<String>,
    pub blocked_by: Vec<String>,
}

/// Always present so templates can test `feature.*` without guards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCtx {
    pub description: Option<String>,
    pub benefit: Option<String>,
    pub acceptance_criteria: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCtx {
    pub name: String,
    pub maturity: String,
    pub language: String,
    pub path: String,
    pub test_command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneCtx {
    pub name: String,
    pub target_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintsCtx {
    pub max_turns: u32,
}

impl PreambleContext {
    /// Build the context for `scanned`, looking its project and milestone up in `report`.
    pub fn from_task(report: &ScanReport, scanned: &ScannedTask, max_turns: u32) -> Self {
        let task = &scanned.task;
        let project = report.project(scanned.project);
        let feature = task
            .feature
            .as_ref()
            .map(|f| FeatureCtx {
                description: f.description.clone(),
                benefit: f.benefit.clone(),
                acceptance_criteria: f.acceptance_criteria.clone(),
            })
            .unwrap_or_default();
        let language = if project.language.trim().is_empty() {
            "unspecified".to_string()
        } else {
            project.language.clone()
        };

        PreambleContext {
            task: TaskCtx {
                id: task.id.0.clone(),
                title: task.title.clone(),
                complexity: format!("{:?}", task.complexity),
                description: task.description.clone(),
                blocked_by: task.blocked_by.iter().map(|id| id.0.clone()).collect(),
            },
            feature,
            project: ProjectCtx {
                name: project.name.0.clone(),
                maturity: project.status.to_string(),
                language,
                path: report.project_dir(scanned.project).display().to_string(),
                test_command: project.test_command.clone(),
            },
            milestone: scanned.milestone.map(|handle| {
                let m = report.milestone(handle);
                MilestoneCtx {
                    name: m.name.clone(),
                    target_date: m.target_date.clone(),
                }
            }),
            constraints: ConstraintsCtx { max_turns },
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, DispatchError> {
        tera::Context::from_serialize(self).map_err(DispatchError::from)
    }
}

// src/engine/report.rs

use std::fmt;

use serde::Serialize;

use crate::engine::TaskName;
use crate::result::BuildResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Succeeded,
    Failed,
    /// Not executed because an upstream task failed.
    Skipped,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub name: TaskName,
    pub status: TaskStatus,
    /// `None` for skipped tasks.
    pub result: Option<BuildResult>,
}

/// Outcome of one graph execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Aggregate of every executed task, in completion order.
    pub result: BuildResult,
    /// Per-task status, in completion order; skipped tasks appear when the
    /// failure that caused them is recorded.
    pub tasks: Vec<TaskReport>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self {
            result: BuildResult::success(),
            tasks: Vec::new(),
        }
    }
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.result.succeeded
    }

    pub fn status_of(&self, task: &str) -> Option<TaskStatus> {
        self.tasks.iter().find(|t| t.name == task).map(|t| t.status)
    }

    /// Names of tasks that actually ran, in completion order.
    pub fn executed(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| t.status != TaskStatus::Skipped)
            .map(|t| t.name.as_str())
            .collect()
    }

    pub fn with_status(&self, status: TaskStatus) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| t.status == status)
            .map(|t| t.name.as_str())
            .collect()
    }

    pub(crate) fn record_completion(&mut self, task: TaskName, result: BuildResult) {
        let status = if result.succeeded {
            TaskStatus::Succeeded
        } else {
            TaskStatus::Failed
        };
        self.result.merge(result.clone());
        self.tasks.push(TaskReport {
            name: task,
            status,
            result: Some(result),
        });
    }

    pub(crate) fn record_skipped(&mut self, task: TaskName) {
        self.tasks.push(TaskReport {
            name: task,
            status: TaskStatus::Skipped,
            result: None,
        });
    }
}

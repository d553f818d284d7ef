// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state (scheduler + run report)
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for
//! reading events from channels and sending `ScheduledTask`s to the
//! executor. The core is unit tested without any Tokio, channels,
//! filesystem, or processes.

use crate::dag::Scheduler;
use crate::engine::RuntimeEvent;
use crate::engine::event_handlers::{CoreStep, handle_run_start, handle_task_completion};
use crate::engine::report::RunReport;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    report: RunReport,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            report: RunReport::default(),
        }
    }

    /// Expose whether the scheduler is idle (for tests).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Begin the run and return the initial dispatch.
    pub fn start(&mut self) -> CoreStep {
        handle_run_start(&mut self.scheduler, &mut self.report)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskCompleted { task, result } => {
                handle_task_completion(&mut self.scheduler, &mut self.report, task, result)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{DagGraph, TaskGraph};
    use crate::engine::{CoreCommand, TaskStatus};
    use crate::result::{BuildResult, Diagnostic};

    fn core_for(graph: TaskGraph) -> CoreRuntime {
        CoreRuntime::new(Scheduler::new(DagGraph::from_task_graph(&graph).unwrap()))
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .flat_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => tasks.iter().map(|t| t.name.clone()).collect(),
                CoreCommand::RequestExit => Vec::new(),
            })
            .collect()
    }

    fn done(task: &str, ok: bool) -> RuntimeEvent {
        let result = if ok {
            BuildResult::success()
        } else {
            BuildResult::failure(vec![Diagnostic::error("boom")])
        };
        RuntimeEvent::TaskCompleted {
            task: task.to_string(),
            result,
        }
    }

    #[test]
    fn series_failure_skips_the_rest() {
        let mut core = core_for(TaskGraph::series([
            TaskGraph::task("a"),
            TaskGraph::task("b"),
            TaskGraph::task("c"),
        ]));

        assert_eq!(dispatched(&core.start()), vec!["a"]);
        assert_eq!(dispatched(&core.step(done("a", true))), vec!["b"]);

        let step = core.step(done("b", false));
        assert!(dispatched(&step).is_empty());
        assert!(!step.keep_running);

        let report = core.into_report();
        assert!(!report.succeeded());
        assert_eq!(report.status_of("c"), Some(TaskStatus::Skipped));
        assert_eq!(report.result.diagnostics.len(), 1);
    }

    #[test]
    fn parallel_siblings_all_finish() {
        let mut core = core_for(TaskGraph::parallel([
            TaskGraph::task("a"),
            TaskGraph::task("b"),
        ]));

        assert_eq!(dispatched(&core.start()), vec!["a", "b"]);
        assert!(core.step(done("a", false)).keep_running);
        assert!(!core.step(done("b", true)).keep_running);

        let report = core.into_report();
        assert_eq!(report.executed(), vec!["a", "b"]);
        assert!(!report.succeeded());
    }

    #[test]
    fn empty_graph_finishes_immediately() {
        let mut core = core_for(TaskGraph::series([]));
        let step = core.start();
        assert!(!step.keep_running);
        assert!(core.into_report().succeeded());
    }
}

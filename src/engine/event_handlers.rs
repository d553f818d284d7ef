// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use crate::dag::{ScheduledTask, Scheduler, SchedulerStep};
use crate::engine::report::RunReport;
use crate::engine::{TaskName, TaskOutcome};
use crate::result::BuildResult;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// The run is over; the shell should stop reading events.
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Start the run: every task becomes pending, roots are dispatched.
pub fn handle_run_start(scheduler: &mut Scheduler, report: &mut RunReport) -> CoreStep {
    let step = scheduler.step_start();
    apply_scheduler_step(step, report)
}

/// Record a finished task and dispatch whatever became ready.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    report: &mut RunReport,
    task: TaskName,
    result: BuildResult,
) -> CoreStep {
    let outcome = TaskOutcome::of(&result);
    let step = scheduler.step_completion(&task, outcome);
    report.record_completion(task, result);
    apply_scheduler_step(step, report)
}

fn apply_scheduler_step(step: SchedulerStep, report: &mut RunReport) -> CoreStep {
    let mut commands = Vec::new();

    for skipped in step.newly_skipped {
        report.record_skipped(skipped);
    }

    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }

    let keep_running = !step.run_just_finished;
    if step.run_just_finished {
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

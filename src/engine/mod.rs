// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the DAG scheduler
//! - the executor that runs tasks
//! - the runtime event loop that reacts to task completions
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]. [`Runner`] wires both up for one execution of
//! a [`crate::dag::TaskGraph`].

use crate::result::BuildResult;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of a task for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
}

impl TaskOutcome {
    pub fn of(result: &BuildResult) -> Self {
        if result.succeeded {
            TaskOutcome::Success
        } else {
            TaskOutcome::Failed
        }
    }
}

/// Events flowing into the runtime from the executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task finished (or panicked, reported as a failed result).
    TaskCompleted { task: TaskName, result: BuildResult },
    /// Stop without waiting for the remaining tasks.
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod report;
pub mod runner;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use report::{RunReport, TaskReport, TaskStatus};
pub use runner::Runner;
pub use runtime::Runtime;

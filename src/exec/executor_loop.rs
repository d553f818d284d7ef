// src/exec/executor_loop.rs

//! Executor loop that runs scheduled tasks.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::result::{BuildResult, Diagnostic};
use crate::task::{Task, TaskSet};

/// Spawn the background executor loop.
///
/// The returned `mpsc::Sender<ScheduledTask>` is what `RealExecutorBackend`
/// forwards to. Each scheduled task runs in its own Tokio task, so members
/// of a parallel group run concurrently.
pub fn spawn_executor(
    tasks: TaskSet,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        debug!("executor loop started");
        while let Some(scheduled) = rx.recv().await {
            let runtime_tx = runtime_tx.clone();
            match tasks.get(&scheduled.name) {
                Some(task) => {
                    tokio::spawn(run_task(task, scheduled, runtime_tx));
                }
                None => {
                    error!(task = %scheduled.name, "scheduled task is not registered");
                    let result = BuildResult::failure(vec![
                        Diagnostic::error(format!("unknown task '{}'", scheduled.name))
                            .from_origin(&scheduled.name),
                    ]);
                    let _ = runtime_tx
                        .send(RuntimeEvent::TaskCompleted {
                            task: scheduled.name,
                            result,
                        })
                        .await;
                }
            }
        }
        debug!("executor loop finished (channel closed)");
    });

    tx
}

/// Run one task and report its result. A panic in the task body becomes a
/// failed result.
async fn run_task(task: Arc<Task>, scheduled: ScheduledTask, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let name = scheduled.name;
    let run_id = scheduled.run_id;
    debug!(task = %name, run_id, "executing task");

    let result = match tokio::spawn(async move { task.run().await }).await {
        Ok(result) => result,
        Err(join_err) => {
            let reason = if join_err.is_panic() {
                panic_message(join_err.into_panic())
            } else {
                "task was cancelled".to_string()
            };
            error!(task = %name, run_id, %reason, "task aborted");
            BuildResult::failure(vec![
                Diagnostic::error(format!("task aborted: {reason}")).from_origin(&name),
            ])
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: name.clone(),
            result,
        })
        .await
        .is_err()
    {
        debug!(task = %name, run_id, "runtime gone; dropping completion");
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

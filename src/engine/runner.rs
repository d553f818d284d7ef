// src/engine/runner.rs

use tokio::sync::mpsc;
use tracing::info;

use crate::dag::{DagGraph, Scheduler, TaskGraph};
use crate::engine::report::RunReport;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent};
use crate::errors::{AssetdagError, Result};
use crate::exec::{ExecutorBackend, RealExecutorBackend};
use crate::task::TaskSet;

/// Executes [`TaskGraph`]s against a set of tasks.
///
/// Every call to [`Runner::execute`] gets its own scheduler and event
/// channel, so the same runner (and the same graph) can be executed many
/// times, also concurrently.
#[derive(Debug, Clone)]
pub struct Runner {
    tasks: TaskSet,
}

impl Runner {
    pub fn new(tasks: TaskSet) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    /// Compile `graph` and check that every task it names exists.
    pub fn compile(&self, graph: &TaskGraph) -> Result<DagGraph> {
        let dag = DagGraph::from_task_graph(graph)?;
        if let Some(missing) = dag.tasks().find(|name| !self.tasks.contains(name)) {
            return Err(AssetdagError::UnknownTask(missing.to_string()));
        }
        Ok(dag)
    }

    /// Run `graph` to completion.
    ///
    /// Task failures are reported in the returned [`RunReport`]; an `Err`
    /// means the graph could not be run at all.
    pub async fn execute(&self, graph: &TaskGraph) -> Result<RunReport> {
        let dag = self.compile(graph)?;
        info!(graph = %graph, "executing task graph");

        let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
        let executor = RealExecutorBackend::new(self.tasks.clone(), tx);
        Self::execute_with(dag, rx, executor).await
    }

    /// Run an already compiled graph on a caller-provided executor.
    pub async fn execute_with<E: ExecutorBackend>(
        dag: DagGraph,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
    ) -> Result<RunReport> {
        let core = CoreRuntime::new(Scheduler::new(dag));
        Runtime::new(core, event_rx, executor).run().await
    }
}

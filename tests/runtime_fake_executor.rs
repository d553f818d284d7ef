// tests/runtime_fake_executor.rs

use assetdag_test_utils::fake_executor::FakeExecutor;
use assetdag_test_utils::init_tracing;

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

use assetdag::dag::{DagGraph, TaskGraph as G};
use assetdag::engine::{RuntimeEvent, Runner, TaskStatus};

type TestResult = Result<(), Box<dyn Error>>;

fn build_graph() -> G {
    G::series([
        G::task("clean"),
        G::parallel([G::task("html"), G::task("js"), G::task("css")]),
        G::task("size-report"),
    ])
}

#[tokio::test]
async fn runtime_with_fake_executor_runs_build_graph_in_order() -> TestResult {
    init_tracing();

    let dag = DagGraph::from_task_graph(&build_graph())?;
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx, executed.clone());

    // Enforce an upper bound on how long this test may run.
    let report = match timeout(Duration::from_secs(3), Runner::execute_with(dag, rt_rx, executor)).await {
        Ok(result) => result?,
        Err(_) => panic!("runtime did not finish within 3 seconds"),
    };

    assert!(report.succeeded());

    let tasks_run = executed.lock().unwrap().clone();
    assert_eq!(tasks_run.len(), 5);
    assert_eq!(tasks_run.first().map(String::as_str), Some("clean"));
    assert_eq!(tasks_run.last().map(String::as_str), Some("size-report"));

    // The group is dispatched together, in declaration order.
    assert_eq!(&tasks_run[1..4], &["html", "js", "css"]);
    Ok(())
}

#[tokio::test]
async fn runtime_with_fake_executor_skips_after_failed_group_member() -> TestResult {
    init_tracing();

    let dag = DagGraph::from_task_graph(&build_graph())?;
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx, executed.clone()).failing("js");

    let report = timeout(Duration::from_secs(3), Runner::execute_with(dag, rt_rx, executor))
        .await
        .expect("runtime did not finish within 3 seconds")?;

    assert!(!report.succeeded());
    assert_eq!(report.with_status(TaskStatus::Skipped), vec!["size-report"]);
    assert_eq!(report.status_of("css"), Some(TaskStatus::Succeeded));

    let tasks_run = executed.lock().unwrap().clone();
    assert!(!tasks_run.contains(&"size-report".to_string()));
    Ok(())
}

#[tokio::test]
async fn runtime_with_fake_executor_failing_first_task_runs_nothing_else() -> TestResult {
    init_tracing();

    let dag = DagGraph::from_task_graph(&build_graph())?;
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx, executed.clone()).failing("clean");

    let report = timeout(Duration::from_secs(3), Runner::execute_with(dag, rt_rx, executor))
        .await
        .expect("runtime did not finish within 3 seconds")?;

    assert_eq!(executed.lock().unwrap().clone(), vec!["clean".to_string()]);
    let mut skipped = report.with_status(TaskStatus::Skipped);
    skipped.sort();
    assert_eq!(skipped, vec!["css", "html", "js", "size-report"]);
    Ok(())
}

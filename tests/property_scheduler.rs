// tests/property_scheduler.rs

use std::collections::HashSet;

use proptest::prelude::*;

use assetdag::dag::{DagGraph, ScheduledTask, Scheduler, TaskGraph, TaskRunState};
use assetdag::engine::TaskOutcome;

/// Graph shape without names; names are assigned afterwards so they are
/// unique.
#[derive(Debug, Clone)]
enum Shape {
    Leaf,
    Series(Vec<Shape>),
    Parallel(Vec<Shape>),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    Just(Shape::Leaf).prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Shape::Series),
            proptest::collection::vec(inner, 0..4).prop_map(Shape::Parallel),
        ]
    })
}

fn to_graph(shape: &Shape, next: &mut usize) -> TaskGraph {
    match shape {
        Shape::Leaf => {
            let name = format!("t{next}");
            *next += 1;
            TaskGraph::task(name)
        }
        Shape::Series(items) => TaskGraph::series(items.iter().map(|s| to_graph(s, next))),
        Shape::Parallel(items) => TaskGraph::parallel(items.iter().map(|s| to_graph(s, next))),
    }
}

/// (earlier, later) pairs: every task of `earlier` must have succeeded
/// before any task of `later` is dispatched.
fn series_constraints(graph: &TaskGraph, out: &mut Vec<(Vec<String>, Vec<String>)>) {
    match graph {
        TaskGraph::Task(_) => {}
        TaskGraph::Series(items) | TaskGraph::Parallel(items) => {
            if matches!(graph, TaskGraph::Series(_)) {
                for (i, earlier) in items.iter().enumerate() {
                    for later in &items[i + 1..] {
                        let names = |g: &TaskGraph| {
                            g.task_names().into_iter().map(str::to_string).collect::<Vec<_>>()
                        };
                        out.push((names(earlier), names(later)));
                    }
                }
            }
            for item in items {
                series_constraints(item, out);
            }
        }
    }
}

fn has_failed_ancestor(dag: &DagGraph, task: &str, failed: &HashSet<String>) -> bool {
    dag.dependencies_of(task)
        .iter()
        .any(|dep| failed.contains(dep) || has_failed_ancestor(dag, dep, failed))
}

struct Simulation {
    constraints: Vec<(Vec<String>, Vec<String>)>,
    running: Vec<String>,
    dispatched: HashSet<String>,
    succeeded: HashSet<String>,
}

impl Simulation {
    fn dispatch(&mut self, scheduled: Vec<ScheduledTask>) -> Result<(), TestCaseError> {
        for task in scheduled {
            prop_assert!(
                self.dispatched.insert(task.name.clone()),
                "{} dispatched twice",
                task.name
            );
            for (earlier, later) in &self.constraints {
                if later.contains(&task.name) {
                    for before in earlier {
                        prop_assert!(
                            self.succeeded.contains(before),
                            "{} dispatched before {} succeeded",
                            task.name,
                            before
                        );
                    }
                }
            }
            self.running.push(task.name);
        }
        Ok(())
    }
}

proptest! {
    #[test]
    fn scheduler_runs_series_fail_fast_and_parallel_fail_soft(
        shape in shape_strategy(),
        failing_indices in proptest::collection::vec(0..30usize, 0..4),
        picks in proptest::collection::vec(any::<usize>(), 1..40),
    ) {
        let mut next = 0;
        let graph = to_graph(&shape, &mut next);
        let names: Vec<String> = graph.task_names().into_iter().map(str::to_string).collect();
        let failing: HashSet<String> = failing_indices
            .iter()
            .filter(|&&i| i < names.len())
            .map(|&i| names[i].clone())
            .collect();

        let dag = DagGraph::from_task_graph(&graph).expect("generated graphs are valid");
        let mut scheduler = Scheduler::new(dag.clone());

        let mut constraints = Vec::new();
        series_constraints(&graph, &mut constraints);
        let mut sim = Simulation {
            constraints,
            running: Vec::new(),
            dispatched: HashSet::new(),
            succeeded: HashSet::new(),
        };

        let step = scheduler.step_start();
        sim.dispatch(step.newly_scheduled)?;

        let mut failed = HashSet::new();
        let mut steps = 0;
        while !sim.running.is_empty() {
            prop_assert!(steps < 1000, "simulation did not terminate");
            let idx = picks[steps % picks.len()] % sim.running.len();
            steps += 1;

            let task = sim.running.remove(idx);
            let outcome = if failing.contains(&task) {
                failed.insert(task.clone());
                TaskOutcome::Failed
            } else {
                sim.succeeded.insert(task.clone());
                TaskOutcome::Success
            };
            let step = scheduler.step_completion(&task, outcome);
            sim.dispatch(step.newly_scheduled)?;
        }

        prop_assert!(scheduler.is_idle());

        for name in &names {
            let state = scheduler.run_state_of(name);
            prop_assert!(
                matches!(
                    state,
                    Some(TaskRunState::DoneSuccess | TaskRunState::DoneFailed | TaskRunState::Skipped)
                ),
                "{name} ended in {state:?}"
            );

            // Skipped iff downstream of a failure; everything else ran.
            let blocked = has_failed_ancestor(&dag, name, &failed);
            prop_assert_eq!(state == Some(TaskRunState::Skipped), blocked);
            prop_assert_eq!(sim.dispatched.contains(name), !blocked);
        }
    }
}

// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::task_graph::TaskGraph;
use crate::errors::{AssetdagError, Result};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Tasks that must succeed before this one can run.
    deps: Vec<String>,
    /// Tasks that depend on this one.
    dependents: Vec<String>,
}

/// Dependency DAG compiled from a [`TaskGraph`], keyed by task name.
///
/// Compilation rules:
/// - element *k* of a series depends on every sink of element *k-1*;
/// - members of a parallel group share the group's predecessors and have no
///   edges between each other.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: HashMap<String, DagNode>,
    /// Task names in declaration order, for deterministic iteration.
    order: Vec<String>,
}

impl DagGraph {
    /// Compile `graph`. A task may appear at most once.
    pub fn from_task_graph(graph: &TaskGraph) -> Result<Self> {
        let mut dag = Self {
            nodes: HashMap::new(),
            order: Vec::new(),
        };
        dag.add(&[], graph)?;

        // Populate dependents based on deps.
        for name in dag.order.clone() {
            let deps = dag
                .nodes
                .get(&name)
                .map(|n| n.deps.clone())
                .unwrap_or_default();
            for dep in deps {
                if let Some(dep_node) = dag.nodes.get_mut(&dep) {
                    dep_node.dependents.push(name.clone());
                }
            }
        }

        Ok(dag)
    }

    /// Add `graph` after `preds`; returns its sinks.
    fn add(&mut self, preds: &[String], graph: &TaskGraph) -> Result<Vec<String>> {
        match graph {
            TaskGraph::Task(name) => {
                if self.nodes.contains_key(name) {
                    return Err(AssetdagError::InvalidGraph(format!(
                        "task '{name}' appears more than once"
                    )));
                }
                self.nodes.insert(
                    name.clone(),
                    DagNode {
                        deps: preds.to_vec(),
                        dependents: Vec::new(),
                    },
                );
                self.order.push(name.clone());
                Ok(vec![name.clone()])
            }
            TaskGraph::Series(items) => {
                let mut current = preds.to_vec();
                for item in items {
                    current = self.add(&current, item)?;
                }
                Ok(current)
            }
            TaskGraph::Parallel(items) => {
                if items.is_empty() {
                    return Ok(preds.to_vec());
                }
                let mut sinks = Vec::new();
                for item in items {
                    sinks.extend(self.add(preds, item)?);
                }
                Ok(sinks)
            }
        }
    }

    /// All task names, in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    fn to_graphmap(&self) -> DiGraphMap<&str, ()> {
        let mut g = DiGraphMap::new();
        for name in &self.order {
            g.add_node(name.as_str());
        }
        for name in &self.order {
            for dep in self.dependencies_of(name) {
                g.add_edge(dep.as_str(), name.as_str(), ());
            }
        }
        g
    }

    /// A valid sequential execution order.
    pub fn execution_order(&self) -> Result<Vec<String>> {
        let g = self.to_graphmap();
        toposort(&g, None)
            .map(|order| order.into_iter().map(str::to_string).collect())
            .map_err(|cycle| {
                AssetdagError::InvalidGraph(format!("cycle detected at task '{}'", cycle.node_id()))
            })
    }

    /// Tasks grouped by the earliest point they can start: stage *n* holds
    /// the tasks whose longest dependency chain has length *n*. Tasks within
    /// a stage run concurrently.
    pub fn stages(&self) -> Result<Vec<Vec<String>>> {
        let mut level: HashMap<&str, usize> = HashMap::new();
        let order = self.execution_order()?;

        for name in &order {
            let lvl = self
                .dependencies_of(name)
                .iter()
                .filter_map(|d| level.get(d.as_str()))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);
            level.insert(name.as_str(), lvl);
        }

        let depth = level.values().copied().max().map(|m| m + 1).unwrap_or(0);
        let mut stages = vec![Vec::new(); depth];
        // Declaration order inside a stage.
        for name in &self.order {
            if let Some(&lvl) = level.get(name.as_str()) {
                stages[lvl].push(name.clone());
            }
        }
        Ok(stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(name: &str) -> TaskGraph {
        TaskGraph::task(name)
    }

    #[test]
    fn series_depends_on_previous_sinks() {
        let graph = TaskGraph::series([
            t("clean"),
            TaskGraph::parallel([t("html"), t("js"), t("css")]),
            t("size-report"),
        ]);
        let dag = DagGraph::from_task_graph(&graph).unwrap();

        assert!(dag.dependencies_of("clean").is_empty());
        assert_eq!(dag.dependencies_of("js"), ["clean".to_string()]);
        assert_eq!(
            dag.dependencies_of("size-report"),
            ["html".to_string(), "js".to_string(), "css".to_string()]
        );
        assert!(dag.dependencies_of("html").iter().all(|d| d != "js"));
    }

    #[test]
    fn stages_group_parallel_members() {
        let graph = TaskGraph::series([
            t("clean"),
            TaskGraph::parallel([t("html"), t("js")]),
            t("report"),
        ]);
        let dag = DagGraph::from_task_graph(&graph).unwrap();
        assert_eq!(
            dag.stages().unwrap(),
            vec![
                vec!["clean".to_string()],
                vec!["html".to_string(), "js".to_string()],
                vec!["report".to_string()],
            ]
        );
    }

    #[test]
    fn duplicate_task_is_rejected() {
        let graph = TaskGraph::series([t("a"), t("a")]);
        assert!(matches!(
            DagGraph::from_task_graph(&graph),
            Err(AssetdagError::InvalidGraph(_))
        ));
    }

    #[test]
    fn empty_groups_pass_predecessors_through() {
        let graph = TaskGraph::series([t("a"), TaskGraph::parallel([]), t("b")]);
        let dag = DagGraph::from_task_graph(&graph).unwrap();
        assert_eq!(dag.dependencies_of("b"), ["a".to_string()]);
    }
}

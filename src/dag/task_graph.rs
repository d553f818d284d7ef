// src/dag/task_graph.rs

use std::fmt;

/// Declarative composition of tasks.
///
/// - `Series` runs its elements in order; the first failure skips everything
///   after it.
/// - `Parallel` starts all members together and lets every one of them
///   finish, whatever its siblings do.
///
/// A graph is a plain value: it is built once, can be printed, and can be
/// executed any number of times by [`crate::engine::Runner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskGraph {
    Task(String),
    Series(Vec<TaskGraph>),
    Parallel(Vec<TaskGraph>),
}

impl TaskGraph {
    pub fn task(name: impl Into<String>) -> Self {
        TaskGraph::Task(name.into())
    }

    pub fn series(items: impl IntoIterator<Item = TaskGraph>) -> Self {
        TaskGraph::Series(items.into_iter().collect())
    }

    pub fn parallel(items: impl IntoIterator<Item = TaskGraph>) -> Self {
        TaskGraph::Parallel(items.into_iter().collect())
    }

    /// Task names in declaration order.
    pub fn task_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TaskGraph::Task(name) => out.push(name),
            TaskGraph::Series(items) | TaskGraph::Parallel(items) => {
                for item in items {
                    item.collect_names(out);
                }
            }
        }
    }

    /// Indented tree, one node per line, like `gulp --tasks`.
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        match self {
            TaskGraph::Task(name) => out.push_str(&format!("{indent}{name}\n")),
            TaskGraph::Series(items) | TaskGraph::Parallel(items) => {
                let label = if matches!(self, TaskGraph::Series(_)) {
                    "<series>"
                } else {
                    "<parallel>"
                };
                out.push_str(&format!("{indent}{label}\n"));
                for item in items {
                    item.render_into(out, depth + 1);
                }
            }
        }
    }
}

impl fmt::Display for TaskGraph {
    /// Compact form: `series(clean, parallel(html, js, css), size-report)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, items) = match self {
            TaskGraph::Task(name) => return f.write_str(name),
            TaskGraph::Series(items) => ("series", items),
            TaskGraph::Parallel(items) => ("parallel", items),
        };
        write!(f, "{label}(")?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> TaskGraph {
        TaskGraph::series([
            TaskGraph::task("clean"),
            TaskGraph::parallel([
                TaskGraph::task("html"),
                TaskGraph::task("js"),
                TaskGraph::task("css"),
            ]),
            TaskGraph::task("size-report"),
        ])
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(
            build().to_string(),
            "series(clean, parallel(html, js, css), size-report)"
        );
    }

    #[test]
    fn names_are_in_declaration_order() {
        assert_eq!(
            build().task_names(),
            vec!["clean", "html", "js", "css", "size-report"]
        );
    }

    #[test]
    fn tree_is_indented() {
        let tree = TaskGraph::series([TaskGraph::task("serve"), TaskGraph::task("watch")]).render_tree();
        assert_eq!(tree, "<series>\n  serve\n  watch\n");
    }
}

// src/watch/binding.rs

//! One glob pattern set bound to one task, and the loop that drives it.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::result::{BuildResult, Diagnostic};
use crate::server::{ReloadBroadcaster, ReloadScope};
use crate::task::Task;
use crate::watch::hash::compute_hash_for_paths;
use crate::watch::patterns::{PatternSet, collect_matching_files};
use crate::watch::queue::ChangeQueue;

/// What to tell browsers after a successful rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadTarget {
    None,
    FullPage,
    /// Swap the stylesheets the task wrote. Paths are sent relative to
    /// `served_dir` (the dev server root, relative to the project root).
    Styles { served_dir: PathBuf },
}

#[derive(Debug, Clone)]
pub struct WatchBinding {
    name: String,
    patterns: PatternSet,
    task: Arc<Task>,
    reload: ReloadTarget,
    use_hash: bool,
}

impl WatchBinding {
    pub fn new(name: impl Into<String>, patterns: PatternSet, task: Arc<Task>) -> Self {
        Self {
            name: name.into(),
            patterns,
            task,
            reload: ReloadTarget::FullPage,
            use_hash: false,
        }
    }

    pub fn with_reload(mut self, reload: ReloadTarget) -> Self {
        self.reload = reload;
        self
    }

    /// Skip runs when the content of the watched files did not change.
    pub fn with_hash(mut self, use_hash: bool) -> Self {
        self.use_hash = use_hash;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    /// Scope to broadcast for a successful `result`, if any.
    pub fn reload_scope(&self, result: &BuildResult) -> Option<ReloadScope> {
        match &self.reload {
            ReloadTarget::None => None,
            ReloadTarget::FullPage => Some(ReloadScope::FullPage),
            ReloadTarget::Styles { served_dir } => {
                let paths = result
                    .artifacts
                    .iter()
                    .filter(|a| a.has_extension("css"))
                    .filter_map(|a| a.relative_to(served_dir))
                    .collect();
                Some(ReloadScope::Styles { paths })
            }
        }
    }
}

/// Shared by every binding loop of one watcher.
#[derive(Debug, Clone)]
pub(crate) struct LoopContext {
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub debounce: Duration,
    pub broadcaster: Option<ReloadBroadcaster>,
}

/// Drive one binding until `stop` flips or the event channel closes.
///
/// Wait for a change, let the burst settle, run the task, and fold whatever
/// arrived during the run into at most one follow-up run.
pub(crate) async fn run_binding(
    binding: WatchBinding,
    ctx: LoopContext,
    mut rx: mpsc::Receiver<String>,
    mut stop: watch::Receiver<bool>,
    runs: Arc<AtomicUsize>,
) {
    let mut queue = ChangeQueue::new();
    let mut last_hash = if binding.use_hash {
        content_hash(&binding, &ctx)
    } else {
        None
    };

    debug!(binding = %binding.name, "watch loop started");

    'outer: loop {
        tokio::select! {
            _ = stop.wait_for(|s| *s) => break,
            event = rx.recv() => match event {
                Some(path) => { queue.record(path); }
                None => break,
            },
        }

        loop {
            if !settle(&mut rx, &mut queue, ctx.debounce, &mut stop).await {
                break 'outer;
            }

            let changed = queue.drain();
            if binding.use_hash {
                let hash = content_hash(&binding, &ctx);
                if hash.is_some() && hash == last_hash {
                    debug!(binding = %binding.name, "content unchanged; run skipped");
                } else {
                    last_hash = hash;
                    run_once(&binding, &ctx, &changed, &runs).await;
                }
            } else {
                run_once(&binding, &ctx, &changed, &runs).await;
            }

            while let Ok(path) = rx.try_recv() {
                queue.record(path);
            }
            if queue.is_empty() {
                break;
            }
            debug!(binding = %binding.name, pending = queue.len(), "changes arrived during run");
        }
    }

    debug!(binding = %binding.name, "watch loop finished");
}

/// Trailing debounce: keep absorbing events until `window` passes without
/// one, capped at ten windows overall. Returns false when asked to stop.
async fn settle(
    rx: &mut mpsc::Receiver<String>,
    queue: &mut ChangeQueue,
    window: Duration,
    stop: &mut watch::Receiver<bool>,
) -> bool {
    let hard_deadline = Instant::now() + window * 10;

    loop {
        let wait = window.min(hard_deadline.saturating_duration_since(Instant::now()));
        if wait.is_zero() {
            return true;
        }

        tokio::select! {
            _ = stop.wait_for(|s| *s) => return false,
            event = tokio::time::timeout(wait, rx.recv()) => match event {
                Err(_) => return true,
                Ok(Some(path)) => {
                    queue.record(path);
                }
                Ok(None) => return true,
            },
        }
    }
}

async fn run_once(
    binding: &WatchBinding,
    ctx: &LoopContext,
    changed: &[String],
    runs: &AtomicUsize,
) {
    info!(
        binding = %binding.name,
        task = %binding.task.name(),
        changed = ?changed,
        "change detected; rebuilding"
    );

    let task = Arc::clone(&binding.task);
    let result = match tokio::spawn(async move { task.run().await }).await {
        Ok(result) => result,
        Err(err) => BuildResult::failure(vec![
            Diagnostic::error(format!("task aborted: {err}")).from_origin(binding.task.name()),
        ]),
    };
    runs.fetch_add(1, Ordering::SeqCst);

    if !result.succeeded {
        warn!(
            binding = %binding.name,
            errors = result.error_count(),
            "rebuild failed; previous output left in place"
        );
        return;
    }

    if let (Some(broadcaster), Some(scope)) = (&ctx.broadcaster, binding.reload_scope(&result)) {
        broadcaster.notify_clients(scope);
    }
}

fn content_hash(binding: &WatchBinding, ctx: &LoopContext) -> Option<String> {
    let hash = collect_matching_files(ctx.fs.as_ref(), &ctx.root, &binding.patterns)
        .and_then(|files| compute_hash_for_paths(ctx.fs.as_ref(), files));
    match hash {
        Ok(hash) => Some(hash),
        Err(err) => {
            warn!(binding = %binding.name, error = %err, "failed to hash watched files");
            None
        }
    }
}

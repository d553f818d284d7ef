// src/watch/watcher.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::server::ReloadBroadcaster;
use crate::watch::binding::{LoopContext, WatchBinding, run_binding};
use crate::watch::path_utils::{is_within, relative_str};

/// Events buffered per binding before further ones are dropped. A binding
/// that is busy coalesces everything into one follow-up run anyway.
const BINDING_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub debounce: Duration,
    /// Directories (relative to `root`) whose changes are ignored, e.g. the
    /// output directory.
    pub ignore: Vec<String>,
    pub broadcaster: Option<ReloadBroadcaster>,
}

impl WatchOptions {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>, debounce: Duration) -> Self {
        Self {
            root: root.into(),
            fs,
            debounce,
            ignore: Vec::new(),
            broadcaster: None,
        }
    }

    pub fn ignore(mut self, dir: impl Into<String>) -> Self {
        self.ignore.push(dir.into());
        self
    }

    pub fn broadcaster(mut self, broadcaster: ReloadBroadcaster) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }
}

struct Route {
    binding: WatchBinding,
    tx: mpsc::Sender<String>,
}

/// Turns changed paths into per-binding events.
struct Dispatcher {
    root: PathBuf,
    ignore: Vec<String>,
    routes: Vec<Route>,
}

impl Dispatcher {
    /// Returns how many bindings accepted the path.
    fn dispatch(&self, path: &Path) -> usize {
        let Some(rel) = relative_str(&self.root, path) else {
            debug!(path = %path.display(), "change outside the watched root");
            return 0;
        };
        if rel.is_empty() || self.ignore.iter().any(|dir| is_within(&rel, dir)) {
            return 0;
        }

        let mut accepted = 0;
        for route in &self.routes {
            if !route.binding.patterns().matches(&rel) {
                continue;
            }
            match route.tx.try_send(rel.clone()) {
                Ok(()) => accepted += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!(binding = %route.binding.name(), path = %rel, "binding busy; event dropped");
                    accepted += 1;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        accepted
    }
}

/// Running watcher. Dropping it without calling [`WatchHandle::stop`] leaves
/// the binding loops alive until the runtime shuts down.
pub struct WatchHandle {
    inner: Mutex<Option<RecommendedWatcher>>,
    dispatcher: Arc<Dispatcher>,
    stop_tx: watch::Sender<bool>,
    runs: BTreeMap<String, Arc<AtomicUsize>>,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("bindings", &self.runs.keys().collect::<Vec<_>>())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl WatchHandle {
    pub fn bindings(&self) -> impl Iterator<Item = &str> {
        self.runs.keys().map(String::as_str)
    }

    /// How many times the task of `binding` has run so far.
    pub fn runs(&self, binding: &str) -> usize {
        self.runs
            .get(binding)
            .map(|n| n.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Feed a changed path as if the file watcher had reported it.
    pub fn dispatch(&self, path: &Path) -> usize {
        if self.is_stopped() {
            return 0;
        }
        self.dispatcher.dispatch(path)
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Stop watching. A task that is currently running finishes; no further
    /// runs start. Calling this again does nothing.
    pub fn stop(&self) {
        if self.stop_tx.send_replace(true) {
            return;
        }
        if let Ok(mut inner) = self.inner.lock() {
            inner.take();
        }
        info!("file watcher stopped");
    }
}

/// Watch `options.root` recursively and drive every binding.
///
/// Bindings run concurrently with each other; each one runs its own task
/// at most once at a time.
pub fn spawn_watcher(options: WatchOptions, bindings: Vec<WatchBinding>) -> Result<WatchHandle> {
    let root = options
        .root
        .canonicalize()
        .unwrap_or_else(|_| options.root.clone());

    let (stop_tx, stop_rx) = watch::channel(false);
    let ctx = LoopContext {
        root: options.root.clone(),
        fs: Arc::clone(&options.fs),
        debounce: options.debounce,
        broadcaster: options.broadcaster.clone(),
    };

    let mut routes = Vec::with_capacity(bindings.len());
    let mut runs = BTreeMap::new();
    for binding in bindings {
        let (tx, rx) = mpsc::channel(BINDING_CHANNEL_CAPACITY);
        let counter = Arc::new(AtomicUsize::new(0));
        runs.insert(binding.name().to_string(), Arc::clone(&counter));
        tokio::spawn(run_binding(
            binding.clone(),
            ctx.clone(),
            rx,
            stop_rx.clone(),
            counter,
        ));
        routes.push(Route { binding, tx });
    }

    let dispatcher = Arc::new(Dispatcher {
        root: root.clone(),
        ignore: options.ignore.clone(),
        routes,
    });

    // notify calls back on its own thread; hop into tokio through a channel.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = event_tx.send(event);
            }
            Err(err) => eprintln!("assetdag: file watch error: {err}"),
        },
        Config::default(),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!(root = %root.display(), bindings = runs.len(), "file watcher started");

    let async_dispatcher = Arc::clone(&dispatcher);
    let mut stop = stop_rx;
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.wait_for(|s| *s) => break,
                event = event_rx.recv() => {
                    let Some(event) = event else { break };
                    if event.kind.is_access() {
                        continue;
                    }
                    debug!(?event, "received notify event");
                    for path in &event.paths {
                        async_dispatcher.dispatch(path);
                    }
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatchHandle {
        inner: Mutex::new(Some(watcher)),
        dispatcher,
        stop_tx,
        runs,
    })
}

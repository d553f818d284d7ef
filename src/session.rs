// src/session.rs

//! Long-lived services started by the `serve` and `watch` tasks.
//!
//! Both tasks start their service and return right away; the services stay
//! up in the [`DevSession`] until [`DevSession::shutdown`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::errors::TaskError;
use crate::result::BuildResult;
use crate::server::{DevServer, ReloadBroadcaster, ServerHandle};
use crate::task::{SideEffect, SideEffectFuture};
use crate::watch::{WatchBinding, WatchHandle, WatchOptions, spawn_watcher};

#[derive(Debug, Default)]
pub struct DevSession {
    broadcaster: ReloadBroadcaster,
    server: Mutex<Option<ServerHandle>>,
    watcher: Mutex<Option<WatchHandle>>,
}

impl DevSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broadcaster(&self) -> &ReloadBroadcaster {
        &self.broadcaster
    }

    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server
            .lock()
            .ok()
            .and_then(|s| s.as_ref().map(ServerHandle::addr))
    }

    pub fn is_serving(&self) -> bool {
        self.server_addr().is_some()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().map(|w| w.is_some()).unwrap_or(false)
    }

    /// True while a server or watcher keeps the process busy.
    pub fn is_active(&self) -> bool {
        self.is_serving() || self.is_watching()
    }

    /// Runs of the task bound to `binding` since watching started.
    pub fn watch_runs(&self, binding: &str) -> usize {
        self.watcher
            .lock()
            .ok()
            .and_then(|w| w.as_ref().map(|w| w.runs(binding)))
            .unwrap_or(0)
    }

    /// Stop the watchers first so no rebuild races the server shutdown.
    pub async fn shutdown(&self) {
        let watcher = self.watcher.lock().ok().and_then(|mut w| w.take());
        if let Some(watcher) = watcher {
            watcher.stop();
        }

        let server = self.server.lock().ok().and_then(|mut s| s.take());
        if let Some(mut server) = server {
            server.shutdown().await;
        }
        debug!("dev session closed");
    }
}

/// The `serve` task.
#[derive(Debug, Clone)]
pub struct ServeTask {
    session: Arc<DevSession>,
    /// Directory served, joined onto the project root.
    root: PathBuf,
    addr: SocketAddr,
}

impl ServeTask {
    pub fn new(session: Arc<DevSession>, root: impl Into<PathBuf>, addr: SocketAddr) -> Self {
        Self {
            session,
            root: root.into(),
            addr,
        }
    }
}

impl SideEffect for ServeTask {
    fn run(&self) -> SideEffectFuture<'_> {
        Box::pin(async move {
            if self.session.is_serving() {
                debug!("dev server already running");
                return Ok(BuildResult::success());
            }

            let handle = DevServer::start(
                self.root.clone(),
                self.addr,
                self.session.broadcaster().clone(),
            )
            .await
            .map_err(|e| {
                TaskError::file_system(
                    &self.root,
                    format!("cannot serve on {}: {e}", self.addr),
                )
            })?;

            println!("Dev server running at {}", handle.url());
            if let Ok(mut slot) = self.session.server.lock() {
                *slot = Some(handle);
            }
            Ok(BuildResult::success())
        })
    }
}

/// The `watch` task.
#[derive(Debug, Clone)]
pub struct WatchTask {
    session: Arc<DevSession>,
    options: WatchOptions,
    bindings: Vec<WatchBinding>,
}

impl WatchTask {
    pub fn new(session: Arc<DevSession>, options: WatchOptions, bindings: Vec<WatchBinding>) -> Self {
        Self {
            session,
            options,
            bindings,
        }
    }
}

impl SideEffect for WatchTask {
    fn run(&self) -> SideEffectFuture<'_> {
        Box::pin(async move {
            if self.session.is_watching() {
                debug!("watchers already running");
                return Ok(BuildResult::success());
            }

            let options = self
                .options
                .clone()
                .broadcaster(self.session.broadcaster().clone());
            let handle = spawn_watcher(options, self.bindings.clone())
                .map_err(|e| TaskError::file_system(&self.options.root, format!("{e:#}")))?;

            info!(
                bindings = ?handle.bindings().collect::<Vec<_>>(),
                "watching for changes"
            );
            let rule = "=".repeat(66);
            println!("{rule}");
            println!("== Watch is running.");
            println!("== Changes are compiled automatically. Press Ctrl-C to stop.");
            println!("{rule}");

            if let Ok(mut slot) = self.session.watcher.lock() {
                *slot = Some(handle);
            }
            Ok(BuildResult::success())
        })
    }
}

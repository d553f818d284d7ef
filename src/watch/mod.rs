// src/watch/mod.rs

//! File watching and change detection.
//!
//! - Compiling include/exclude glob patterns ([`PatternSet`]).
//! - One cross-platform `notify` watcher per project, dispatching changed
//!   paths to the [`WatchBinding`]s whose patterns match.
//! - Per binding: trailing debounce, one run at a time, changes during a run
//!   coalesced into at most one follow-up run, reload broadcast on success.
//! - Optional content hashing to skip runs when nothing actually changed.
//!
//! It knows nothing about the task graph; a binding runs exactly one task.

pub mod binding;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod queue;
pub mod watcher;

pub use binding::{ReloadTarget, WatchBinding};
pub use hash::compute_hash_for_paths;
pub use patterns::{PatternSet, collect_matching_files, glob_base};
pub use queue::ChangeQueue;
pub use watcher::{WatchHandle, WatchOptions, spawn_watcher};

use std::sync::Arc;

use crate::task::Task;

/// Watch `patterns` under `options.root` and run `task` on every change.
pub fn watch(
    options: WatchOptions,
    patterns: PatternSet,
    task: Arc<Task>,
) -> anyhow::Result<WatchHandle> {
    let binding = WatchBinding::new(task.name().to_string(), patterns, task);
    spawn_watcher(options, vec![binding])
}

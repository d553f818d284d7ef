// src/task/mod.rs

//! Tasks: the units the runner schedules.
//!
//! A [`Task`] is stateless between invocations. [`Task::run`] never returns
//! an error: failures become diagnostics, the injected [`Notifier`] is told,
//! and a failed [`BuildResult`] comes back.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::errors::TaskError;
use crate::fs::FileSystem;
use crate::lint::Validator;
use crate::result::{Artifact, BuildResult};
use crate::transform::{SourceSpec, Transform, TransformInput, TransformOptions};
use crate::types::AssetClass;

pub mod notifier;
pub mod pipeline;

pub use notifier::{ConsoleNotifier, DesktopNotifier, Notification, Notifier};
pub use pipeline::Pipeline;

pub type SideEffectFuture<'a> =
    Pin<Box<dyn Future<Output = Result<BuildResult, TaskError>> + Send + 'a>>;

/// Work that is not a transform or a validation: clean, size report, server
/// and watcher start-up.
pub trait SideEffect: Send + Sync {
    fn run(&self) -> SideEffectFuture<'_>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Transform,
    Validate,
    Composite,
    SideEffect,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::Transform => "transform",
            TaskKind::Validate => "validate",
            TaskKind::Composite => "composite",
            TaskKind::SideEffect => "side-effect",
        };
        f.write_str(s)
    }
}

/// Collect sources, run one transform, write the outputs below `out_dir`.
#[derive(Clone)]
pub struct TransformStep {
    pub sources: SourceSpec,
    pub transform: Arc<dyn Transform>,
    pub options: TransformOptions,
    /// Output directory relative to the project root.
    pub out_dir: PathBuf,
}

/// Collect every watched source of a class and run one validator.
#[derive(Clone)]
pub struct ValidateStep {
    pub sources: SourceSpec,
    pub validator: Arc<dyn Validator>,
}

#[derive(Clone)]
pub enum TaskAction {
    Transform(TransformStep),
    Validate(ValidateStep),
    /// Validate, then transform if validation passed.
    Composite {
        validate: ValidateStep,
        transform: TransformStep,
    },
    SideEffect(Arc<dyn SideEffect>),
}

impl TaskAction {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskAction::Transform(_) => TaskKind::Transform,
            TaskAction::Validate(_) => TaskKind::Validate,
            TaskAction::Composite { .. } => TaskKind::Composite,
            TaskAction::SideEffect(_) => TaskKind::SideEffect,
        }
    }
}

/// Where a task reads and writes, and whom it tells about failures.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct Task {
    name: String,
    action: TaskAction,
    context: TaskContext,
    failure_message: Option<String>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

impl Task {
    pub fn new(name: impl Into<String>, action: TaskAction, context: TaskContext) -> Self {
        Self {
            name: name.into(),
            action,
            context,
            failure_message: None,
        }
    }

    /// Message shown by the notifier when this task fails.
    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TaskKind {
        self.action.kind()
    }

    /// Asset class this task compiles, if it is a transform.
    pub fn asset_class(&self) -> Option<AssetClass> {
        match &self.action {
            TaskAction::Transform(step) | TaskAction::Composite { transform: step, .. } => {
                Some(step.sources.class())
            }
            _ => None,
        }
    }

    /// Execute once. Never fails; see the module docs.
    pub async fn run(&self) -> BuildResult {
        let started = Instant::now();
        info!(task = %self.name, kind = %self.kind(), "task started");

        let result = match self.execute().await {
            Ok(result) => result,
            Err(err) => {
                error!(task = %self.name, error = %err, "task failed");
                BuildResult::failure(err.into_diagnostics(&self.name))
            }
        };

        if !result.succeeded {
            self.notify_failure(&result);
        }

        info!(
            task = %self.name,
            succeeded = result.succeeded,
            errors = result.error_count(),
            warnings = result.warning_count(),
            artifacts = result.artifacts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "task finished"
        );
        result
    }

    async fn execute(&self) -> Result<BuildResult, TaskError> {
        match &self.action {
            TaskAction::Transform(step) => self.run_transform(step).await,
            TaskAction::Validate(step) => self.run_validate(step).await,
            TaskAction::Composite {
                validate,
                transform,
            } => {
                // A failed validation returns early; the transform never runs.
                let mut result = self.run_validate(validate).await?;
                result.merge(self.run_transform(transform).await?);
                Ok(result)
            }
            TaskAction::SideEffect(effect) => effect.run().await,
        }
    }

    async fn run_validate(&self, step: &ValidateStep) -> Result<BuildResult, TaskError> {
        let ctx = &self.context;
        let sources = step.sources.collect_support(ctx.fs.as_ref(), &ctx.root)?;
        let outcome = step.validator.validate(&ctx.root, &sources).await?;

        for diag in &outcome.diagnostics {
            if diag.is_error() {
                error!(task = %self.name, "{diag}");
            } else {
                info!(task = %self.name, "{diag}");
            }
        }

        if !outcome.passed() {
            return Err(TaskError::Validation {
                diagnostics: outcome.diagnostics,
            });
        }
        Ok(BuildResult::success().with_diagnostics(outcome.diagnostics))
    }

    async fn run_transform(&self, step: &TransformStep) -> Result<BuildResult, TaskError> {
        let ctx = &self.context;
        let entries = step.sources.collect_entries(ctx.fs.as_ref(), &ctx.root)?;
        if entries.is_empty() {
            debug!(task = %self.name, "no sources matched");
            return Ok(BuildResult::success());
        }

        let support = if step.sources.class() == AssetClass::Markup {
            step.sources.collect_support(ctx.fs.as_ref(), &ctx.root)?
        } else {
            Vec::new()
        };

        let input = TransformInput {
            root: ctx.root.clone(),
            fs: Arc::clone(&ctx.fs),
            options: step.options.clone(),
            entries,
            support,
        };

        debug!(
            task = %self.name,
            transform = step.transform.name(),
            entries = input.entries.len(),
            "running transform"
        );
        let output = step.transform.transform(&input).await?;

        // Every entry compiled; only now touch the output directory.
        let mut artifacts = Vec::with_capacity(output.files.len());
        for file in output.files {
            let rel = step.out_dir.join(&file.path);
            ctx.fs
                .write(&ctx.root.join(&rel), &file.contents)
                .map_err(|e| TaskError::file_system(&rel, format!("{e:#}")))?;
            debug!(task = %self.name, path = %rel.display(), "wrote output");
            artifacts.push(Artifact::new(rel, file.contents.len() as u64));
        }

        Ok(BuildResult::success()
            .with_artifacts(artifacts)
            .with_diagnostics(output.diagnostics))
    }

    fn notify_failure(&self, result: &BuildResult) {
        let message = self
            .failure_message
            .clone()
            .unwrap_or_else(|| format!("Task '{}' failed.", self.name));

        let mut notification = Notification::new(&self.name, message);
        if let Some(first) = result.diagnostics.iter().find(|d| d.is_error()) {
            notification = notification.with_detail(first.to_string());
        }
        self.context.notifier.notify(&notification);
    }
}

/// All tasks of a pipeline, by name.
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    tasks: BTreeMap<String, Arc<Task>>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task: Task) -> Arc<Task> {
        let task = Arc::new(task);
        self.tasks.insert(task.name().to_string(), Arc::clone(&task));
        task
    }

    pub fn get(&self, name: &str) -> Option<Arc<Task>> {
        self.tasks.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }
}

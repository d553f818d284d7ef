#![allow(dead_code)]

//! Stand-ins for notifiers, side effects and transforms.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetdag::errors::TaskError;
use assetdag::fs::FileSystem;
use assetdag::fs::mock::MockFileSystem;
use assetdag::result::{Artifact, BuildResult};
use assetdag::task::{
    Notification, Notifier, SideEffect, SideEffectFuture, Task, TaskAction, TaskContext, TaskSet,
};
use assetdag::transform::{OutputFile, Transform, TransformFuture, TransformInput, TransformOutput};

/// Notifier that remembers every notification.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.seen.lock().unwrap().push(notification.clone());
    }
}

/// Ordered log shared between stubs, e.g. `["start:a", "end:a"]`.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.position(entry).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Succeed,
    Fail,
    Panic,
}

/// Side effect that logs `start:<name>` / `end:<name>`, optionally sleeps,
/// and then succeeds, fails or panics.
#[derive(Debug, Clone)]
pub struct StubEffect {
    name: String,
    log: EventLog,
    delay: Duration,
    behaviour: Behaviour,
    artifacts: Vec<Artifact>,
    runs: Arc<AtomicUsize>,
}

impl StubEffect {
    pub fn new(name: &str, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            delay: Duration::ZERO,
            behaviour: Behaviour::Succeed,
            artifacts: Vec::new(),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn failing(mut self) -> Self {
        self.behaviour = Behaviour::Fail;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.behaviour = Behaviour::Panic;
        self
    }

    pub fn with_artifact(mut self, path: &str, size: u64) -> Self {
        self.artifacts.push(Artifact::new(path, size));
        self
    }

    pub fn runs(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.runs)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl SideEffect for StubEffect {
    fn run(&self) -> SideEffectFuture<'_> {
        Box::pin(async move {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.log.push(format!("start:{}", self.name));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.log.push(format!("end:{}", self.name));

            match self.behaviour {
                Behaviour::Succeed => Ok(BuildResult::success().with_artifacts(self.artifacts.clone())),
                Behaviour::Fail => Err(TaskError::transform(format!("{} failed", self.name))),
                Behaviour::Panic => panic!("{} panicked", self.name),
            }
        })
    }
}

/// Context over an empty mock file system rooted at `.`.
pub fn mock_context(notifier: Arc<dyn Notifier>) -> TaskContext {
    TaskContext {
        root: PathBuf::from("."),
        fs: Arc::new(MockFileSystem::new()),
        notifier,
    }
}

pub fn stub_task(effect: StubEffect, context: &TaskContext) -> Task {
    let name = effect.name().to_string();
    Task::new(name, TaskAction::SideEffect(Arc::new(effect)), context.clone())
}

/// A task set made of stub side effects.
pub fn stub_tasks(effects: Vec<StubEffect>, notifier: Arc<dyn Notifier>) -> TaskSet {
    let context = mock_context(notifier);
    let mut tasks = TaskSet::new();
    for effect in effects {
        tasks.insert(stub_task(effect, &context));
    }
    tasks
}

/// Transform that copies entries through (or fails) and counts calls.
#[derive(Debug, Default)]
pub struct StubTransform {
    error: Option<String>,
    calls: AtomicUsize,
}

impl StubTransform {
    pub fn passthrough() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            error: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transform for StubTransform {
    fn name(&self) -> &str {
        "stub"
    }

    fn transform<'a>(&'a self, input: &'a TransformInput) -> TransformFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = &self.error {
                return Err(TaskError::transform(message.clone()));
            }
            Ok(TransformOutput {
                files: input
                    .entries
                    .iter()
                    .map(|e| OutputFile::new(e.output.clone(), e.contents.clone()))
                    .collect(),
                diagnostics: Vec::new(),
            })
        })
    }
}

/// Shared handle to a mock file system as the trait object tasks expect.
pub fn shared_fs(fs: &Arc<MockFileSystem>) -> Arc<dyn FileSystem> {
    Arc::clone(fs) as Arc<dyn FileSystem>
}

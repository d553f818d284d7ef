use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetdag::fs::FileSystem;
use assetdag::fs::mock::MockFileSystem;
use assetdag::lint::{LintRule, RuleLinter};
use assetdag::result::Severity;
use assetdag::task::{Task, TaskAction, TaskContext, TaskKind, TransformStep, ValidateStep};
use assetdag::transform::{SourceSpec, TransformOptions};
use assetdag::types::AssetClass;
use assetdag::watch::PatternSet;
use assetdag_test_utils::init_tracing;
use assetdag_test_utils::stubs::{RecordingNotifier, StubTransform, shared_fs};

fn assets_spec() -> SourceSpec {
    let patterns = PatternSet::new(&["src/assets/**/*".to_string()], &[]).unwrap();
    SourceSpec::new(AssetClass::Assets, patterns.clone(), patterns)
}

fn copy_task(
    fs: &Arc<MockFileSystem>,
    transform: Arc<StubTransform>,
    notifier: Arc<RecordingNotifier>,
) -> Task {
    let step = TransformStep {
        sources: assets_spec(),
        transform,
        options: TransformOptions::default(),
        out_dir: PathBuf::from("dist/assets"),
    };
    let context = TaskContext {
        root: PathBuf::from("."),
        fs: shared_fs(fs),
        notifier,
    };
    Task::new("copy", TaskAction::Transform(step), context)
        .with_failure_message("Copy failed, see console.")
}

#[tokio::test]
async fn transform_task_writes_outputs_below_out_dir() {
    init_tracing();

    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("./src/assets/robots.txt", "User-agent: *");
    fs.add_file("./src/assets/img/logo.svg", "<svg/>");

    let transform = StubTransform::passthrough();
    let notifier = RecordingNotifier::new();
    let task = copy_task(&fs, Arc::clone(&transform), notifier.clone());

    assert_eq!(task.kind(), TaskKind::Transform);
    assert_eq!(task.asset_class(), Some(AssetClass::Assets));

    let result = task.run().await;

    assert!(result.succeeded);
    assert_eq!(transform.calls(), 1);
    assert_eq!(result.artifacts.len(), 2);
    assert_eq!(
        fs.contents("./dist/assets/img/logo.svg").as_deref(),
        Some("<svg/>")
    );
    assert_eq!(
        fs.contents("./dist/assets/robots.txt").as_deref(),
        Some("User-agent: *")
    );
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn failed_transform_writes_nothing_and_notifies() {
    init_tracing();

    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("./src/assets/robots.txt", "User-agent: *");

    let notifier = RecordingNotifier::new();
    let task = copy_task(&fs, StubTransform::failing("disk on fire"), notifier.clone());

    let result = task.run().await;

    assert!(!result.succeeded);
    assert!(result.artifacts.is_empty());
    assert!(!fs.exists(Path::new("./dist")));

    let error = &result.diagnostics[0];
    assert!(error.is_error());
    assert_eq!(error.origin.as_deref(), Some("copy"));
    assert!(error.message.contains("disk on fire"));

    let seen = notifier.notifications();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].task, "copy");
    assert_eq!(seen[0].message, "Copy failed, see console.");
    assert!(seen[0].detail.as_deref().unwrap_or_default().contains("disk on fire"));
}

#[tokio::test]
async fn no_matching_sources_is_a_quiet_success() {
    init_tracing();

    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("./src/styles/main.css", "a{}");

    let transform = StubTransform::passthrough();
    let notifier = RecordingNotifier::new();
    let task = copy_task(&fs, Arc::clone(&transform), notifier.clone());

    let result = task.run().await;

    assert!(result.succeeded);
    assert!(result.artifacts.is_empty());
    assert_eq!(transform.calls(), 0);
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn failed_validation_keeps_every_finding() {
    init_tracing();

    let fs = Arc::new(MockFileSystem::new());
    fs.add_file(
        "./src/styles/main.css",
        "a { color: red !important; }\n.a-rather-long-selector-name { margin: 0; }\n",
    );

    let patterns = PatternSet::new(&["src/styles/**/*.css".to_string()], &[]).unwrap();
    let step = ValidateStep {
        sources: SourceSpec::new(AssetClass::Styles, patterns.clone(), patterns),
        validator: Arc::new(RuleLinter::new(
            "lint:css",
            vec![LintRule::NoImportant, LintRule::MaxLineLength],
            30,
        )),
    };
    let notifier = RecordingNotifier::new();
    let context = TaskContext {
        root: PathBuf::from("."),
        fs: shared_fs(&fs),
        notifier: notifier.clone(),
    };
    let task = Task::new("lint:css", TaskAction::Validate(step), context);

    let result = task.run().await;

    assert!(!result.succeeded);
    assert_eq!(result.error_count(), 1);
    assert_eq!(result.warning_count(), 1);

    let error = result.diagnostics.iter().find(|d| d.is_error()).unwrap();
    assert_eq!(error.origin.as_deref(), Some("no-important"));
    let warning = result
        .diagnostics
        .iter()
        .find(|d| d.severity == Severity::Warning)
        .unwrap();
    assert_eq!(warning.origin.as_deref(), Some("max-line-length"));

    let seen = notifier.notifications();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].detail.is_some());
}

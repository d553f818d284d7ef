//! End-to-end runs of the long-lived commands against a real project
//! directory.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use assetdag::engine::TaskStatus;
use assetdag::fs::RealFileSystem;
use assetdag::server::ReloadScope;
use assetdag::task::Pipeline;
use assetdag::types::BuildMode;
use assetdag::types::AssetClass;
use assetdag_test_utils::builders::{AssetSectionBuilder, ConfigFileBuilder};
use assetdag_test_utils::stubs::RecordingNotifier;
use assetdag_test_utils::{init_tracing, wait_until, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

struct Project {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().canonicalize().expect("canonicalize");

        let files = [
            ("src/templates/index.html", "<html><body><h1>Watch me</h1></body></html>\n"),
            ("src/styles/main.css", "body {\n  margin: 0;\n}\n"),
            ("src/js/app.js", "var answer = 42;\n"),
        ];
        for (rel, contents) in files {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            std::fs::write(path, contents).expect("write fixture");
        }

        Self { _dir: dir, root }
    }

    fn write(&self, rel: &str, contents: &str) {
        std::fs::write(self.root.join(rel), contents).expect("write");
    }

    fn read(&self, rel: &str) -> Option<String> {
        std::fs::read_to_string(self.root.join(rel)).ok()
    }

    fn pipeline(&self) -> (Pipeline, Arc<RecordingNotifier>) {
        self.pipeline_with(ConfigFileBuilder::new())
    }

    fn pipeline_with(&self, builder: ConfigFileBuilder) -> (Pipeline, Arc<RecordingNotifier>) {
        let config = builder
            .debounce_ms(50)
            .pipeline(BuildMode::Development, &self.root);
        let notifier = RecordingNotifier::new();
        let pipeline = Pipeline::new(config, Arc::new(RealFileSystem), notifier.clone())
            .expect("pipeline");
        (pipeline, notifier)
    }
}

async fn next_scope(rx: &mut broadcast::Receiver<ReloadScope>) -> Result<ReloadScope, Box<dyn Error>> {
    Ok(tokio::time::timeout(Duration::from_secs(3), rx.recv()).await??)
}

/// Skip reloads left over from earlier edits (editors and notify may report
/// one write as several events).
async fn scope_matching(
    rx: &mut broadcast::Receiver<ReloadScope>,
    wanted: impl Fn(&ReloadScope) -> bool,
) -> Result<ReloadScope, Box<dyn Error>> {
    loop {
        let scope = next_scope(rx).await?;
        if wanted(&scope) {
            return Ok(scope);
        }
    }
}

async fn http_body(addr: std::net::SocketAddr, path: &Path) -> Result<String, Box<dyn Error>> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = format!(
        "GET /{} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n",
        path.display()
    );
    stream.write_all(request.as_bytes()).await?;
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await?;
    Ok(raw.split_once("\r\n\r\n").map(|(_, b)| b.to_string()).unwrap_or_default())
}

#[tokio::test]
async fn start_builds_serves_and_hot_swaps_styles() -> TestResult {
    with_timeout(async {
        init_tracing();

        let project = Project::new();
        let (pipeline, notifier) = project.pipeline();
        let session = Arc::clone(pipeline.session());
        let mut reloads = session.broadcaster().subscribe();

        let report = pipeline.runner().execute(&pipeline.graph("start")?).await?;
        assert!(report.succeeded(), "start failed: {:?}", report.result.diagnostics);
        assert_eq!(report.status_of("watch"), Some(TaskStatus::Succeeded));
        assert!(session.is_serving());
        assert!(session.is_watching());

        assert!(project.read("dist/index.html").is_some());
        let addr = session.server_addr().expect("server address");
        let body = http_body(addr, Path::new("css/main.css")).await?;
        assert!(body.contains("margin: 0;"));

        project.write("src/styles/main.css", "body {\n  margin: 2px;\n}\n");

        let scope = next_scope(&mut reloads).await?;
        assert_eq!(
            scope,
            ReloadScope::Styles {
                paths: vec!["css/main.css".to_string()]
            }
        );
        assert!(project.read("dist/css/main.css").unwrap_or_default().contains("margin: 2px;"));
        let body = http_body(addr, Path::new("css/main.css")).await?;
        assert!(body.contains("margin: 2px;"));

        project.write("src/js/app.js", "var answer = 43;\n");
        scope_matching(&mut reloads, |s| *s == ReloadScope::FullPage).await?;
        assert!(project.read("dist/js/app.js").unwrap_or_default().contains("43"));

        assert_eq!(notifier.count(), 0);

        session.shutdown().await;
        assert!(!session.is_active());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn failed_rebuild_keeps_old_output_and_stays_quiet() -> TestResult {
    with_timeout(async {
        init_tracing();

        let project = Project::new();
        let (pipeline, notifier) = project.pipeline();
        let session = Arc::clone(pipeline.session());
        let mut reloads = session.broadcaster().subscribe();

        let report = pipeline.runner().execute(&pipeline.graph("dev")?).await?;
        assert!(report.succeeded());
        let before = project.read("dist/css/main.css").expect("css built");

        project.write("src/styles/main.css", "body {\n  margin: 0;\n");
        assert!(wait_until(|| notifier.count() >= 1).await);
        assert!(session.watch_runs("css") >= 1);

        assert_eq!(project.read("dist/css/main.css").as_deref(), Some(before.as_str()));
        assert!(matches!(
            reloads.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        // Fixing the file recovers without a restart.
        project.write("src/styles/main.css", "body {\n  margin: 1px;\n}\n");
        let scope = next_scope(&mut reloads).await?;
        assert!(matches!(scope, ReloadScope::Styles { .. }));

        session.shutdown().await;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn watch_without_build_serves_until_shutdown() -> TestResult {
    with_timeout(async {
        init_tracing();

        let project = Project::new();
        let (pipeline, _) = project.pipeline();
        let session = Arc::clone(pipeline.session());

        let report = pipeline.runner().execute(&pipeline.graph("watch")?).await?;
        assert_eq!(report.executed(), vec!["serve", "watch"]);
        assert!(session.is_active());

        // Writes into the output directory never trigger a rebuild.
        std::fs::create_dir_all(project.root.join("dist/css"))?;
        project.write("dist/css/stray.css", "a{}");
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(session.watch_runs("css"), 0);

        // A second start of the same services is a no-op.
        let again = pipeline.runner().execute(&pipeline.graph("watch")?).await?;
        assert!(again.succeeded());

        session.shutdown().await;
        assert!(!session.is_active());
        session.shutdown().await;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn dotted_output_dir_is_still_ignored_by_the_watcher() -> TestResult {
    with_timeout(async {
        init_tracing();

        let project = Project::new();
        // Style globs that also cover the output directory.
        let builder = ConfigFileBuilder::new().output_dir("./dist").asset(
            AssetClass::Styles,
            AssetSectionBuilder::new()
                .src("src/styles/*.css")
                .watch("**/*.css")
                .build(),
        );
        let (pipeline, _) = project.pipeline_with(builder);
        let session = Arc::clone(pipeline.session());

        let report = pipeline.runner().execute(&pipeline.graph("watch")?).await?;
        assert!(report.succeeded());

        std::fs::create_dir_all(project.root.join("dist/css"))?;
        project.write("dist/css/stray.css", "a{}");
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(session.watch_runs("css"), 0);

        project.write("src/styles/main.css", "body {\n  margin: 3px;\n}\n");
        assert!(wait_until(|| session.watch_runs("css") >= 1).await);
        assert!(wait_until(|| {
            project.read("dist/css/main.css").unwrap_or_default().contains("margin: 3px;")
        })
        .await);

        // The rebuild wrote into dist; that must not keep scheduling runs.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let settled = session.watch_runs("css");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(session.watch_runs("css"), settled);

        session.shutdown().await;
        Ok(())
    })
    .await
}

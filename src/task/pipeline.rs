// src/task/pipeline.rs

//! The named tasks and command graphs of the asset pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::clean::CleanTask;
use crate::config::PipelineConfig;
use crate::dag::TaskGraph;
use crate::engine::Runner;
use crate::errors::{AssetdagError, Result, TaskError};
use crate::fs::FileSystem;
use crate::lint::{CommandValidator, RuleLinter, Validator};
use crate::report::{SizeReport, SizeTarget};
use crate::result::BuildResult;
use crate::session::{DevSession, ServeTask, WatchTask};
use crate::task::{
    Notifier, SideEffect, SideEffectFuture, Task, TaskAction, TaskContext, TaskSet,
    TransformStep, ValidateStep,
};
use crate::transform::{self, SourceSpec, TransformOptions};
use crate::types::AssetClass;
use crate::watch::{PatternSet, ReloadTarget, WatchBinding, WatchOptions};

pub const MSG_HTML: &str = "Error compiling HTML. Please double check your code.";
pub const MSG_CSS: &str = "Error compiling CSS. Please double check your code.";
pub const MSG_JS: &str = "Error compiling JS. Please double check your code.";
pub const MSG_ASSETS: &str = "Error copying assets. Please double check your files.";

/// Task name of each compiled asset class.
pub fn task_name(class: AssetClass) -> &'static str {
    match class {
        AssetClass::Markup => "html",
        AssetClass::Styles => "css",
        AssetClass::Scripts => "js",
        AssetClass::Assets => "assets",
    }
}

/// The CLI commands and their graphs, in `--tasks` order.
pub fn command_graphs() -> Vec<(&'static str, TaskGraph)> {
    use TaskGraph as G;

    let compile_all = || G::parallel([G::task("html"), G::task("js"), G::task("css")]);
    let start = || {
        G::series([
            G::task("clean"),
            compile_all(),
            G::task("size-report"),
            G::task("serve"),
            G::task("watch"),
        ])
    };

    vec![
        ("default", G::task("info")),
        ("lint", G::parallel([G::task("lint:js"), G::task("lint:css")])),
        ("compile:html", G::series([G::task("html")])),
        (
            "compile:css",
            G::series([G::task("css"), G::task("size-report:css")]),
        ),
        (
            "compile:js",
            G::series([G::task("js"), G::task("size-report:js")]),
        ),
        ("compile:assets", G::series([G::task("assets")])),
        (
            "build",
            G::series([G::task("clean"), compile_all(), G::task("size-report")]),
        ),
        ("server", G::series([G::task("serve")])),
        ("watch", G::series([G::task("serve"), G::task("watch")])),
        ("start", start()),
        ("dev", start()),
    ]
}

/// Every task of the pipeline plus the command graphs over them.
///
/// Built once from the immutable [`PipelineConfig`]; the file system and
/// the notifier are injected so tests can swap them.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    tasks: TaskSet,
    commands: Vec<(&'static str, TaskGraph)>,
    session: Arc<DevSession>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("tasks", &self.tasks.names().collect::<Vec<_>>())
            .field("mode", &self.config.mode())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        fs: Arc<dyn FileSystem>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let session = Arc::new(DevSession::new());
        let commands = command_graphs();
        let context = TaskContext {
            root: config.root().to_path_buf(),
            fs: Arc::clone(&fs),
            notifier,
        };

        let mut tasks = TaskSet::new();

        tasks.insert(Task::new(
            "info",
            side_effect(InfoTask::new(&config, &commands)),
            context.clone(),
        ));
        tasks.insert(Task::new(
            "clean",
            side_effect(CleanTask::new(Arc::clone(&fs), config.output_path())),
            context.clone(),
        ));

        let html = tasks.insert(
            Task::new(
                task_name(AssetClass::Markup),
                TaskAction::Transform(transform_step(&config, AssetClass::Markup)?),
                context.clone(),
            )
            .with_failure_message(MSG_HTML),
        );
        let css = tasks.insert(
            Task::new(
                task_name(AssetClass::Styles),
                TaskAction::Composite {
                    validate: validate_step(&config, AssetClass::Styles)?,
                    transform: transform_step(&config, AssetClass::Styles)?,
                },
                context.clone(),
            )
            .with_failure_message(MSG_CSS),
        );
        let js = tasks.insert(
            Task::new(
                task_name(AssetClass::Scripts),
                TaskAction::Composite {
                    validate: validate_step(&config, AssetClass::Scripts)?,
                    transform: transform_step(&config, AssetClass::Scripts)?,
                },
                context.clone(),
            )
            .with_failure_message(MSG_JS),
        );
        let assets = tasks.insert(
            Task::new(
                task_name(AssetClass::Assets),
                TaskAction::Transform(transform_step(&config, AssetClass::Assets)?),
                context.clone(),
            )
            .with_failure_message(MSG_ASSETS),
        );

        tasks.insert(
            Task::new(
                "lint:js",
                TaskAction::Validate(validate_step(&config, AssetClass::Scripts)?),
                context.clone(),
            )
            .with_failure_message(MSG_JS),
        );
        tasks.insert(
            Task::new(
                "lint:css",
                TaskAction::Validate(validate_step(&config, AssetClass::Styles)?),
                context.clone(),
            )
            .with_failure_message(MSG_CSS),
        );

        let styles_out = PathBuf::from(&config.asset(AssetClass::Styles).out_dir);
        let scripts_out = PathBuf::from(&config.asset(AssetClass::Scripts).out_dir);
        let report = |targets: Vec<SizeTarget>| {
            side_effect(SizeReport::new(Arc::clone(&fs), config.root(), targets))
        };
        tasks.insert(Task::new(
            "size-report",
            report(vec![
                SizeTarget::new(scripts_out.clone(), &["js"]),
                SizeTarget::new(styles_out.clone(), &["css"]),
            ]),
            context.clone(),
        ));
        tasks.insert(Task::new(
            "size-report:css",
            report(vec![SizeTarget::new(styles_out, &["css"])]),
            context.clone(),
        ));
        tasks.insert(Task::new(
            "size-report:js",
            report(vec![SizeTarget::new(scripts_out, &["js"])]),
            context.clone(),
        ));

        tasks.insert(Task::new(
            "serve",
            side_effect(ServeTask::new(
                Arc::clone(&session),
                config.output_path(),
                config.server_addr(),
            )),
            context.clone(),
        ));

        let output_dir = config.output_dir().to_string_lossy().replace('\\', "/");
        let mut bindings = Vec::new();
        for (task, reload) in [
            (html, ReloadTarget::FullPage),
            (
                css,
                ReloadTarget::Styles {
                    served_dir: config.output_dir().to_path_buf(),
                },
            ),
            (js, ReloadTarget::FullPage),
            (assets, ReloadTarget::FullPage),
        ] {
            let Some(class) = task.asset_class() else {
                continue;
            };
            let settings = config.asset(class);
            let patterns = PatternSet::new(&settings.watch, &settings.exclude)?;
            bindings.push(
                WatchBinding::new(task.name().to_string(), patterns, task)
                    .with_reload(reload)
                    .with_hash(settings.use_hash),
            );
        }
        let watch_options = WatchOptions::new(config.root(), Arc::clone(&fs), config.debounce())
            .ignore(output_dir);
        tasks.insert(Task::new(
            "watch",
            side_effect(WatchTask::new(Arc::clone(&session), watch_options, bindings)),
            context,
        ));

        debug!(tasks = ?tasks.names().collect::<Vec<_>>(), "pipeline assembled");

        Ok(Self {
            config,
            tasks,
            commands,
            session,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    pub fn session(&self) -> &Arc<DevSession> {
        &self.session
    }

    pub fn commands(&self) -> &[(&'static str, TaskGraph)] {
        &self.commands
    }

    pub fn runner(&self) -> Runner {
        Runner::new(self.tasks.clone())
    }

    /// Graph for a CLI name: a command, else a single task.
    pub fn graph(&self, name: &str) -> Result<TaskGraph> {
        if let Some((_, graph)) = self.commands.iter().find(|(n, _)| *n == name) {
            return Ok(graph.clone());
        }
        if self.tasks.contains(name) {
            return Ok(TaskGraph::task(name));
        }
        Err(AssetdagError::UnknownTask(name.to_string()))
    }

    /// The `--tasks` listing.
    pub fn describe_commands(&self) -> String {
        let mut out = String::new();
        for (name, graph) in &self.commands {
            out.push_str(&format!("{name}\n"));
            for line in graph.render_tree().lines() {
                out.push_str(&format!("  {line}\n"));
            }
        }
        out
    }
}

fn side_effect(effect: impl SideEffect + 'static) -> TaskAction {
    TaskAction::SideEffect(Arc::new(effect))
}

fn transform_step(config: &PipelineConfig, class: AssetClass) -> Result<TransformStep> {
    let settings = config.asset(class);
    Ok(TransformStep {
        sources: SourceSpec::from_settings(settings)?,
        transform: transform::for_settings(settings),
        options: TransformOptions::from_settings(settings, config.mode()),
        out_dir: PathBuf::from(&settings.out_dir),
    })
}

fn validate_step(config: &PipelineConfig, class: AssetClass) -> Result<ValidateStep> {
    let settings = config.asset(class);
    let name = format!("lint:{}", task_name(class));
    let validator: Arc<dyn Validator> = match config.lint(class) {
        Some(lint) => match &lint.cmd {
            Some(cmd) => Arc::new(CommandValidator::new(name, cmd)),
            None => Arc::new(RuleLinter::from_settings(name, lint)),
        },
        None => Arc::new(RuleLinter::new(name, Vec::new(), usize::MAX)),
    };

    Ok(ValidateStep {
        sources: SourceSpec::from_settings(settings)?,
        validator,
    })
}

/// The `info` task: active configuration and a usage hint.
#[derive(Debug, Clone)]
struct InfoTask {
    text: String,
}

impl InfoTask {
    fn new(config: &PipelineConfig, commands: &[(&'static str, TaskGraph)]) -> Self {
        let names: Vec<&str> = commands.iter().map(|(n, _)| *n).collect();
        let rule = "=".repeat(47);
        let text = format!(
            "{}\n{rule}\n== Please use command \"assetdag --tasks\".\n== Commands: {}\n{rule}\n",
            config.describe().trim_end(),
            names.join(", ")
        );
        Self { text }
    }
}

impl SideEffect for InfoTask {
    fn run(&self) -> SideEffectFuture<'_> {
        Box::pin(async move {
            print!("{}", self.text);
            Ok::<_, TaskError>(BuildResult::success())
        })
    }
}

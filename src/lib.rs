// src/lib.rs

pub mod clean;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod lint;
pub mod logging;
pub mod report;
pub mod result;
pub mod server;
pub mod session;
pub mod task;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{DotEnv, PipelineConfig, default_config_path, load_or_default};
use crate::dag::TaskGraph;
use crate::engine::{RunReport, TaskStatus};
use crate::errors::AssetdagError;
use crate::fs::RealFileSystem;
use crate::task::{ConsoleNotifier, DesktopNotifier, Notifier, Pipeline};
use crate::types::{BuildMode, MODE_ENV_VAR};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the build mode from the environment or `.env`
/// - the pipeline (tasks + command graphs)
/// - the runner for the requested command
/// - Ctrl-C handling while a dev server or watchers are up
pub async fn run(args: CliArgs) -> Result<()> {
    let (config_path, explicit) = match &args.config {
        Some(path) => (PathBuf::from(path), true),
        None => (default_config_path(), false),
    };
    let cfg = load_or_default(&config_path, explicit)?;
    let root = config_root_dir(&config_path);
    let dotenv = DotEnv::load(&root)?;
    let mode = BuildMode::from_env_value(dotenv.var(MODE_ENV_VAR).as_deref());
    info!(mode = %mode, root = %root.display(), "configuration loaded");

    let config = PipelineConfig::new(cfg, mode, root, args.port)?;
    let notifier: Arc<dyn Notifier> = if config.desktop_notifications() {
        Arc::new(DesktopNotifier::default())
    } else {
        Arc::new(ConsoleNotifier)
    };
    let pipeline = Pipeline::new(config, Arc::new(RealFileSystem), notifier)?;

    if args.tasks {
        print!("{}", pipeline.describe_commands());
        return Ok(());
    }

    let graph = pipeline.graph(&args.task)?;

    if args.dry_run {
        print_dry_run(&pipeline, &args.task, &graph)?;
        return Ok(());
    }

    let report = pipeline.runner().execute(&graph).await?;
    print_summary(&args.task, &report);

    let session = pipeline.session();
    if !report.succeeded() {
        session.shutdown().await;
        return Err(AssetdagError::BuildFailed(format!(
            "'{}' finished with {} error(s)",
            args.task,
            report.result.error_count()
        ))
        .into());
    }

    if session.is_active() {
        info!("running; press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
        info!("shutting down");
        session.shutdown().await;
    }

    Ok(())
}

/// Figure out the project root.
///
/// - If the config path has a non-empty parent (e.g. "site/Assetdag.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetdag.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print the compiled graph of `name` without executing it.
fn print_dry_run(pipeline: &Pipeline, name: &str, graph: &TaskGraph) -> Result<()> {
    let dag = pipeline.runner().compile(graph)?;

    println!("assetdag dry-run: {name}");
    println!("  mode  = {}", pipeline.config().mode());
    println!("  graph = {graph}");
    println!();

    println!("execution order:");
    for (i, task) in dag.execution_order()?.iter().enumerate() {
        let deps = dag.dependencies_of(task);
        if deps.is_empty() {
            println!("  {}. {task}", i + 1);
        } else {
            println!("  {}. {task} (after {})", i + 1, deps.join(", "));
        }
    }

    println!();
    println!("stages:");
    for (i, stage) in dag.stages()?.iter().enumerate() {
        println!("  {}: {}", i + 1, stage.join(" | "));
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn print_summary(name: &str, report: &RunReport) {
    println!();
    for task in &report.tasks {
        let marker = match task.status {
            TaskStatus::Succeeded => "ok",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Skipped => "skipped",
        };
        println!("  {marker:>7}  {}", task.name);
        if let Some(result) = &task.result {
            for diag in result.diagnostics.iter().filter(|d| d.is_error()) {
                println!("           {diag}");
            }
        }
    }

    let result = &report.result;
    println!(
        "{name}: {} ({} error(s), {} warning(s))",
        if result.succeeded { "done" } else { "failed" },
        result.error_count(),
        result.warning_count()
    );
}

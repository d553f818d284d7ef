// src/report.rs

//! Bundle size report: raw and gzipped size of every stylesheet and script
//! in the output directory.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::debug;

use crate::errors::TaskError;
use crate::fs::FileSystem;
use crate::result::{Artifact, BuildResult};
use crate::task::{SideEffect, SideEffectFuture};

/// One directory to measure, with the file extensions to include.
#[derive(Debug, Clone)]
pub struct SizeTarget {
    /// Relative to the project root.
    pub dir: PathBuf,
    pub extensions: Vec<&'static str>,
}

impl SizeTarget {
    pub fn new(dir: impl Into<PathBuf>, extensions: &[&'static str]) -> Self {
        Self {
            dir: dir.into(),
            extensions: extensions.to_vec(),
        }
    }
}

pub fn gzip_size(bytes: &[u8]) -> Result<u64> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?.len() as u64)
}

/// Measure every matching file below the targets, sorted by path.
/// Missing directories contribute nothing.
pub fn measure(fs: &dyn FileSystem, root: &Path, targets: &[SizeTarget]) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();

    for target in targets {
        let start = root.join(&target.dir);
        if !fs.is_dir(&start) {
            debug!(dir = %target.dir.display(), "size report: directory missing");
            continue;
        }

        let mut stack = vec![start];
        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                    continue;
                }
                let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                let mut artifact = Artifact::new(rel, 0);
                if !target.extensions.iter().any(|ext| artifact.has_extension(ext)) {
                    continue;
                }
                let bytes = fs.read(&path)?;
                artifact.size = bytes.len() as u64;
                artifact.gzip_size = Some(
                    gzip_size(&bytes).with_context(|| format!("compressing {}", path.display()))?,
                );
                artifacts.push(artifact);
            }
        }
    }

    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    artifacts.dedup_by(|a, b| a.path == b.path);
    Ok(artifacts)
}

pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else {
        format!("{:.2} kB", bytes as f64 / 1024.0)
    }
}

/// Render the report table, with a total row when there is more than one
/// file.
pub fn render_table(artifacts: &[Artifact]) -> String {
    if artifacts.is_empty() {
        return "No files to report.\n".to_string();
    }

    let width = artifacts
        .iter()
        .map(|a| a.path.to_string_lossy().len())
        .max()
        .unwrap_or(0)
        .max("File".len());

    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  {:>12}  {:>12}", "File", "Size", "Gzipped");
    let mut total = 0;
    let mut total_gzip = 0;
    for a in artifacts {
        let gz = a.gzip_size.unwrap_or(0);
        total += a.size;
        total_gzip += gz;
        let _ = writeln!(
            out,
            "{:<width$}  {:>12}  {:>12}",
            a.path.to_string_lossy(),
            format_size(a.size),
            format_size(gz)
        );
    }
    if artifacts.len() > 1 {
        let _ = writeln!(
            out,
            "{:<width$}  {:>12}  {:>12}",
            "Total",
            format_size(total),
            format_size(total_gzip)
        );
    }
    out
}

/// The `size-report` family of tasks. Prints the table on stdout.
#[derive(Debug, Clone)]
pub struct SizeReport {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    targets: Vec<SizeTarget>,
}

impl SizeReport {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>, targets: Vec<SizeTarget>) -> Self {
        Self {
            fs,
            root: root.into(),
            targets,
        }
    }
}

impl SideEffect for SizeReport {
    fn run(&self) -> SideEffectFuture<'_> {
        Box::pin(async move {
            let artifacts = measure(self.fs.as_ref(), &self.root, &self.targets)
                .map_err(|e| TaskError::file_system(&self.root, format!("{e:#}")))?;
            print!("{}", render_table(&artifacts));
            Ok(BuildResult::success().with_artifacts(artifacts))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn measures_only_requested_extensions() {
        let fs = MockFileSystem::new();
        fs.add_file("./dist/css/main.css", "a{color:red}");
        fs.add_file("./dist/js/app.js", "var a=1;");
        fs.add_file("./dist/index.html", "<p>");

        let artifacts = measure(
            &fs,
            Path::new("."),
            &[SizeTarget::new("dist", &["css", "js"])],
        )
        .unwrap();

        let paths: Vec<_> = artifacts.iter().map(|a| a.path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("dist/css/main.css"), PathBuf::from("dist/js/app.js")]
        );
        assert_eq!(artifacts[0].size, 12);
        assert!(artifacts[0].gzip_size.is_some());
    }

    #[test]
    fn missing_directory_reports_nothing() {
        let fs = MockFileSystem::new();
        let artifacts = measure(&fs, Path::new("."), &[SizeTarget::new("dist/css", &["css"])]).unwrap();
        assert!(artifacts.is_empty());
        assert_eq!(render_table(&artifacts), "No files to report.\n");
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 kB");
    }
}

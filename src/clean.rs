// src/clean.rs

//! Removal of the output directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::errors::{AssetdagError, Result, TaskError};
use crate::fs::FileSystem;
use crate::result::BuildResult;
use crate::task::{SideEffect, SideEffectFuture};

/// Recursively delete `output_dir`.
///
/// A missing directory is a successful no-op. Returns whether anything was
/// removed.
pub fn clean(fs: &dyn FileSystem, output_dir: &Path) -> Result<bool> {
    let existed = fs.exists(output_dir);
    fs.remove_dir_all(output_dir)
        .map_err(|e| AssetdagError::FileSystem {
            path: output_dir.to_path_buf(),
            message: format!("{e:#}"),
        })?;

    if existed {
        info!(path = %output_dir.display(), "removed output directory");
    } else {
        info!(path = %output_dir.display(), "output directory already absent");
    }
    Ok(existed)
}

/// The `clean` task.
#[derive(Debug, Clone)]
pub struct CleanTask {
    fs: Arc<dyn FileSystem>,
    output_path: PathBuf,
}

impl CleanTask {
    /// `output_path` is the output directory joined onto the project root.
    pub fn new(fs: Arc<dyn FileSystem>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            output_path: output_path.into(),
        }
    }
}

impl SideEffect for CleanTask {
    fn run(&self) -> SideEffectFuture<'_> {
        Box::pin(async move {
            clean(self.fs.as_ref(), &self.output_path).map_err(TaskError::from)?;
            Ok(BuildResult::success())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn clean_is_idempotent() {
        let fs = MockFileSystem::new();
        fs.add_file("./dist/css/main.css", "a{}");
        fs.add_file("./src/styles/main.css", "a{}");

        assert!(clean(&fs, Path::new("./dist")).unwrap());
        assert!(!fs.exists(Path::new("./dist/css/main.css")));
        assert!(fs.exists(Path::new("./src/styles/main.css")));

        assert!(!clean(&fs, Path::new("./dist")).unwrap());
    }
}

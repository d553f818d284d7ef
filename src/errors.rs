// src/errors.rs

//! Crate-wide error types.
//!
//! - [`AssetdagError`] covers failures of the tool itself (configuration,
//!   unknown task names, fatal file-system errors). These end the command.
//! - [`TaskError`] is the taxonomy used at the task boundary. A task never
//!   propagates one of these; it converts it into a diagnostic instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::result::{Diagnostic, Location, Severity};

#[derive(Error, Debug)]
pub enum AssetdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("File system error at {}: {message}", path.display())]
    FileSystem { path: PathBuf, message: String },

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Invalid task graph: {0}")]
    InvalidGraph(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetdagError>;

/// Failure of a single task body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Syntax / compile failure inside a transform.
    #[error("{message}")]
    Transform {
        message: String,
        location: Option<Location>,
    },

    /// One or more lint rules reported errors. Carries every finding of the
    /// run, warnings included.
    #[error("validation failed with {} error(s)", count_errors(.diagnostics))]
    Validation { diagnostics: Vec<Diagnostic> },

    /// Reading sources or writing outputs failed.
    #[error("file system error at {}: {message}", path.display())]
    FileSystem { path: PathBuf, message: String },
}

impl TaskError {
    pub fn transform(message: impl Into<String>) -> Self {
        TaskError::Transform {
            message: message.into(),
            location: None,
        }
    }

    pub fn transform_at(message: impl Into<String>, location: Location) -> Self {
        TaskError::Transform {
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn file_system(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        TaskError::FileSystem {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Diagnostics describing this failure.
    ///
    /// A validation failure hands back the findings it carries (already
    /// attributed to their rules); anything else becomes one error
    /// attributed to `origin`.
    pub fn into_diagnostics(self, origin: &str) -> Vec<Diagnostic> {
        let location = match &self {
            TaskError::Validation { diagnostics } => return diagnostics.clone(),
            TaskError::Transform { location, .. } => location.clone(),
            TaskError::FileSystem { path, .. } => Some(Location::file(path.clone())),
        };

        vec![Diagnostic {
            severity: Severity::Error,
            message: self.to_string(),
            location,
            origin: Some(origin.to_string()),
        }]
    }
}

fn count_errors(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

impl From<AssetdagError> for TaskError {
    fn from(err: AssetdagError) -> Self {
        match err {
            AssetdagError::FileSystem { path, message } => TaskError::FileSystem { path, message },
            other => TaskError::transform(other.to_string()),
        }
    }
}

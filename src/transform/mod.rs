// src/transform/mod.rs

//! Transforms: pure-ish functions from source files to output files.
//!
//! A [`Transform`] receives the collected entries of one asset class and
//! returns the files to write. It never writes to the output directory
//! itself; the owning task writes all outputs once every entry compiled, so
//! a failing rebuild leaves the previous output untouched.
//!
//! Built-ins:
//! - [`markup::MarkupTransform`] renders `tera` templates.
//! - [`styles::StyleTransform`] inlines `@import`s and compresses in
//!   production.
//! - [`scripts::ScriptTransform`] expands `//= require` directives and
//!   minifies in production.
//! - [`assets::AssetCopy`] copies bytes.
//! - [`command::CommandTransform`] pipes each entry through a shell command.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use crate::config::AssetSettings;
use crate::errors::TaskError;
use crate::fs::FileSystem;
use crate::result::{Diagnostic, Location};
use crate::types::{AssetClass, BuildMode};

pub mod assets;
pub mod command;
pub mod include;
pub mod markup;
pub mod minify;
pub mod scripts;
pub mod sources;
pub mod styles;

pub use assets::AssetCopy;
pub use command::CommandTransform;
pub use markup::MarkupTransform;
pub use scripts::ScriptTransform;
pub use sources::SourceSpec;
pub use styles::StyleTransform;

/// A file read from the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the project root, e.g. `src/styles/main.css`.
    pub path: PathBuf,
    /// Path of the corresponding output, relative to the class output
    /// directory, e.g. `main.css`.
    pub output: PathBuf,
    pub contents: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, output: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            output: output.into(),
            contents: contents.into(),
        }
    }

    pub fn text(&self) -> Result<&str, TaskError> {
        std::str::from_utf8(&self.contents).map_err(|e| {
            TaskError::transform_at(format!("not valid UTF-8: {e}"), Location::file(&self.path))
        })
    }
}

/// A file to be written below the class output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl OutputFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub mode: BuildMode,
    /// Include search paths relative to the project root.
    pub include_paths: Vec<PathBuf>,
    /// Missing includes are errors (otherwise warnings).
    pub hard_fail: bool,
    pub minify_cmd: Option<String>,
    /// Filter applied to each compiled stylesheet before minification.
    pub postprocess_cmd: Option<String>,
}

impl TransformOptions {
    pub fn from_settings(settings: &AssetSettings, mode: BuildMode) -> Self {
        Self {
            mode,
            include_paths: settings.include_paths.iter().map(PathBuf::from).collect(),
            hard_fail: settings.hard_fail,
            minify_cmd: settings.minify_cmd.clone(),
            postprocess_cmd: settings.postprocess_cmd.clone(),
        }
    }
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            mode: BuildMode::Development,
            include_paths: Vec::new(),
            hard_fail: true,
            minify_cmd: None,
            postprocess_cmd: None,
        }
    }
}

/// Everything a transform may look at.
#[derive(Debug, Clone)]
pub struct TransformInput {
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub options: TransformOptions,
    /// Files to compile, one output each. Partials are never entries.
    pub entries: Vec<SourceFile>,
    /// Other watched files entries may pull in (templates for markup).
    pub support: Vec<SourceFile>,
}

impl TransformInput {
    /// Read a file given relative to the project root.
    pub fn read_to_string(&self, rel: &Path) -> Result<String, TaskError> {
        self.fs
            .read_to_string(&self.root.join(rel))
            .map_err(|e| TaskError::file_system(rel, format!("{e:#}")))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformOutput {
    pub files: Vec<OutputFile>,
    /// Non-fatal findings, e.g. a missing soft include.
    pub diagnostics: Vec<Diagnostic>,
}

pub type TransformFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TransformOutput, TaskError>> + Send + 'a>>;

pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    /// Compile every entry of `input`. The first failing entry fails the
    /// whole transform.
    fn transform<'a>(&'a self, input: &'a TransformInput) -> TransformFuture<'a>;
}

/// The transform configured for an asset class: its `cmd` if set, else the
/// built-in.
pub fn for_settings(settings: &AssetSettings) -> Arc<dyn Transform> {
    if let Some(cmd) = &settings.cmd {
        return Arc::new(CommandTransform::new(settings.class.name(), cmd));
    }

    match settings.class {
        AssetClass::Markup => Arc::new(MarkupTransform),
        AssetClass::Styles => Arc::new(StyleTransform),
        AssetClass::Scripts => Arc::new(ScriptTransform),
        AssetClass::Assets => Arc::new(AssetCopy),
    }
}

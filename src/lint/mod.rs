// src/lint/mod.rs

//! Validators: lint-like checks that produce diagnostics and never write
//! output.
//!
//! - [`RuleLinter`] runs the built-in line rules from [`rules`].
//! - [`command::CommandValidator`] delegates to an external linter.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use tracing::debug;

use crate::config::LintSettings;
use crate::errors::TaskError;
use crate::result::{Diagnostic, Location};
use crate::transform::SourceFile;

pub mod command;
pub mod rules;

pub use command::CommandValidator;
pub use rules::{Finding, LintRule};

/// Diagnostics produced by one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Validation passes iff there is no error-severity diagnostic.
    pub fn passed(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }
}

pub type ValidateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ValidationResult, TaskError>> + Send + 'a>>;

/// Checks a set of source files.
///
/// An `Err` means the validator itself could not run (e.g. the external
/// linter is missing); rule violations are reported in the
/// [`ValidationResult`].
pub trait Validator: Send + Sync {
    fn name(&self) -> &str;

    fn validate<'a>(&'a self, root: &'a Path, sources: &'a [SourceFile]) -> ValidateFuture<'a>;
}

/// Validator backed by the built-in [`LintRule`]s.
#[derive(Debug, Clone)]
pub struct RuleLinter {
    name: String,
    rules: Vec<LintRule>,
    max_line_length: usize,
}

impl RuleLinter {
    pub fn new(name: impl Into<String>, rules: Vec<LintRule>, max_line_length: usize) -> Self {
        Self {
            name: name.into(),
            rules,
            max_line_length,
        }
    }

    pub fn from_settings(name: impl Into<String>, settings: &LintSettings) -> Self {
        Self::new(name, settings.rules.clone(), settings.max_line_length)
    }

    /// Lint a single file's text. Diagnostics are ordered by line.
    pub fn lint_text(&self, path: &Path, text: &str) -> Vec<Diagnostic> {
        let mut findings: Vec<Finding> = self
            .rules
            .iter()
            .flat_map(|rule| rule.check(text, self.max_line_length))
            .collect();
        findings.sort_by_key(|f| (f.line, f.column));

        findings
            .into_iter()
            .map(|f| Diagnostic {
                severity: f.rule.severity(),
                message: f.message,
                location: Some(Location::at(path, f.line, f.column)),
                origin: Some(f.rule.name().to_string()),
            })
            .collect()
    }
}

impl Validator for RuleLinter {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate<'a>(&'a self, _root: &'a Path, sources: &'a [SourceFile]) -> ValidateFuture<'a> {
        Box::pin(async move {
            let mut result = ValidationResult::default();
            for source in sources {
                let text = source.text()?;
                result.diagnostics.extend(self.lint_text(&source.path, text));
            }
            debug!(
                validator = %self.name,
                files = sources.len(),
                diagnostics = result.diagnostics.len(),
                "lint finished"
            );
            Ok(result)
        })
    }
}

// src/lint/command.rs

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::TaskError;
use crate::exec::command::ShellCommand;
use crate::lint::{ValidateFuture, ValidationResult, Validator};
use crate::result::{Diagnostic, Location};
use crate::transform::SourceFile;

/// `path:line:col: message`, the "unix" format most linters can emit.
static UNIX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<path>[^:\s][^:]*):(?P<line>\d+):(?P<col>\d+):\s*(?P<msg>.+)$")
        .expect("valid regex")
});

/// Validator that runs an external linter over the source paths.
///
/// A non-zero exit status fails validation. Output lines in the form
/// `path:line:col: message` become located diagnostics; if the command fails
/// without printing any, its stderr is reported instead.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    name: String,
    cmd: String,
}

impl CommandValidator {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
        }
    }
}

impl Validator for CommandValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate<'a>(&'a self, root: &'a Path, sources: &'a [SourceFile]) -> ValidateFuture<'a> {
        Box::pin(async move {
            if sources.is_empty() {
                return Ok(ValidationResult::default());
            }

            let mut command = ShellCommand::new(&self.cmd);
            for source in sources {
                command = command.arg(source.path.to_string_lossy());
            }

            let output = command
                .run(root)
                .await
                .map_err(|e| TaskError::transform(format!("{}: {e:#}", self.name)))?;

            let mut diagnostics = parse_unix_output(&output.stdout, output.success);

            if !output.success && !diagnostics.iter().any(Diagnostic::is_error) {
                let detail = output.stderr.trim();
                let message = if detail.is_empty() {
                    format!("'{}' exited with status {}", self.cmd, output.code)
                } else {
                    format!("'{}' exited with status {}: {detail}", self.cmd, output.code)
                };
                diagnostics.push(Diagnostic::error(message).from_origin(&self.name));
            }

            Ok(ValidationResult { diagnostics })
        })
    }
}

/// Parse `path:line:col: message` lines. Findings are errors when the linter
/// failed and warnings otherwise.
pub fn parse_unix_output(stdout: &str, success: bool) -> Vec<Diagnostic> {
    stdout
        .lines()
        .filter_map(|line| UNIX_LINE.captures(line.trim_end()))
        .filter_map(|caps| {
            let line = caps["line"].parse().ok()?;
            let col = caps["col"].parse().ok()?;
            let message = caps["msg"].to_string();
            let diag = if success {
                Diagnostic::warning(message)
            } else {
                Diagnostic::error(message)
            };
            Some(diag.at(Location::at(PathBuf::from(&caps["path"]), line, col)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unix_lines_and_skips_noise() {
        let out = "src/js/a.js:3:5: Unexpected debugger\n\n2 problems\n";
        let diags = parse_unix_output(out, false);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].is_error());
        assert_eq!(
            diags[0].location,
            Some(Location::at("src/js/a.js", 3, 5))
        );
        assert_eq!(diags[0].message, "Unexpected debugger");
    }
}

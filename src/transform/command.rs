// src/transform/command.rs

use crate::errors::TaskError;
use crate::exec::command::ShellCommand;
use crate::result::Location;
use crate::transform::{
    OutputFile, SourceFile, Transform, TransformFuture, TransformInput, TransformOutput,
};

/// Transform delegating to an external filter.
///
/// Each entry is piped to `cmd` on stdin; stdout becomes the output file.
/// The command sees `ASSETDAG_MODE`, `ASSETDAG_MINIFY` and `ASSETDAG_SOURCE`
/// and is responsible for minifying when asked to.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    name: String,
    cmd: String,
}

impl CommandTransform {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
        }
    }
}

impl Transform for CommandTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform<'a>(&'a self, input: &'a TransformInput) -> TransformFuture<'a> {
        Box::pin(async move {
            let mut output = TransformOutput::default();
            for entry in &input.entries {
                let result = ShellCommand::new(&self.cmd)
                    .stdin(entry.contents.clone())
                    .env("ASSETDAG_MODE", input.options.mode.as_str())
                    .env("ASSETDAG_MINIFY", input.options.mode.minify().to_string())
                    .env("ASSETDAG_SOURCE", entry.path.to_string_lossy())
                    .run(&input.root)
                    .await
                    .map_err(|e| {
                        TaskError::transform_at(format!("{e:#}"), Location::file(&entry.path))
                    })?;

                if !result.success {
                    let stderr = result.stderr.trim();
                    return Err(TaskError::transform_at(
                        format!("'{}' exited with status {}: {stderr}", self.cmd, result.code),
                        Location::file(&entry.path),
                    ));
                }

                output
                    .files
                    .push(OutputFile::new(entry.output.clone(), result.stdout.into_bytes()));
            }
            Ok(output)
        })
    }
}

/// Pipe already compiled `text` of `entry` through `cmd` and return its
/// stdout. `role` names the step in error messages ("minifier",
/// "postprocessor").
pub async fn filter_through(
    role: &str,
    cmd: &str,
    input: &TransformInput,
    entry: &SourceFile,
    text: String,
) -> Result<String, TaskError> {
    let output = ShellCommand::new(cmd)
        .stdin(text)
        .env("ASSETDAG_MODE", input.options.mode.as_str())
        .env("ASSETDAG_SOURCE", entry.path.to_string_lossy())
        .run(&input.root)
        .await
        .map_err(|e| TaskError::transform_at(format!("{e:#}"), Location::file(&entry.path)))?;

    if !output.success {
        return Err(TaskError::transform_at(
            format!(
                "{role} '{cmd}' exited with status {}: {}",
                output.code,
                output.stderr.trim()
            ),
            Location::file(&entry.path),
        ));
    }
    Ok(output.stdout)
}

// src/transform/scripts.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::errors::TaskError;
use crate::result::{Diagnostic, Location};
use crate::transform::command::filter_through;
use crate::transform::include::{resolve, script_candidates};
use crate::transform::minify::minify_js;
use crate::transform::{
    OutputFile, SourceFile, Transform, TransformFuture, TransformInput, TransformOutput,
};

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[ \t]*//=[ \t]*(?P<kind>require|include)[ \t]+["']?(?P<name>[^"'\s]+)["']?[ \t]*$"#)
        .expect("valid regex")
});

/// Script concatenation through `//= require` and `//= include` directives.
///
/// `include` always inlines the file; `require` inlines it once per output.
/// Missing files fail the transform when `hard_fail` is set and are reported
/// as warnings otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptTransform;

impl Transform for ScriptTransform {
    fn name(&self) -> &str {
        "scripts"
    }

    fn transform<'a>(&'a self, input: &'a TransformInput) -> TransformFuture<'a> {
        Box::pin(async move {
            let mut output = TransformOutput::default();
            for entry in &input.entries {
                let mut expander = Expander {
                    input,
                    stack: Vec::new(),
                    required: HashSet::new(),
                    diagnostics: Vec::new(),
                };
                let js = expander.expand(&entry.path, entry.text()?)?;
                output.diagnostics.append(&mut expander.diagnostics);

                let js = if input.options.mode.minify() {
                    minify(input, entry, js).await?
                } else {
                    js
                };
                output.files.push(OutputFile::new(entry.output.clone(), js));
            }
            Ok(output)
        })
    }
}

struct Expander<'a> {
    input: &'a TransformInput,
    stack: Vec<PathBuf>,
    required: HashSet<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

impl Expander<'_> {
    fn expand(&mut self, path: &Path, text: &str) -> Result<String, TaskError> {
        self.stack.push(path.to_path_buf());
        self.required.insert(path.to_path_buf());

        let mut out = String::with_capacity(text.len());
        for (idx, line) in text.lines().enumerate() {
            let Some(caps) = DIRECTIVE.captures(line) else {
                out.push_str(line);
                out.push('\n');
                continue;
            };

            let name = &caps["name"];
            let once = &caps["kind"] == "require";
            let column = line.find("//=").map(|c| c + 1).unwrap_or(1);
            let location = Location::at(path, idx + 1, column);

            let Some(resolved) = resolve(
                self.input.fs.as_ref(),
                &self.input.root,
                path,
                &self.input.options.include_paths,
                &script_candidates(name),
            ) else {
                let message = format!("cannot find '{name}' to include");
                if self.input.options.hard_fail {
                    return Err(TaskError::transform_at(message, location));
                }
                warn!(file = %path.display(), line = idx + 1, "{message}");
                self.diagnostics.push(Diagnostic::warning(message).at(location));
                continue;
            };

            if self.stack.contains(&resolved) {
                return Err(TaskError::transform_at(
                    format!("include cycle through '{}'", resolved.display()),
                    location,
                ));
            }
            if once && self.required.contains(&resolved) {
                continue;
            }

            let nested = self.input.read_to_string(&resolved)?;
            out.push_str(&self.expand(&resolved, &nested)?);
        }

        self.stack.pop();
        Ok(out)
    }
}

async fn minify(input: &TransformInput, entry: &SourceFile, js: String) -> Result<String, TaskError> {
    match &input.options.minify_cmd {
        Some(cmd) => filter_through("minifier", cmd, input, entry, js).await,
        None => Ok(minify_js(&js)),
    }
}

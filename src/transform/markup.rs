// src/transform/markup.rs

use std::error::Error as _;

use tera::{Context, Tera};

use crate::errors::TaskError;
use crate::result::Location;
use crate::transform::minify::collapse_html;
use crate::transform::{OutputFile, Transform, TransformFuture, TransformInput, TransformOutput};

/// Template rendering with `tera`.
///
/// Every support file is registered under its path relative to the glob
/// base (`layouts/base.html`), so entries can `extends` and `include` them.
/// Entries are rendered with `production` and `mode` in the context.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupTransform;

impl Transform for MarkupTransform {
    fn name(&self) -> &str {
        "markup"
    }

    fn transform<'a>(&'a self, input: &'a TransformInput) -> TransformFuture<'a> {
        Box::pin(async move {
            let mut templates: Vec<(String, String)> = Vec::new();
            for file in &input.support {
                templates.push((template_name(&file.output), file.text()?.to_string()));
            }
            // Entries are also registered under their own path, which cannot
            // clash with a support name.
            for entry in &input.entries {
                templates.push((template_name(&entry.path), entry.text()?.to_string()));
            }

            let mut tera = Tera::default();
            tera.autoescape_on(vec![]);
            tera.add_raw_templates(templates)
                .map_err(|e| TaskError::transform(error_chain(&e)))?;

            let mut context = Context::new();
            context.insert("production", &input.options.mode.minify());
            context.insert("mode", input.options.mode.as_str());

            let mut output = TransformOutput::default();
            for entry in &input.entries {
                let html = tera.render(&template_name(&entry.path), &context).map_err(|e| {
                    TaskError::transform_at(error_chain(&e), Location::file(&entry.path))
                })?;
                let html = if input.options.mode.minify() {
                    collapse_html(&html)
                } else {
                    html
                };
                output.files.push(OutputFile::new(entry.output.clone(), html));
            }
            Ok(output)
        })
    }
}

fn template_name(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Tera keeps the interesting part (line, column, cause) in the source
/// chain.
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// src/transform/styles.rs

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::TaskError;
use crate::result::Location;
use crate::transform::command::filter_through;
use crate::transform::include::{resolve, style_candidates};
use crate::transform::minify::compress_css;
use crate::transform::{
    OutputFile, SourceFile, Transform, TransformFuture, TransformInput, TransformOutput,
};

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*@import\s+(?:url\(\s*)?["']?(?P<name>[^"')\s;]+)["']?\s*\)?\s*;\s*$"#)
        .expect("valid regex")
});

/// Stylesheet compiler: inlines local `@import`s and checks block structure.
/// An optional postprocessor (e.g. a vendor prefixer) sees the inlined
/// sheet. Production output is compressed; development output keeps the
/// source layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleTransform;

impl Transform for StyleTransform {
    fn name(&self) -> &str {
        "styles"
    }

    fn transform<'a>(&'a self, input: &'a TransformInput) -> TransformFuture<'a> {
        Box::pin(async move {
            let mut output = TransformOutput::default();
            for entry in &input.entries {
                let mut css = compile_stylesheet(input, entry)?;
                if let Some(cmd) = &input.options.postprocess_cmd {
                    css = filter_through("postprocessor", cmd, input, entry, css).await?;
                }
                let css = if input.options.mode.minify() {
                    compress_css(&css)
                } else {
                    css
                };
                output.files.push(OutputFile::new(entry.output.clone(), css));
            }
            Ok(output)
        })
    }
}

pub fn compile_stylesheet(input: &TransformInput, entry: &SourceFile) -> Result<String, TaskError> {
    let mut stack = Vec::new();
    inline_imports(input, &entry.path, entry.text()?, &mut stack)
}

fn inline_imports(
    input: &TransformInput,
    path: &Path,
    text: &str,
    stack: &mut Vec<PathBuf>,
) -> Result<String, TaskError> {
    check_braces(path, text)?;
    stack.push(path.to_path_buf());

    let mut out = String::with_capacity(text.len());
    for (idx, line) in text.lines().enumerate() {
        let Some(caps) = IMPORT.captures(line) else {
            out.push_str(line);
            out.push('\n');
            continue;
        };

        let name = &caps["name"];
        if is_remote(name) {
            out.push_str(line);
            out.push('\n');
            continue;
        }

        let column = line.find("@import").map(|c| c + 1).unwrap_or(1);
        let location = Location::at(path, idx + 1, column);

        let resolved = resolve(
            input.fs.as_ref(),
            &input.root,
            path,
            &input.options.include_paths,
            &style_candidates(name),
        )
        .ok_or_else(|| {
            TaskError::transform_at(format!("cannot find stylesheet '{name}' to import"), location.clone())
        })?;

        if stack.contains(&resolved) {
            return Err(TaskError::transform_at(
                format!("import cycle through '{}'", resolved.display()),
                location,
            ));
        }

        let nested = input.read_to_string(&resolved)?;
        out.push_str(&inline_imports(input, &resolved, &nested, stack)?);
    }

    stack.pop();
    Ok(out)
}

fn is_remote(name: &str) -> bool {
    name.starts_with("http://") || name.starts_with("https://") || name.starts_with("//")
}

/// Fail on a `}` without a matching `{`, or on a block left open.
/// Braces inside strings and comments are ignored.
pub fn check_braces(path: &Path, text: &str) -> Result<(), TaskError> {
    let mut open: Vec<(usize, usize)> = Vec::new();
    let mut quote: Option<char> = None;
    let mut in_comment = false;
    let mut escaped = false;
    let mut prev = '\0';
    let (mut line, mut col) = (1usize, 0usize);

    for c in text.chars() {
        if c == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }

        if in_comment {
            if prev == '*' && c == '/' {
                in_comment = false;
                prev = '\0';
                continue;
            }
        } else if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q || c == '\n' {
                quote = None;
            }
        } else {
            match c {
                '*' if prev == '/' => {
                    // The opening `*` cannot also close the comment.
                    in_comment = true;
                    prev = '\0';
                    continue;
                }
                '"' | '\'' => quote = Some(c),
                '{' => open.push((line, col)),
                '}' => {
                    if open.pop().is_none() {
                        return Err(TaskError::transform_at(
                            "unexpected '}'",
                            Location::at(path, line, col),
                        ));
                    }
                }
                _ => {}
            }
        }
        prev = c;
    }

    match open.pop() {
        Some((line, col)) => Err(TaskError::transform_at(
            "unclosed block",
            Location::at(path, line, col),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn braces_in_strings_and_comments_are_ignored() {
        let css = "a::after { content: \"}\"; }\n/* { */\n";
        assert!(check_braces(Path::new("a.css"), css).is_ok());
    }

    #[test]
    fn comment_opener_does_not_close_itself() {
        let text = "/*/ nav { */\na { color: red; }\n";
        assert!(check_braces(Path::new("a.css"), text).is_ok());

        let text = "/**/ a { }\n/*/}*/\n";
        assert!(check_braces(Path::new("a.css"), text).is_ok());
    }

    #[test]
    fn unclosed_block_points_at_opening_brace() {
        let err = check_braces(Path::new("a.css"), "a { color: red;\n.b {\n}\n").unwrap_err();
        assert_eq!(
            err,
            TaskError::transform_at("unclosed block", Location::at("a.css", 1, 3))
        );
    }

    #[test]
    fn stray_closing_brace_is_reported() {
        let err = check_braces(Path::new("a.css"), "a {}\n}\n").unwrap_err();
        assert_eq!(
            err,
            TaskError::transform_at("unexpected '}'", Location::at("a.css", 2, 1))
        );
    }
}

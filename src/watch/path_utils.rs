// src/watch/path_utils.rs

//! Path helpers shared by source collection and the watcher.

use std::path::{Component, Path};

/// `path` relative to `root`, with forward slashes.
///
/// Falls back to comparing canonical paths when the plain prefix check fails
/// (notify may report `/private/var/...` for a root under `/var/...`).
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let (root_canon, path_canon) = (root.canonicalize().ok()?, path.canonicalize().ok()?);
    path_canon.strip_prefix(&root_canon).ok().map(to_slash)
}

/// True if the relative path `rel` is `dir` itself or lies below it.
pub fn is_within(rel: &str, dir: &str) -> bool {
    let dir = normalize_relative(dir);
    if dir.is_empty() {
        return true;
    }
    rel == dir || rel.strip_prefix(dir.as_str()).is_some_and(|rest| rest.starts_with('/'))
}

/// Lexically tidy a relative directory: drop `.` segments, repeated and
/// trailing slashes. `./dist/` becomes `dist`.
pub fn normalize_relative(dir: &str) -> String {
    let parts: Vec<_> = Path::new(dir)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

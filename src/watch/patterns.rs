// src/watch/patterns.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;

/// Compiled include/exclude glob patterns.
///
/// The patterns are relative to the project root. Paths passed to
/// [`PatternSet::matches`] are relative too, with forward slashes
/// (e.g. `"src/js/app.js"`). `*` does not cross `/`; use `**` for that.
#[derive(Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    include_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl PatternSet {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set = build_globset(include).context("building include globset")?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };

        Ok(Self {
            patterns: include.to_vec(),
            include_set,
            exclude_set,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns true if `rel_path` matches an include pattern and no exclude
    /// pattern.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }

    /// Literal base directory of the first include pattern matching
    /// `rel_path`, used to derive output paths (`src/js/a/b.js` matched by
    /// `src/js/**/*.js` has base `src/js`).
    pub fn base_for(&self, rel_path: &str) -> String {
        self.include_set
            .matches(rel_path)
            .first()
            .map(|&i| glob_base(&self.patterns[i]))
            .unwrap_or_default()
    }

    /// Directories that can contain matches, relative to the root.
    fn search_roots(&self) -> BTreeSet<String> {
        self.patterns.iter().map(|p| glob_base(p)).collect()
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// The leading path components of `pattern` that contain no glob syntax.
///
/// A pattern without any glob syntax names a single file, so its base is the
/// parent directory.
pub fn glob_base(pattern: &str) -> String {
    let parts: Vec<&str> = pattern.split('/').collect();
    let is_glob = |s: &str| s.contains(['*', '?', '[', '{']);

    let literal: Vec<&str> = match parts.iter().position(|p| is_glob(p)) {
        Some(idx) => parts[..idx].to_vec(),
        None => parts[..parts.len().saturating_sub(1)].to_vec(),
    };

    literal
        .into_iter()
        .filter(|p| !p.is_empty() && *p != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Collect all files under `root` that match `set`, sorted by path.
///
/// Only the literal base directories of the patterns are walked, so a
/// pattern like `src/js/**/*.js` never descends into `node_modules`.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    set: &PatternSet,
) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();

    for base in set.search_roots() {
        let start = if base.is_empty() {
            root.to_path_buf()
        } else {
            root.join(&base)
        };
        if !fs.is_dir(&start) {
            continue;
        }

        let mut stack = vec![start];
        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                } else if fs.is_file(&path) {
                    if let Some(rel) = relative_str(root, &path) {
                        if set.matches(&rel) {
                            files.insert(path);
                        }
                    }
                }
            }
        }
    }

    Ok(files.into_iter().collect())
}

// src/transform/sources.rs

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::SourceFile;
use crate::config::AssetSettings;
use crate::errors::TaskError;
use crate::fs::FileSystem;
use crate::types::AssetClass;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{PatternSet, collect_matching_files};

/// Which files an asset class reads.
///
/// `entries` are compiled into outputs; `support` is the wider watched set
/// (partials, layouts) that entries may pull in.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    class: AssetClass,
    entries: PatternSet,
    support: PatternSet,
}

impl SourceSpec {
    pub fn new(class: AssetClass, entries: PatternSet, support: PatternSet) -> Self {
        Self {
            class,
            entries,
            support,
        }
    }

    pub fn from_settings(settings: &AssetSettings) -> Result<Self> {
        Ok(Self::new(
            settings.class,
            PatternSet::new(&settings.src, &settings.exclude)?,
            PatternSet::new(&settings.watch, &settings.exclude)?,
        ))
    }

    pub fn class(&self) -> AssetClass {
        self.class
    }

    /// Entry files, partials excluded, with output paths mapped for the
    /// class.
    pub fn collect_entries(
        &self,
        fs: &dyn FileSystem,
        root: &Path,
    ) -> Result<Vec<SourceFile>, TaskError> {
        let files = collect(fs, root, &self.entries)?;
        Ok(files
            .into_iter()
            .filter(|f| !is_partial(&f.path))
            .map(|mut f| {
                f.output = map_extension(&f.output, self.class);
                f
            })
            .collect())
    }

    /// Every watched file, partials included. Output paths are left relative
    /// to the glob base, which is also the name templates are loaded by.
    pub fn collect_support(
        &self,
        fs: &dyn FileSystem,
        root: &Path,
    ) -> Result<Vec<SourceFile>, TaskError> {
        collect(fs, root, &self.support)
    }
}

fn collect(fs: &dyn FileSystem, root: &Path, set: &PatternSet) -> Result<Vec<SourceFile>, TaskError> {
    let paths = collect_matching_files(fs, root, set)
        .map_err(|e| TaskError::file_system(root, format!("{e:#}")))?;

    let mut files = Vec::with_capacity(paths.len());
    for abs in paths {
        let Some(rel) = relative_str(root, &abs) else {
            continue;
        };
        let contents = fs
            .read(&abs)
            .map_err(|e| TaskError::file_system(&rel, format!("{e:#}")))?;
        let output = output_path(&rel, &set.base_for(&rel));
        files.push(SourceFile::new(rel, output, contents));
    }
    Ok(files)
}

/// `rel` with the glob base stripped: `src/js/lib/a.js` below `src/js`
/// becomes `lib/a.js`.
pub fn output_path(rel: &str, base: &str) -> PathBuf {
    if base.is_empty() {
        return PathBuf::from(rel);
    }
    Path::new(rel)
        .strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| PathBuf::from(rel))
}

/// Files whose name starts with `_` are only ever included.
pub fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

fn map_extension(path: &Path, class: AssetClass) -> PathBuf {
    match class.output_extension() {
        Some(ext) => path.with_extension(ext),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn spec(class: AssetClass, src: &str, watch: &str) -> SourceSpec {
        SourceSpec::new(
            class,
            PatternSet::new(&[src.to_string()], &[]).unwrap(),
            PatternSet::new(&[watch.to_string()], &[]).unwrap(),
        )
    }

    #[test]
    fn entries_skip_partials_and_map_extensions() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/styles/main.scss", "a{}");
        fs.add_file("./src/styles/_vars.scss", "$x: 1;");
        fs.add_file("./src/styles/pages/home.scss", "b{}");

        let spec = spec(AssetClass::Styles, "src/styles/**/*.scss", "src/styles/**/*.scss");
        let entries = spec.collect_entries(&fs, Path::new(".")).unwrap();

        let outputs: Vec<_> = entries.iter().map(|e| e.output.clone()).collect();
        assert_eq!(
            outputs,
            vec![PathBuf::from("main.css"), PathBuf::from("pages/home.css")]
        );
        assert_eq!(entries[0].path, PathBuf::from("src/styles/main.scss"));

        let support = spec.collect_support(&fs, Path::new(".")).unwrap();
        assert_eq!(support.len(), 3);
    }

    #[test]
    fn single_star_does_not_descend() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/templates/index.html", "x");
        fs.add_file("./src/templates/layouts/base.html", "y");

        let spec = spec(AssetClass::Markup, "src/templates/*.html", "src/templates/**/*.html");
        let entries = spec.collect_entries(&fs, Path::new(".")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].output, PathBuf::from("index.html"));

        let support = spec.collect_support(&fs, Path::new(".")).unwrap();
        let names: Vec<_> = support.iter().map(|s| s.output.clone()).collect();
        assert_eq!(
            names,
            vec![PathBuf::from("index.html"), PathBuf::from("layouts/base.html")]
        );
    }

    #[test]
    fn missing_source_dir_yields_nothing() {
        let fs = MockFileSystem::new();
        let spec = spec(AssetClass::Scripts, "src/js/**/*.js", "src/js/**/*.js");
        assert!(spec.collect_entries(&fs, Path::new(".")).unwrap().is_empty());
    }
}

// src/transform/include.rs

//! Include resolution shared by the style and script transforms.

use std::path::{Component, Path, PathBuf};

use crate::fs::FileSystem;

/// Resolve `name` as included from `from` (both relative to `root`).
///
/// Searches the directory of `from` first, then each include path, trying
/// every candidate file name in order. Returns the normalized path relative
/// to `root`.
pub fn resolve(
    fs: &dyn FileSystem,
    root: &Path,
    from: &Path,
    include_paths: &[PathBuf],
    candidates: &[String],
) -> Option<PathBuf> {
    let own_dir = from.parent().map(Path::to_path_buf).unwrap_or_default();

    std::iter::once(own_dir)
        .chain(include_paths.iter().cloned())
        .flat_map(|dir| candidates.iter().map(move |c| normalize(&dir.join(c))))
        .find(|rel| fs.is_file(&root.join(rel)))
}

/// Candidate file names for a stylesheet import: the name as written, with
/// `.css` / `.scss`, and as a `_`-prefixed partial.
pub fn style_candidates(name: &str) -> Vec<String> {
    let (dir, file) = match name.rsplit_once('/') {
        Some((dir, file)) => (format!("{dir}/"), file),
        None => (String::new(), name),
    };

    let mut out = vec![
        name.to_string(),
        format!("{name}.css"),
        format!("{name}.scss"),
        format!("{dir}_{file}.css"),
        format!("{dir}_{file}.scss"),
    ];
    if Path::new(file).extension().is_some() {
        out.push(format!("{dir}_{file}"));
    }
    out
}

pub fn script_candidates(name: &str) -> Vec<String> {
    vec![name.to_string(), format!("{name}.js")]
}

/// Lexically remove `.` and resolve `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn own_directory_wins_over_include_paths() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/styles/_vars.css", "a");
        fs.add_file("./lib/_vars.css", "b");

        let found = resolve(
            &fs,
            Path::new("."),
            Path::new("src/styles/main.css"),
            &[PathBuf::from("lib")],
            &style_candidates("vars"),
        );
        assert_eq!(found, Some(PathBuf::from("src/styles/_vars.css")));
    }

    #[test]
    fn falls_back_to_include_paths() {
        let fs = MockFileSystem::new();
        fs.add_file("./node_modules/jquery/dist/jquery.js", "x");

        let found = resolve(
            &fs,
            Path::new("."),
            Path::new("src/js/app.js"),
            &[PathBuf::from("."), PathBuf::from("node_modules")],
            &script_candidates("jquery/dist/jquery"),
        );
        assert_eq!(found, Some(PathBuf::from("node_modules/jquery/dist/jquery.js")));
    }

    #[test]
    fn normalize_resolves_parent_dirs() {
        assert_eq!(
            normalize(Path::new("./src/js/../styles/a.css")),
            PathBuf::from("src/styles/a.css")
        );
    }
}

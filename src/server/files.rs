// src/server/files.rs

//! Static file helpers for the dev server.

use std::path::{Component, Path, PathBuf};

use crate::server::CLIENT_PATH;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPathError {
    /// The path tries to leave the served directory.
    Traversal,
    /// Not valid percent-encoded UTF-8.
    Malformed,
}

/// Map a request path onto a file below `root`.
///
/// Rejects any `..` segment. Directory requests (trailing `/` or empty
/// path) map to `index.html`.
pub fn resolve_request_path(root: &Path, uri_path: &str) -> Result<PathBuf, RequestPathError> {
    let decoded = urlencoding::decode(uri_path).map_err(|_| RequestPathError::Malformed)?;

    let mut rel = PathBuf::new();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => rel.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(RequestPathError::Traversal);
            }
        }
    }

    if decoded.ends_with('/') || rel.as_os_str().is_empty() {
        rel.push("index.html");
    }
    Ok(root.join(rel))
}

/// Insert the live-reload client before `</body>`, or append it when the
/// document has none.
pub fn inject_client(html: &str) -> String {
    let tag = format!("<script src=\"{CLIENT_PATH}\"></script>");
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..idx]);
            out.push_str(&tag);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}

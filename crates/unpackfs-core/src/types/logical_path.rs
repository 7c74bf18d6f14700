//! Slash-separated logical paths inside a source image.

use crate::ExtractionError;
use crate::Result;

/// Normalizes a logical path to the canonical `/a/b/c` form.
///
/// Empty components and `.` are dropped. `..` is rejected rather than
/// resolved, because a source entry must never name a location outside the
/// tree it belongs to.
///
/// # Examples
///
/// ```
/// use unpackfs_core::types::logical_path::normalize;
///
/// assert_eq!(normalize("usr//lib/./x").unwrap(), "/usr/lib/x");
/// assert_eq!(normalize("").unwrap(), "/");
/// assert!(normalize("/a/../b").is_err());
/// ```
pub fn normalize(path: &str) -> Result<String> {
    let mut out = String::with_capacity(path.len() + 1);
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                return Err(ExtractionError::PathTraversal {
                    path: path.to_string(),
                });
            }
            name => {
                out.push('/');
                out.push_str(name);
            }
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    Ok(out)
}

/// Joins a child name onto a normalized parent path.
///
/// # Examples
///
/// ```
/// use unpackfs_core::types::logical_path::join;
///
/// assert_eq!(join("/", "etc"), "/etc");
/// assert_eq!(join("/etc", "passwd"), "/etc/passwd");
/// ```
#[must_use]
pub fn join(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    format!("{parent}/{name}")
}

/// Returns the parent of a normalized path; the root is its own parent.
#[must_use]
pub fn parent(path: &str) -> &str {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

/// Iterates the strict ancestors of a normalized path, outermost first,
/// excluding the root.
///
/// `/a/b/c` yields `/a` and then `/a/b`.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/')
        .skip(1)
        .map(move |(idx, _)| &path[..idx])
}

//! Depth-first traversal of an [`ArchiveSource`].

use tracing::debug;

use crate::ExtractionError;
use crate::Result;
use crate::source::ArchiveSource;
use crate::types::Entry;
use crate::types::logical_path;

/// What the walker does after a visit.
#[derive(Debug)]
pub enum WalkControl {
    /// Keep going. For a directory this means descending into it.
    Continue,
    /// On a directory: do not descend, carry on with its siblings.
    /// On anything else: skip the remaining entries of the same directory.
    SkipDir,
    /// Stop the traversal; `walk` returns this error.
    Abort(ExtractionError),
}

/// Walks the tree under `root` in pre-order, calling `visit` for each entry.
///
/// `visit` receives the logical path and either the entry or the error that
/// prevented reading it. Errors are reported to `visit` rather than ending
/// the walk on their own:
///
/// - a failed lookup of `root` is visited once and nothing else happens;
/// - a failed lookup of a child is visited with that child's path and the
///   child is not descended into;
/// - a directory whose children cannot be listed is visited a second time
///   with the listing error and is not descended into.
///
/// Children are visited in the order the source lists them.
///
/// # Errors
///
/// Returns the error carried by the first [`WalkControl::Abort`]. A
/// [`WalkControl::SkipDir`] that reaches the top level is not an error.
///
/// # Examples
///
/// ```
/// use unpackfs_core::source::MemoryArchive;
/// use unpackfs_core::{WalkControl, walk};
///
/// let image = MemoryArchive::builder()
///     .file("/a/one", b"1", 0o644)
///     .file("/b/two", b"2", 0o644)
///     .build();
///
/// let mut seen = Vec::new();
/// walk(&image, "/", |path, entry| {
///     if entry.is_ok() {
///         seen.push(path.to_string());
///     }
///     if path == "/a" { WalkControl::SkipDir } else { WalkControl::Continue }
/// })?;
/// assert_eq!(seen, vec!["/", "/a", "/b", "/b/two"]);
/// # Ok::<(), unpackfs_core::ExtractionError>(())
/// ```
pub fn walk<S, F>(source: &S, root: &str, mut visit: F) -> Result<()>
where
    S: ArchiveSource + ?Sized,
    F: FnMut(&str, std::result::Result<&Entry, ExtractionError>) -> WalkControl,
{
    let looked_up = logical_path::normalize(root)
        .and_then(|root| source.lookup(&root).map(|entry| (root, entry)));

    let control = match looked_up {
        Ok((root, entry)) => walk_entry(source, &root, &entry, &mut visit),
        Err(e) => visit(root, Err(e)),
    };

    match control {
        WalkControl::Continue | WalkControl::SkipDir => Ok(()),
        WalkControl::Abort(e) => Err(e),
    }
}

fn walk_entry<S, F>(source: &S, path: &str, entry: &Entry, visit: &mut F) -> WalkControl
where
    S: ArchiveSource + ?Sized,
    F: FnMut(&str, std::result::Result<&Entry, ExtractionError>) -> WalkControl,
{
    match visit(path, Ok(entry)) {
        WalkControl::Continue => {}
        other => return other,
    }
    if !entry.is_dir() {
        return WalkControl::Continue;
    }

    let names = match source.list_children(entry) {
        Ok(names) => names,
        Err(e) => {
            debug!(path, error = %e, "cannot list directory");
            return visit(path, Err(e));
        }
    };

    for name in names {
        let child_path = logical_path::join(path, &name);
        match source.lookup(&child_path) {
            Err(e) => {
                if let WalkControl::Abort(e) = visit(&child_path, Err(e)) {
                    return WalkControl::Abort(e);
                }
            }
            Ok(child) => match walk_entry(source, &child_path, &child, visit) {
                WalkControl::Continue => {}
                WalkControl::SkipDir if child.is_dir() => {}
                other => return other,
            },
        }
    }

    WalkControl::Continue
}

//! High-level entry points.

use std::path::Path;

use crate::ExtractOptions;
use crate::ExtractionError;
use crate::ExtractionReport;
use crate::ProgressCallback;
use crate::Result;
use crate::extraction::Extractor;
use crate::report::NoopProgress;
use crate::source::ArchiveSource;
use crate::types::Entry;
use crate::types::TargetDir;
use crate::walk::WalkControl;
use crate::walk::walk;

/// Extracts the subtree of `source` rooted at `root` into `target_dir`.
///
/// `target_dir` must already exist. Entries keep their logical path under
/// it: extracting root `/usr` writes `target_dir/usr/...`.
///
/// # Errors
///
/// Returns an error if the target directory is invalid, the provider cannot
/// be initialized, or any entry fails (which stops the run, leaving whatever
/// was already written). A failed deferred permission repair is only
/// recorded in [`ExtractionReport::warnings`].
///
/// # Examples
///
/// ```
/// use unpackfs_core::source::MemoryArchive;
/// use unpackfs_core::{ExtractOptions, OpsKind, extract};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let image = MemoryArchive::builder()
///     .file("/etc/hostname", b"box\n", 0o644)
///     .build();
///
/// let out = tempfile::tempdir()?;
/// let options = ExtractOptions::default().with_ops(OpsKind::Native);
/// let report = extract(&image, "/", out.path(), &options)?;
///
/// assert_eq!(report.files_extracted, 1);
/// assert_eq!(std::fs::read(out.path().join("etc/hostname"))?, b"box\n");
/// # Ok(())
/// # }
/// ```
pub fn extract<S: ArchiveSource + ?Sized>(
    source: &S,
    root: &str,
    target_dir: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<ExtractionReport> {
    extract_with_progress(source, root, target_dir, options, &mut NoopProgress)
}

/// [`extract`] with progress reporting.
pub fn extract_with_progress<S: ArchiveSource + ?Sized>(
    source: &S,
    root: &str,
    target_dir: impl AsRef<Path>,
    options: &ExtractOptions,
    progress: &mut dyn ProgressCallback,
) -> Result<ExtractionReport> {
    let target = TargetDir::new(target_dir.as_ref())?;
    Extractor::new(source, target, options.clone())?.run(root, progress)
}

/// Visits every entry under `root`, reporting unreadable entries to
/// `report` and carrying on past them.
///
/// # Errors
///
/// Never fails on entry errors; the `Result` mirrors [`walk`].
///
/// # Examples
///
/// ```
/// use unpackfs_core::list;
/// use unpackfs_core::source::MemoryArchive;
///
/// let image = MemoryArchive::builder().symlink("/bin/sh", "busybox").build();
/// let mut lines = Vec::new();
/// list(&image, "/", |_, entry| {
///     if let Ok(entry) = entry {
///         lines.push(entry.to_string());
///     }
/// })?;
/// assert_eq!(lines.len(), 3);
/// assert!(lines[2].ends_with("/bin/sh -> busybox"));
/// # Ok::<(), unpackfs_core::ExtractionError>(())
/// ```
pub fn list<S, F>(source: &S, root: &str, mut report: F) -> Result<()>
where
    S: ArchiveSource + ?Sized,
    F: FnMut(&str, std::result::Result<&Entry, ExtractionError>),
{
    walk(source, root, |path, entry| {
        report(path, entry);
        WalkControl::Continue
    })
}

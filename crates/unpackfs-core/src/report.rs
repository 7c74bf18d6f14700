//! Extraction reporting and progress hooks.

use std::time::Duration;

use crate::types::EntryKind;

/// Summary of one [`extract`](crate::extract) run.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Regular files written.
    pub files_extracted: usize,

    /// Directories created or confirmed present.
    pub directories_created: usize,

    /// Symlinks created.
    pub symlinks_created: usize,

    /// Named pipes created.
    pub fifos_created: usize,

    /// Sockets bound.
    pub sockets_created: usize,

    /// Block and character device nodes created.
    pub devices_created: usize,

    /// Whiteouts that removed (or found absent) their target.
    pub whiteouts_applied: usize,

    /// Entries skipped because their option was disabled.
    pub entries_skipped: usize,

    /// Total bytes of regular file content written.
    pub bytes_written: u64,

    /// Deferred directory permission repairs executed after the walk.
    pub cleanups_run: usize,

    /// Wall-clock duration of the run.
    pub duration: Duration,

    /// Failures that were logged but did not decide the run's result.
    pub warnings: Vec<String>,
}

impl ExtractionReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Counts one successfully materialized entry of `kind`.
    pub(crate) fn record(&mut self, kind: EntryKind) {
        match kind {
            EntryKind::Regular => self.files_extracted += 1,
            EntryKind::Directory => self.directories_created += 1,
            EntryKind::Symlink => self.symlinks_created += 1,
            EntryKind::Fifo => self.fifos_created += 1,
            EntryKind::Socket => self.sockets_created += 1,
            EntryKind::BlockDevice | EntryKind::CharDevice => self.devices_created += 1,
            EntryKind::Irregular => {}
        }
    }

    /// Returns the number of filesystem objects created.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.files_extracted
            + self.directories_created
            + self.symlinks_created
            + self.fifos_created
            + self.sockets_created
            + self.devices_created
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Receives progress updates while an image is extracted.
///
/// # Examples
///
/// ```
/// use unpackfs_core::ProgressCallback;
///
/// struct Printer;
///
/// impl ProgressCallback for Printer {
///     fn on_entry_start(&mut self, path: &str, current: usize) {
///         println!("{current}: {path}");
///     }
///
///     fn on_bytes_written(&mut self, _bytes: u64) {}
///
///     fn on_entry_complete(&mut self, _path: &str) {}
///
///     fn on_complete(&mut self) {
///         println!("done");
///     }
/// }
/// ```
pub trait ProgressCallback {
    /// Called before an entry is materialized. `current` is 1-indexed.
    fn on_entry_start(&mut self, path: &str, current: usize);

    /// Called after file content has been written.
    fn on_bytes_written(&mut self, bytes: u64);

    /// Called when an entry has been materialized or skipped.
    fn on_entry_complete(&mut self, path: &str);

    /// Called once when the walk and the deferred repairs are done.
    fn on_complete(&mut self);
}

/// `ProgressCallback` that ignores every update.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_entry_start(&mut self, _path: &str, _current: usize) {}

    fn on_bytes_written(&mut self, _bytes: u64) {}

    fn on_entry_complete(&mut self, _path: &str) {}

    fn on_complete(&mut self) {}
}

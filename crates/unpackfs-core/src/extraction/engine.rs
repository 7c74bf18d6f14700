//! Materializes a walked image onto the filesystem.

use std::fs;
use std::fs::DirBuilder;
use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use nix::sys::stat::Mode;
use tracing::debug;
use tracing::info;

use super::prepare::do_create;
use crate::ExtractOptions;
use crate::ExtractionError;
use crate::ExtractionReport;
use crate::ProgressCallback;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;
use crate::ops;
use crate::ops::FsOps;
use crate::source::ArchiveSource;
use crate::types::Entry;
use crate::types::EntryKind;
use crate::types::TargetDir;
use crate::types::logical_path;
use crate::walk::WalkControl;
use crate::walk::walk;

/// Mode of newly created directories before permissions are applied.
const DIR_MODE: u32 = 0o755;
/// Mode of newly created files, fifos and nodes before permissions are applied.
const FILE_MODE: u32 = 0o644;
/// Owner bits a directory needs for its children to be created: write to
/// add entries, search to reach them, read to list them on re-extraction.
const OWNER_RWX: u32 = 0o700;

/// A directory mode to put back once the whole tree is written.
struct DeferredCleanup {
    path: PathBuf,
    action: Box<dyn FnOnce() -> Result<()>>,
}

/// How a visited entry was handled.
enum Outcome {
    Created,
    Skipped,
    WhiteoutApplied,
}

/// One extraction run: a source, a target directory, and the options and
/// provider that govern how entries are reproduced.
///
/// Directories whose recorded mode would lock the extractor out are created
/// with owner `rwx` added; their real mode is restored after the walk, in
/// the order the directories were visited, whether or not the walk failed.
pub struct Extractor<'a, S: ArchiveSource + ?Sized> {
    source: &'a S,
    target: TargetDir,
    options: ExtractOptions,
    ops: Rc<dyn FsOps>,
    cleanups: Vec<DeferredCleanup>,
    report: ExtractionReport,
    buffer: CopyBuffer,
}

impl<'a, S: ArchiveSource + ?Sized> Extractor<'a, S> {
    /// Creates an extractor, resolving the provider from `options.ops`.
    ///
    /// # Errors
    ///
    /// Fails if the requested provider cannot be initialized.
    pub fn new(source: &'a S, target: TargetDir, options: ExtractOptions) -> Result<Self> {
        let ops = ops::select(options.ops)?;
        Ok(Self::with_ops(source, target, options, ops))
    }

    /// Creates an extractor with an explicit provider; `options.ops` is
    /// ignored.
    pub fn with_ops(
        source: &'a S,
        target: TargetDir,
        options: ExtractOptions,
        ops: Rc<dyn FsOps>,
    ) -> Self {
        Self {
            source,
            target,
            options,
            ops,
            cleanups: Vec::new(),
            report: ExtractionReport::new(),
            buffer: CopyBuffer::new(),
        }
    }

    /// Extracts the subtree at `root`.
    ///
    /// Ancestors of `root` are created under the target first, so that
    /// `/usr/lib` lands in `TARGET/usr/lib`.
    ///
    /// # Errors
    ///
    /// Returns the first entry error, which stops the walk. Failed deferred
    /// permission repairs never fail the run: they are logged and recorded
    /// in [`ExtractionReport::warnings`].
    pub fn run(mut self, root: &str, progress: &mut dyn ProgressCallback) -> Result<ExtractionReport> {
        let start = Instant::now();
        debug!(
            root,
            target = %self.target.as_path().display(),
            provider = self.ops.name(),
            options = ?self.options,
            "starting extraction"
        );

        let walk_result = self.create_root_ancestors(root).and_then(|()| {
            let source = self.source;
            let mut current = 0usize;
            walk(source, root, |path, entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        info!(path, error = %e, "cannot read entry");
                        return WalkControl::Abort(e);
                    }
                };
                current += 1;
                progress.on_entry_start(path, current);
                match self.extract_entry(entry, progress) {
                    Ok(()) => {
                        progress.on_entry_complete(path);
                        WalkControl::Continue
                    }
                    Err(e) => {
                        info!(path, error = %e, "extraction failed");
                        WalkControl::Abort(e)
                    }
                }
            })
        });

        self.run_cleanups();
        progress.on_complete();
        self.report.duration = start.elapsed();

        walk_result?;
        Ok(self.report)
    }

    fn create_root_ancestors(&self, root: &str) -> Result<()> {
        let root = logical_path::normalize(root)?;
        let parent = self.target.resolve(logical_path::parent(&root))?;
        if parent != self.target.as_path() {
            debug!(path = %parent.display(), "creating ancestors of the extraction root");
            fs::create_dir_all(&parent)
                .map_err(|e| ExtractionError::operation("mkdir", &parent, e))?;
        }
        Ok(())
    }

    /// Drains the deferred cleanups in order. Failures are logged and
    /// recorded as warnings.
    fn run_cleanups(&mut self) {
        for cleanup in std::mem::take(&mut self.cleanups) {
            self.report.cleanups_run += 1;
            if let Err(e) = (cleanup.action)() {
                info!(path = %cleanup.path.display(), error = %e, "cleanup failed");
                self.report.add_warning(format!("cleanup failed: {e}"));
            }
        }
    }

    fn extract_entry(&mut self, entry: &Entry, progress: &mut dyn ProgressCallback) -> Result<()> {
        let target = self.target.resolve(entry.path())?;

        match self.materialize(entry, &target, progress)? {
            Outcome::Skipped => {
                self.report.entries_skipped += 1;
                return Ok(());
            }
            Outcome::WhiteoutApplied => {
                self.report.whiteouts_applied += 1;
                return Ok(());
            }
            Outcome::Created => self.report.record(entry.kind()),
        }

        if self.options.extract_owners {
            debug!(path = entry.path(), uid = entry.uid(), gid = entry.gid(), "chown");
            if let Err(e) = self.ops.chown(&target, entry.uid(), entry.gid()) {
                info!(path = entry.path(), error = %e, "chown failed");
                return Err(e);
            }
        }

        if self.options.extract_perms && !entry.is_symlink() {
            let mut mode = entry.mode();
            if entry.is_dir() && mode & OWNER_RWX != OWNER_RWX {
                self.defer_mode_restore(&target, mode);
                mode |= OWNER_RWX;
            }
            debug!("chmod({}, {mode:04o})", entry.path());
            if let Err(e) = self.ops.chmod(&target, mode) {
                info!(path = entry.path(), error = %e, "chmod failed");
                return Err(e);
            }
        }

        Ok(())
    }

    fn defer_mode_restore(&mut self, target: &Path, mode: u32) {
        let ops = Rc::clone(&self.ops);
        let path = target.to_path_buf();
        let restore_path = path.clone();
        self.cleanups.push(DeferredCleanup {
            path,
            action: Box::new(move || {
                debug!("restoring {} to {mode:04o}", restore_path.display());
                ops.chmod(&restore_path, mode)
            }),
        });
    }

    fn materialize(
        &mut self,
        entry: &Entry,
        target: &Path,
        progress: &mut dyn ProgressCallback,
    ) -> Result<Outcome> {
        if entry.is_whiteout() {
            if !self.options.apply_whiteouts {
                debug!(path = entry.path(), "not applying whiteout");
                return Ok(Outcome::Skipped);
            }
            apply_whiteout(target)?;
            return Ok(Outcome::WhiteoutApplied);
        }

        match entry.kind() {
            EntryKind::Directory => {
                debug!(path = entry.path(), "mkdir");
                make_dir(target)?;
            }
            EntryKind::Symlink => {
                let link = entry.symlink_target().unwrap_or_default();
                debug!(path = entry.path(), target = link, "symlink");
                do_create(&self.ops, target, entry, || {
                    std::os::unix::fs::symlink(link, target)
                        .map_err(|e| ExtractionError::operation("symlink", target, e))
                })?;
            }
            EntryKind::Fifo => {
                debug!(path = entry.path(), "mkfifo");
                do_create(&self.ops, target, entry, || {
                    nix::unistd::mkfifo(target, Mode::from_bits_truncate(FILE_MODE))
                        .map_err(|e| ExtractionError::operation("mkfifo", target, e))
                })?;
            }
            EntryKind::Socket => {
                if !self.options.extract_sockets {
                    debug!(path = entry.path(), "skipping socket");
                    return Ok(Outcome::Skipped);
                }
                debug!(path = entry.path(), "socket");
                do_create(&self.ops, target, entry, || {
                    UnixListener::bind(target)
                        .map(drop)
                        .map_err(|e| ExtractionError::operation("bind", target, e))
                })?;
            }
            EntryKind::BlockDevice | EntryKind::CharDevice => {
                if !self.options.extract_devices {
                    debug!(path = entry.path(), kind = entry.kind().name(), "skipping device node");
                    return Ok(Outcome::Skipped);
                }
                debug!(path = entry.path(), kind = entry.kind().name(), "mknod");
                let ops = Rc::clone(&self.ops);
                do_create(&self.ops, target, entry, || ops.mknod(target, entry))?;
            }
            EntryKind::Regular => {
                debug!(path = entry.path(), size = entry.size(), "write");
                let written = self.write_regular(entry, target)?;
                self.report.bytes_written += written;
                progress.on_bytes_written(written);
            }
            EntryKind::Irregular => {
                return Err(ExtractionError::UnsupportedEntry {
                    path: entry.path().to_string(),
                    kind: entry.kind().name(),
                });
            }
        }
        Ok(Outcome::Created)
    }

    fn write_regular(&mut self, entry: &Entry, target: &Path) -> Result<u64> {
        let source = self.source;
        let buffer = &mut self.buffer;
        do_create(&self.ops, target, entry, || {
            let mut reader = source.open_content(entry)?;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(FILE_MODE)
                .open(target)
                .map_err(|e| ExtractionError::operation("open", target, e))?;
            let written = copy_with_buffer(&mut reader, &mut file, buffer)?;
            if written != entry.size() {
                return Err(ExtractionError::SizeMismatch {
                    entry: entry.path().to_string(),
                    path: target.to_path_buf(),
                    written,
                    expected: entry.size(),
                });
            }
            Ok(written)
        })
    }
}

/// Creates a directory, accepting an existing one and replacing anything
/// else found at the path.
fn make_dir(path: &Path) -> Result<()> {
    let mkdir = || DirBuilder::new().mode(DIR_MODE).create(path);
    match mkdir() {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            let existing = fs::symlink_metadata(path)
                .map_err(|e| ExtractionError::operation("lstat", path, e))?;
            if existing.is_dir() {
                return Ok(());
            }
            debug!(path = %path.display(), "replacing non-directory with directory");
            fs::remove_file(path).map_err(|e| ExtractionError::operation("remove", path, e))?;
            mkdir().map_err(|e| ExtractionError::operation("mkdir", path, e))
        }
        Err(e) => Err(ExtractionError::operation("mkdir", path, e)),
    }
}

/// Removes whatever the whiteout names; absence is fine.
fn apply_whiteout(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(ExtractionError::operation("lstat", path, e)),
    };
    debug!(path = %path.display(), "applying whiteout");
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
    .map_err(|e| ExtractionError::operation("remove", path, e))
}

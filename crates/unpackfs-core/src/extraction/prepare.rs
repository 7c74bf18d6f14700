//! Making room for a new filesystem object.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::rc::Rc;

use nix::unistd::AccessFlags;
use tracing::debug;
use tracing::info;

use crate::ExtractionError;
use crate::Result;
use crate::ops::FsOps;
use crate::types::Entry;

/// Mode a read-only parent is opened up to while a child is created in it.
const OPEN_DIR_MODE: u32 = 0o777;

/// Restores a parent directory's mode after one creation. Must be run
/// exactly once, whatever the creation's outcome.
#[must_use]
pub(crate) struct LocalCleanup(Option<Box<dyn FnOnce() -> Result<()>>>);

impl LocalCleanup {
    pub(crate) fn noop() -> Self {
        Self(None)
    }

    fn restore_mode(ops: &Rc<dyn FsOps>, dir: &Path, mode: u32) -> Self {
        let ops = Rc::clone(ops);
        let dir = dir.to_path_buf();
        Self(Some(Box::new(move || {
            debug!("restoring {} to {mode:04o}", dir.display());
            ops.chmod(&dir, mode)
        })))
    }

    #[cfg(test)]
    pub(crate) fn is_noop(&self) -> bool {
        self.0.is_none()
    }

    pub(crate) fn run(self) -> Result<()> {
        self.0.map_or(Ok(()), |action| action())
    }
}

pub(crate) fn is_writable(dir: &Path) -> bool {
    nix::unistd::access(dir, AccessFlags::W_OK).is_ok()
}

/// Prepares `path` to receive `entry`.
///
/// The parent must be an existing directory. If it is not writable it is
/// temporarily chmod'ed to `0777` and the returned cleanup puts the old mode
/// back. Whatever already sits at `path` is removed, except a directory when
/// `entry` is itself a directory.
///
/// The cleanup is returned even when preparation fails, since the parent
/// may already have been opened up.
pub(crate) fn prepare_write(
    ops: &Rc<dyn FsOps>,
    path: &Path,
    entry: &Entry,
) -> (LocalCleanup, Result<()>) {
    prepare_write_with(ops, path, entry, is_writable)
}

/// [`prepare_write`] with the parent writability check supplied by the caller.
fn prepare_write_with(
    ops: &Rc<dyn FsOps>,
    path: &Path,
    entry: &Entry,
    writable: impl Fn(&Path) -> bool,
) -> (LocalCleanup, Result<()>) {
    let not_a_dir = |parent: &Path| ExtractionError::NotADirectory {
        path: path.to_path_buf(),
        parent: parent.to_path_buf(),
    };

    let Some(parent) = path.parent() else {
        return (LocalCleanup::noop(), Err(not_a_dir(Path::new("/"))));
    };
    let parent_meta = match fs::metadata(parent) {
        Ok(meta) if meta.is_dir() => meta,
        Ok(_) => return (LocalCleanup::noop(), Err(not_a_dir(parent))),
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
            ) =>
        {
            return (LocalCleanup::noop(), Err(not_a_dir(parent)));
        }
        Err(e) => {
            return (
                LocalCleanup::noop(),
                Err(ExtractionError::operation("stat", parent, e)),
            );
        }
    };

    let mut cleanup = LocalCleanup::noop();
    if !writable(parent) {
        let old_mode = parent_meta.permissions().mode() & 0o7777;
        debug!(parent = %parent.display(), "parent not writable, opening it up");
        if let Err(e) = ops.chmod(parent, OPEN_DIR_MODE) {
            return (cleanup, Err(e));
        }
        let set_back = LocalCleanup::restore_mode(ops, parent, old_mode);
        if !writable(parent) {
            let restore_failed = set_back.run().is_err();
            return (
                LocalCleanup::noop(),
                Err(ExtractionError::ParentNotWritable {
                    parent: parent.to_path_buf(),
                    restore_failed,
                }),
            );
        }
        cleanup = set_back;
    }

    let existing = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return (cleanup, Ok(())),
        Err(e) => return (cleanup, Err(ExtractionError::operation("lstat", path, e))),
    };

    let removed = if existing.is_dir() {
        if entry.is_dir() {
            return (cleanup, Ok(()));
        }
        debug!(path = %path.display(), "removing directory in the way");
        fs::remove_dir_all(path)
    } else {
        debug!(path = %path.display(), "removing existing entry");
        fs::remove_file(path)
    };
    (
        cleanup,
        removed.map_err(|e| ExtractionError::operation("remove", path, e)),
    )
}

/// Runs `create` between [`prepare_write`] and its cleanup.
///
/// A creation (or preparation) error wins over a cleanup error, which is
/// then only logged. A cleanup error after a successful creation is
/// returned.
pub(crate) fn do_create<T>(
    ops: &Rc<dyn FsOps>,
    path: &Path,
    entry: &Entry,
    create: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let (cleanup, prepared) = prepare_write(ops, path, entry);
    let created = prepared.and_then(|()| create());

    match (created, cleanup.run()) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(cleanup_err)) => Err(cleanup_err),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_err)) => {
            info!(
                path = %path.display(),
                error = %cleanup_err,
                "parent mode restore failed after a failed create"
            );
            Err(e)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ops::NativeOps;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn native() -> Rc<dyn FsOps> {
        Rc::new(NativeOps)
    }

    fn is_root() -> bool {
        nix::unistd::geteuid().is_root()
    }

    #[test]
    fn test_missing_parent_is_not_a_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing/child");
        let (cleanup, result) = prepare_write(&native(), &path, &Entry::regular("/x", 0));
        assert!(cleanup.is_noop());
        let err = result.unwrap_err();
        assert!(matches!(err, ExtractionError::NotADirectory { .. }));
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_file_parent_is_not_a_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("f"), b"").unwrap();
        let path = temp.path().join("f/child");
        let (_, result) = prepare_write(&native(), &path, &Entry::regular("/x", 0));
        assert!(matches!(result, Err(ExtractionError::NotADirectory { .. })));
    }

    #[test]
    fn test_parent_behind_file_is_not_a_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("f"), b"").unwrap();
        let path = temp.path().join("f/sub/child");
        let (_, result) = prepare_write(&native(), &path, &Entry::regular("/x", 0));
        assert!(matches!(result, Err(ExtractionError::NotADirectory { .. })));
    }

    #[test]
    fn test_unreadable_parent_is_stat_error() {
        let temp = TempDir::new().unwrap();
        std::os::unix::fs::symlink("loop", temp.path().join("loop")).unwrap();
        let path = temp.path().join("loop/child");
        let (cleanup, result) = prepare_write(&native(), &path, &Entry::regular("/x", 0));
        assert!(cleanup.is_noop());
        match result.unwrap_err() {
            ExtractionError::Operation { operation, path, .. } => {
                assert_eq!(operation, "stat");
                assert_eq!(path, temp.path().join("loop"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_absent_target_needs_nothing() {
        let temp = TempDir::new().unwrap();
        let (cleanup, result) =
            prepare_write(&native(), &temp.path().join("new"), &Entry::regular("/x", 0));
        result.unwrap();
        assert!(cleanup.is_noop());
        cleanup.run().unwrap();
    }

    #[test]
    fn test_existing_file_is_unlinked() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f");
        std::fs::write(&path, b"old").unwrap();
        let (cleanup, result) = prepare_write(&native(), &path, &Entry::fifo("/f"));
        result.unwrap();
        cleanup.run().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_existing_directory_kept_for_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("d");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"").unwrap();
        let (_, result) = prepare_write(&native(), &path, &Entry::directory("/d"));
        result.unwrap();
        assert!(path.join("keep").exists());
    }

    #[test]
    fn test_existing_directory_purged_for_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("d");
        std::fs::create_dir_all(path.join("nested")).unwrap();
        let (_, result) = prepare_write(&native(), &path, &Entry::regular("/d", 0));
        result.unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_read_only_parent_opened_and_restored() {
        if is_root() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let parent = temp.path().join("ro");
        std::fs::create_dir(&parent).unwrap();
        std::fs::set_permissions(&parent, fs::Permissions::from_mode(0o555)).unwrap();

        let path = parent.join("child");
        let (cleanup, result) = prepare_write(&native(), &path, &Entry::regular("/ro/child", 0));
        result.unwrap();
        assert!(!cleanup.is_noop());
        assert!(is_writable(&parent));
        std::fs::write(&path, b"x").unwrap();

        cleanup.run().unwrap();
        let mode = std::fs::metadata(&parent).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o555);

        std::fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn mode_of(path: &Path) -> u32 {
        std::fs::metadata(path).unwrap().permissions().mode() & 0o7777
    }

    #[test]
    fn test_parent_opened_when_check_fails_once() {
        let temp = TempDir::new().unwrap();
        let parent = temp.path().join("d");
        std::fs::create_dir(&parent).unwrap();
        std::fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();

        let checks = Cell::new(0);
        let writable = |_: &Path| {
            checks.set(checks.get() + 1);
            checks.get() > 1
        };
        let (cleanup, result) = prepare_write_with(
            &native(),
            &parent.join("child"),
            &Entry::regular("/d/child", 0),
            writable,
        );
        result.unwrap();
        assert_eq!(checks.get(), 2);
        assert_eq!(mode_of(&parent), OPEN_DIR_MODE);

        cleanup.run().unwrap();
        assert_eq!(mode_of(&parent), 0o755);
    }

    #[test]
    fn test_parent_still_not_writable_is_restored() {
        let temp = TempDir::new().unwrap();
        let parent = temp.path().join("d");
        std::fs::create_dir(&parent).unwrap();
        std::fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();

        let (cleanup, result) = prepare_write_with(
            &native(),
            &parent.join("child"),
            &Entry::regular("/d/child", 0),
            |_: &Path| false,
        );
        assert!(cleanup.is_noop());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::ParentNotWritable {
                restore_failed: false,
                ..
            }
        ));
        assert!(!err.to_string().contains("failed setting back"));
        assert_eq!(mode_of(&parent), 0o755);
    }

    #[test]
    fn test_do_create_create_error_wins() {
        let temp = TempDir::new().unwrap();
        let result: Result<()> = do_create(
            &native(),
            &temp.path().join("x"),
            &Entry::regular("/x", 0),
            || Err(ExtractionError::InvalidArchive("boom".into())),
        );
        assert_eq!(result.unwrap_err().context(), Some("boom"));
    }

    #[test]
    fn test_do_create_skips_create_when_preparation_fails() {
        let temp = TempDir::new().unwrap();
        let called = Cell::new(false);
        let result = do_create(
            &native(),
            &temp.path().join("missing/x"),
            &Entry::regular("/missing/x", 0),
            || {
                called.set(true);
                Ok(())
            },
        );
        assert!(matches!(result, Err(ExtractionError::NotADirectory { .. })));
        assert!(!called.get());
    }

    /// chmod succeeds when opening a parent and fails when restoring it.
    struct FailingRestore;

    impl FsOps for FailingRestore {
        fn name(&self) -> &'static str {
            "failing-restore"
        }

        fn chmod(&self, path: &Path, mode: u32) -> Result<()> {
            if mode == OPEN_DIR_MODE {
                NativeOps.chmod(path, mode)
            } else {
                Err(ExtractionError::operation("chmod", path, "injected"))
            }
        }

        fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<()> {
            NativeOps.chown(path, uid, gid)
        }

        fn mknod(&self, path: &Path, entry: &Entry) -> Result<()> {
            NativeOps.mknod(path, entry)
        }
    }

    #[test]
    fn test_parent_still_not_writable_and_restore_fails() {
        let temp = TempDir::new().unwrap();
        let parent = temp.path().join("d");
        std::fs::create_dir(&parent).unwrap();
        std::fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();

        let ops: Rc<dyn FsOps> = Rc::new(FailingRestore);
        let (cleanup, result) = prepare_write_with(
            &ops,
            &parent.join("child"),
            &Entry::regular("/d/child", 0),
            |_: &Path| false,
        );
        assert!(cleanup.is_noop());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::ParentNotWritable {
                restore_failed: true,
                ..
            }
        ));
        assert!(err.to_string().contains("failed setting back"));
        assert_eq!(mode_of(&parent), OPEN_DIR_MODE);
    }

    #[test]
    fn test_do_create_cleanup_error_after_success_is_returned() {
        if is_root() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let parent = temp.path().join("ro");
        std::fs::create_dir(&parent).unwrap();
        std::fs::set_permissions(&parent, fs::Permissions::from_mode(0o555)).unwrap();

        let ops: Rc<dyn FsOps> = Rc::new(FailingRestore);
        let path = parent.join("f");
        let result = do_create(&ops, &path, &Entry::regular("/ro/f", 0), || {
            std::fs::write(&path, b"").map_err(ExtractionError::from)
        });
        assert_eq!(result.unwrap_err().context(), Some("injected"));
        assert!(path.exists());

        std::fs::set_permissions(&parent, fs::Permissions::from_mode(0o555)).unwrap();
        let result: Result<()> = do_create(&ops, &parent.join("g"), &Entry::regular("/ro/g", 0), || {
            Err(ExtractionError::InvalidArchive("create failed".into()))
        });
        assert_eq!(result.unwrap_err().context(), Some("create failed"));

        std::fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();
    }
}

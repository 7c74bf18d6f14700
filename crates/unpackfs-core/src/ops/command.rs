//! External `chmod`, `chown` and `mknod` commands.
//!
//! fakeroot intercepts the libc calls of the processes it launches, so
//! spawning the coreutils binaries records ownership and device nodes in
//! the fakeroot database even when this process links libc statically or
//! issues raw syscalls.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use super::FsOps;
use super::NODE_PERM;
use crate::ExtractionError;
use crate::Result;
use crate::types::Entry;
use crate::types::EntryKind;

/// Runs the coreutils binaries found on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandOps;

impl CommandOps {
    /// Builds the `mknod` argument list for `entry`, or `None` for kinds
    /// `mknod` cannot create.
    ///
    /// # Examples
    ///
    /// ```
    /// use unpackfs_core::ops::CommandOps;
    /// use unpackfs_core::{DeviceNumber, Entry};
    ///
    /// let tty = Entry::char_device("/dev/tty1", DeviceNumber::from_parts(4, 1));
    /// let args = CommandOps::mknod_args("/out/dev/tty1".as_ref(), &tty).unwrap();
    /// assert_eq!(args, ["--mode=644", "/out/dev/tty1", "c", "4", "1"]);
    /// ```
    #[must_use]
    pub fn mknod_args(path: &Path, entry: &Entry) -> Option<Vec<String>> {
        let node_type = match entry.kind() {
            EntryKind::BlockDevice => "b",
            EntryKind::CharDevice => "c",
            EntryKind::Fifo => "p",
            _ => return None,
        };
        let mut args = vec![
            format!("--mode={NODE_PERM:o}"),
            path.to_string_lossy().into_owned(),
            node_type.to_string(),
        ];
        if entry.kind() != EntryKind::Fifo {
            let dev = entry.device().unwrap_or_default();
            args.push(dev.major().to_string());
            args.push(dev.minor().to_string());
        }
        Some(args)
    }
}

fn run<I, S>(operation: &'static str, path: &Path, program: &str, args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args);
    debug!(command = ?cmd, "running");

    let output = cmd
        .output()
        .map_err(|e| ExtractionError::operation(operation, path, format!("{program}: {e}")))?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let reason = match stderr.trim() {
        "" => format!("{program} exited with {}", output.status),
        msg => msg.to_string(),
    };
    Err(ExtractionError::operation(operation, path, reason))
}

impl FsOps for CommandOps {
    fn name(&self) -> &'static str {
        "command"
    }

    fn chmod(&self, path: &Path, mode: u32) -> Result<()> {
        run(
            "chmod",
            path,
            "chmod",
            [OsStr::new(&format!("{mode:04o}")), path.as_os_str()],
        )
    }

    fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<()> {
        run(
            "chown",
            path,
            "chown",
            [
                OsStr::new("--no-dereference"),
                OsStr::new(&format!("{uid}:{gid}")),
                path.as_os_str(),
            ],
        )
    }

    fn mknod(&self, path: &Path, entry: &Entry) -> Result<()> {
        let args = Self::mknod_args(path, entry).ok_or_else(|| {
            ExtractionError::operation(
                "mknod",
                path,
                format!("cannot create a {} node", entry.kind().name()),
            )
        })?;
        run("mknod", path, "mknod", &args).map_err(|e| {
            if std::fs::symlink_metadata(path).is_ok() {
                ExtractionError::operation("mknod", path, "already exists")
            } else {
                e
            }
        })
    }
}

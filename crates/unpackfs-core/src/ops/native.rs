//! Direct syscalls.

use std::fs::Permissions;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use nix::sys::stat::Mode;
use nix::sys::stat::SFlag;

use super::FsOps;
use super::NODE_PERM;
use crate::ExtractionError;
use crate::Result;
use crate::types::Entry;

/// Calls `chmod`, `lchown` and `mknod` in-process.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeOps;

impl FsOps for NativeOps {
    fn name(&self) -> &'static str {
        "native"
    }

    fn chmod(&self, path: &Path, mode: u32) -> Result<()> {
        std::fs::set_permissions(path, Permissions::from_mode(mode))
            .map_err(|e| ExtractionError::operation("chmod", path, e))
    }

    fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<()> {
        std::os::unix::fs::lchown(path, Some(uid), Some(gid))
            .map_err(|e| ExtractionError::operation("chown", path, e))
    }

    fn mknod(&self, path: &Path, entry: &Entry) -> Result<()> {
        let dev = entry.device().unwrap_or_default();
        let kind = SFlag::from_bits_truncate(entry.kind().type_bits());
        nix::sys::stat::mknod(
            path,
            kind,
            Mode::from_bits_truncate(NODE_PERM),
            nix::sys::stat::makedev(u64::from(dev.major()), u64::from(dev.minor())),
        )
        .map_err(|e| ExtractionError::operation("mknod", path, e))
    }
}

//! Privileged filesystem operations: chmod, chown and mknod.
//!
//! Under a root-emulation layer such as fakeroot the same three calls have
//! to be routed differently for the emulated ownership and device nodes to
//! stick. [`FsOps`] hides the route; [`select`] picks one per run.

pub mod command;
pub mod library;
pub mod native;

pub use command::CommandOps;
pub use library::LibraryOps;
pub use native::NativeOps;

use std::path::Path;
use std::rc::Rc;

use tracing::debug;
use tracing::warn;

use crate::OpsKind;
use crate::Result;
use crate::types::Entry;

/// Environment variable set by fakeroot inside its sessions.
pub const FAKEROOT_ENV: &str = "FAKEROOTKEY";

/// Permission bits given to every node created by `mknod`.
pub const NODE_PERM: u32 = 0o644;

/// The operations that need root, or an emulation of it.
pub trait FsOps {
    /// Short provider name for logs and reports.
    fn name(&self) -> &'static str;

    /// Sets the permission bits of `path`.
    fn chmod(&self, path: &Path, mode: u32) -> Result<()>;

    /// Sets the owner of `path` without following a final symlink.
    fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<()>;

    /// Creates the device node or fifo described by `entry` at `path`.
    fn mknod(&self, path: &Path, entry: &Entry) -> Result<()>;
}

/// Returns `true` when running inside a fakeroot session.
#[must_use]
pub fn in_fakeroot() -> bool {
    std::env::var_os(FAKEROOT_ENV).is_some()
}

/// Resolves `kind` into a provider, probing the environment for
/// [`OpsKind::Auto`].
///
/// # Errors
///
/// Returns [`ExtractionError::ProviderUnavailable`](crate::ExtractionError::ProviderUnavailable)
/// if [`OpsKind::Library`] was requested and the library cannot be loaded.
pub fn select(kind: OpsKind) -> Result<Rc<dyn FsOps>> {
    select_with(kind, in_fakeroot(), library::FAKEROOT_LIBRARY)
}

/// [`select`] with the fakeroot probe and library name supplied.
pub fn select_with(kind: OpsKind, fakeroot: bool, library: &str) -> Result<Rc<dyn FsOps>> {
    let ops: Rc<dyn FsOps> = match kind {
        OpsKind::Native => Rc::new(NativeOps),
        OpsKind::Command => Rc::new(CommandOps),
        OpsKind::Library => Rc::new(LibraryOps::load_from(library)?),
        OpsKind::Auto if !fakeroot => Rc::new(NativeOps),
        OpsKind::Auto => match LibraryOps::load_from(library) {
            Ok(lib) => Rc::new(lib),
            Err(e) => {
                warn!(error = %e, "fakeroot library unavailable, using external commands");
                Rc::new(CommandOps)
            }
        },
    };
    debug!(requested = %kind, provider = ops.name(), "selected privileged operations");
    Ok(ops)
}

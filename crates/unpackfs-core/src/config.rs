//! Extraction options.

use std::fmt;
use std::str::FromStr;

/// Which privileged-operation provider a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpsKind {
    /// Native syscalls unless `FAKEROOTKEY` is set, in which case the
    /// fakeroot library is tried first and the command-line tools second.
    #[default]
    Auto,
    /// In-process syscalls.
    Native,
    /// External `chmod`, `chown` and `mknod` commands.
    Command,
    /// Symbols resolved from `libfakeroot-sysv.so`.
    Library,
}

impl OpsKind {
    /// Lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Native => "native",
            Self::Command => "command",
            Self::Library => "library",
        }
    }
}

impl fmt::Display for OpsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "native" => Ok(Self::Native),
            "command" => Ok(Self::Command),
            "library" => Ok(Self::Library),
            other => Err(format!(
                "unknown ops provider '{other}' (expected auto, native, command or library)"
            )),
        }
    }
}

/// Switches controlling what an extraction reproduces.
///
/// Everything is off by default: files, directories, symlinks and fifos are
/// always created, but ownership, recorded permissions, device nodes,
/// sockets and whiteouts each need opting in.
///
/// # Examples
///
/// ```
/// use unpackfs_core::{ExtractOptions, OpsKind};
///
/// let opts = ExtractOptions::default()
///     .with_perms(true)
///     .with_whiteouts(true)
///     .with_ops(OpsKind::Native);
/// assert!(opts.extract_perms);
/// assert!(!opts.extract_owners);
///
/// let everything = ExtractOptions::all();
/// assert!(everything.extract_devices && everything.apply_whiteouts);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Apply recorded uid/gid.
    pub extract_owners: bool,

    /// Apply recorded permission bits (never on symlinks).
    pub extract_perms: bool,

    /// Create block and character device nodes.
    pub extract_devices: bool,

    /// Create Unix sockets.
    pub extract_sockets: bool,

    /// Treat (0,0) character devices as whiteouts and delete their targets.
    pub apply_whiteouts: bool,

    /// Privileged-operation provider.
    pub ops: OpsKind,
}

impl ExtractOptions {
    /// Options with every switch on and `OpsKind::Auto`.
    #[must_use]
    pub fn all() -> Self {
        Self {
            extract_owners: true,
            extract_perms: true,
            extract_devices: true,
            extract_sockets: true,
            apply_whiteouts: true,
            ops: OpsKind::Auto,
        }
    }

    /// Sets `extract_owners`.
    #[must_use]
    pub fn with_owners(mut self, on: bool) -> Self {
        self.extract_owners = on;
        self
    }

    /// Sets `extract_perms`.
    #[must_use]
    pub fn with_perms(mut self, on: bool) -> Self {
        self.extract_perms = on;
        self
    }

    /// Sets `extract_devices`.
    #[must_use]
    pub fn with_devices(mut self, on: bool) -> Self {
        self.extract_devices = on;
        self
    }

    /// Sets `extract_sockets`.
    #[must_use]
    pub fn with_sockets(mut self, on: bool) -> Self {
        self.extract_sockets = on;
        self
    }

    /// Sets `apply_whiteouts`.
    #[must_use]
    pub fn with_whiteouts(mut self, on: bool) -> Self {
        self.apply_whiteouts = on;
        self
    }

    /// Sets the provider.
    #[must_use]
    pub fn with_ops(mut self, ops: OpsKind) -> Self {
        self.ops = ops;
        self
    }
}

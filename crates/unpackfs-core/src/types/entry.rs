//! Archive entry metadata.

use std::fmt;

use chrono::DateTime;

const S_IFMT: u32 = 0o170_000;
const S_IFSOCK: u32 = 0o140_000;
const S_IFLNK: u32 = 0o120_000;
const S_IFREG: u32 = 0o100_000;
const S_IFBLK: u32 = 0o060_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFCHR: u32 = 0o020_000;
const S_IFIFO: u32 = 0o010_000;

/// Permission bits, including setuid, setgid and sticky.
pub const PERM_MASK: u32 = 0o7777;

/// Kind of filesystem object an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file with content.
    Regular,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Named pipe.
    Fifo,
    /// Unix domain socket.
    Socket,
    /// Block device node.
    BlockDevice,
    /// Character device node. A (0,0) character device is a whiteout.
    CharDevice,
    /// Anything the source could not classify.
    Irregular,
}

impl EntryKind {
    /// Returns the `S_IFMT` type bits for this kind.
    ///
    /// Irregular entries have no type bits.
    #[must_use]
    pub const fn type_bits(self) -> u32 {
        match self {
            Self::Regular => S_IFREG,
            Self::Directory => S_IFDIR,
            Self::Symlink => S_IFLNK,
            Self::Fifo => S_IFIFO,
            Self::Socket => S_IFSOCK,
            Self::BlockDevice => S_IFBLK,
            Self::CharDevice => S_IFCHR,
            Self::Irregular => 0,
        }
    }

    /// Classifies raw `st_mode` type bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use unpackfs_core::EntryKind;
    ///
    /// assert_eq!(EntryKind::from_mode(0o040755), EntryKind::Directory);
    /// assert_eq!(EntryKind::from_mode(0o100644), EntryKind::Regular);
    /// assert_eq!(EntryKind::from_mode(0o000644), EntryKind::Irregular);
    /// ```
    #[must_use]
    pub const fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFREG => Self::Regular,
            S_IFDIR => Self::Directory,
            S_IFLNK => Self::Symlink,
            S_IFIFO => Self::Fifo,
            S_IFSOCK => Self::Socket,
            S_IFBLK => Self::BlockDevice,
            S_IFCHR => Self::CharDevice,
            _ => Self::Irregular,
        }
    }

    /// Short lowercase name used in messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Fifo => "fifo",
            Self::Socket => "socket",
            Self::BlockDevice => "block device",
            Self::CharDevice => "char device",
            Self::Irregular => "irregular",
        }
    }

    const fn ls_char(self) -> char {
        match self {
            Self::Regular => '-',
            Self::Directory => 'd',
            Self::Symlink => 'l',
            Self::Fifo => 'p',
            Self::Socket => 's',
            Self::BlockDevice => 'b',
            Self::CharDevice => 'c',
            Self::Irregular => '?',
        }
    }

    const fn default_mode(self) -> u32 {
        match self {
            Self::Directory => 0o755,
            Self::Symlink => 0o777,
            _ => 0o644,
        }
    }
}

/// Device number in the legacy 16-bit encoding, `major * 256 + minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceNumber(u32);

impl DeviceNumber {
    /// Wraps a raw encoded device number.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Encodes a major/minor pair.
    ///
    /// # Examples
    ///
    /// ```
    /// use unpackfs_core::DeviceNumber;
    ///
    /// let dev = DeviceNumber::from_parts(8, 1);
    /// assert_eq!(dev.raw(), 2049);
    /// assert_eq!((dev.major(), dev.minor()), (8, 1));
    /// ```
    #[must_use]
    pub const fn from_parts(major: u32, minor: u32) -> Self {
        Self(major * 256 + minor % 256)
    }

    /// Raw encoded value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Major number (`raw / 256`).
    #[must_use]
    pub const fn major(self) -> u32 {
        self.0 / 256
    }

    /// Minor number (`raw % 256`).
    #[must_use]
    pub const fn minor(self) -> u32 {
        self.0 % 256
    }
}

/// Metadata of one entry in a source image.
///
/// Exactly one of symlink target, device number, or file content applies,
/// selected by [`EntryKind`]. The constructors enforce this; there is no way
/// to build a symlink without a target or a device without a number.
///
/// # Examples
///
/// ```
/// use unpackfs_core::{DeviceNumber, Entry, EntryKind};
///
/// let file = Entry::regular("/etc/hostname", 9).with_mode(0o600).with_owner(0, 0);
/// assert_eq!(file.kind(), EntryKind::Regular);
/// assert_eq!(file.st_mode(), 0o100600);
///
/// let whiteout = Entry::char_device("/etc/motd", DeviceNumber::new(0));
/// assert!(whiteout.is_whiteout());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    path: String,
    kind: EntryKind,
    mode: u32,
    uid: u32,
    gid: u32,
    size: u64,
    mtime: i64,
    symlink_target: Option<String>,
    device: Option<DeviceNumber>,
}

impl Entry {
    fn new(path: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
            mode: kind.default_mode(),
            uid: 0,
            gid: 0,
            size: 0,
            mtime: 0,
            symlink_target: None,
            device: None,
        }
    }

    /// Regular file of `size` bytes.
    #[must_use]
    pub fn regular(path: impl Into<String>, size: u64) -> Self {
        let mut entry = Self::new(path, EntryKind::Regular);
        entry.size = size;
        entry
    }

    /// Directory.
    #[must_use]
    pub fn directory(path: impl Into<String>) -> Self {
        Self::new(path, EntryKind::Directory)
    }

    /// Symbolic link pointing at `target`, stored verbatim.
    #[must_use]
    pub fn symlink(path: impl Into<String>, target: impl Into<String>) -> Self {
        let mut entry = Self::new(path, EntryKind::Symlink);
        let target = target.into();
        entry.size = target.len() as u64;
        entry.symlink_target = Some(target);
        entry
    }

    /// Named pipe.
    #[must_use]
    pub fn fifo(path: impl Into<String>) -> Self {
        Self::new(path, EntryKind::Fifo)
    }

    /// Unix domain socket.
    #[must_use]
    pub fn socket(path: impl Into<String>) -> Self {
        Self::new(path, EntryKind::Socket)
    }

    /// Block device node.
    #[must_use]
    pub fn block_device(path: impl Into<String>, device: DeviceNumber) -> Self {
        let mut entry = Self::new(path, EntryKind::BlockDevice);
        entry.device = Some(device);
        entry
    }

    /// Character device node.
    #[must_use]
    pub fn char_device(path: impl Into<String>, device: DeviceNumber) -> Self {
        let mut entry = Self::new(path, EntryKind::CharDevice);
        entry.device = Some(device);
        entry
    }

    /// Entry of a kind the source could not classify.
    #[must_use]
    pub fn irregular(path: impl Into<String>) -> Self {
        Self::new(path, EntryKind::Irregular)
    }

    /// Sets the permission bits. Type bits in `mode` are ignored.
    #[must_use]
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode & PERM_MASK;
        self
    }

    /// Sets the numeric owner and group.
    #[must_use]
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    /// Sets the modification time in seconds since the epoch.
    #[must_use]
    pub fn with_mtime(mut self, mtime: i64) -> Self {
        self.mtime = mtime;
        self
    }

    /// Same metadata, different logical path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Logical slash-separated path; the root is `/`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Final path component, or `/` for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        match self.path.trim_end_matches('/').rsplit_once('/') {
            Some((_, name)) if !name.is_empty() => name,
            _ => "/",
        }
    }

    /// Entry kind.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Permission bits (`0o7777` mask).
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.mode
    }

    /// Permission bits combined with the type bits, as `st_mode` would show.
    #[must_use]
    pub const fn st_mode(&self) -> u32 {
        self.kind.type_bits() | self.mode
    }

    /// Owner uid.
    #[must_use]
    pub const fn uid(&self) -> u32 {
        self.uid
    }

    /// Owner gid.
    #[must_use]
    pub const fn gid(&self) -> u32 {
        self.gid
    }

    /// Recorded size in bytes; only meaningful for regular files.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Modification time in seconds since the epoch.
    #[must_use]
    pub const fn mtime(&self) -> i64 {
        self.mtime
    }

    /// Symlink target, for symlinks only.
    #[must_use]
    pub fn symlink_target(&self) -> Option<&str> {
        self.symlink_target.as_deref()
    }

    /// Device number, for block and character devices only.
    #[must_use]
    pub const fn device(&self) -> Option<DeviceNumber> {
        self.device
    }

    /// Returns `true` for directories.
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    /// Returns `true` for symlinks.
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        matches!(self.kind, EntryKind::Symlink)
    }

    /// Returns `true` for regular files.
    #[must_use]
    pub const fn is_regular(&self) -> bool {
        matches!(self.kind, EntryKind::Regular)
    }

    /// Returns `true` for block and character devices.
    #[must_use]
    pub const fn is_device(&self) -> bool {
        matches!(self.kind, EntryKind::BlockDevice | EntryKind::CharDevice)
    }

    /// Returns `true` for an overlay whiteout: a (0,0) character device.
    #[must_use]
    pub fn is_whiteout(&self) -> bool {
        self.kind == EntryKind::CharDevice && self.device.is_some_and(|dev| dev.raw() == 0)
    }
}

/// Renders permission bits the way `ls -l` does, e.g. `drwxr-xr-x`.
///
/// # Examples
///
/// ```
/// use unpackfs_core::EntryKind;
/// use unpackfs_core::types::entry::mode_string;
///
/// assert_eq!(mode_string(EntryKind::Directory, 0o755), "drwxr-xr-x");
/// assert_eq!(mode_string(EntryKind::Regular, 0o4755), "-rwsr-xr-x");
/// assert_eq!(mode_string(EntryKind::Directory, 0o1777), "drwxrwxrwt");
/// ```
#[must_use]
pub fn mode_string(kind: EntryKind, mode: u32) -> String {
    const SPECIAL: [(u32, char, char); 3] = [(0o4000, 's', 'S'), (0o2000, 's', 'S'), (0o1000, 't', 'T')];

    let mut out = String::with_capacity(10);
    out.push(kind.ls_char());
    for (class, (special_bit, set, unset)) in SPECIAL.iter().enumerate() {
        let shift = 6 - 3 * class as u32;
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        let exec = bits & 0o1 != 0;
        out.push(match (mode & special_bit != 0, exec) {
            (true, true) => *set,
            (true, false) => *unset,
            (false, true) => 'x',
            (false, false) => '-',
        });
    }
    out
}

impl fmt::Display for Entry {
    /// One `ls -l` style line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = match self.device {
            Some(dev) => format!("{:5}, {:5}", dev.major(), dev.minor()),
            None => format!("{:12}", self.size),
        };
        let when = DateTime::from_timestamp(self.mtime, 0)
            .map(|t| t.format("%b %e %H:%M").to_string())
            .unwrap_or_default();

        write!(
            f,
            "{} {:4} {:4} {} {} {}",
            mode_string(self.kind, self.mode),
            self.uid,
            self.gid,
            size,
            when,
            self.path
        )?;
        if self.is_dir() && self.path != "/" {
            f.write_str("/")?;
        }
        if let Some(target) = &self.symlink_target {
            write!(f, " -> {target}")?;
        }
        Ok(())
    }
}

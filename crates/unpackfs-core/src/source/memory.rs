//! In-memory image, mainly for tests and embedders that build trees in code.

use std::collections::HashMap;
use std::io::Cursor;

use super::ArchiveSource;
use super::ContentReader;
use super::index::TreeIndex;
use crate::ExtractionError;
use crate::Result;
use crate::types::Entry;

/// An image held entirely in memory.
///
/// # Examples
///
/// ```
/// use unpackfs_core::source::{ArchiveSource, MemoryArchive};
///
/// let image = MemoryArchive::builder()
///     .file("/etc/hostname", b"box\n", 0o644)
///     .symlink("/bin/sh", "busybox")
///     .build();
///
/// let etc = image.lookup("/etc")?;
/// assert!(etc.is_dir());
/// assert_eq!(image.list_children(&etc)?, vec!["hostname"]);
/// # Ok::<(), unpackfs_core::ExtractionError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MemoryArchive {
    index: TreeIndex,
    data: HashMap<String, Vec<u8>>,
}

impl MemoryArchive {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> MemoryArchiveBuilder {
        MemoryArchiveBuilder::new()
    }

    /// Number of entries, including the root and synthesized directories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if only the root exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.len() <= 1
    }
}

impl ArchiveSource for MemoryArchive {
    fn lookup(&self, path: &str) -> Result<Entry> {
        self.index.lookup(path)
    }

    fn list_children(&self, dir: &Entry) -> Result<Vec<String>> {
        self.index.list_children(dir)
    }

    fn open_content(&self, file: &Entry) -> Result<Box<dyn ContentReader + '_>> {
        if !file.is_regular() {
            return Err(ExtractionError::InvalidArchive(format!(
                "{} is a {}, not a regular file",
                file.path(),
                file.kind().name()
            )));
        }
        let data = self.data.get(file.path()).map_or(&[][..], Vec::as_slice);
        Ok(Box::new(Cursor::new(data)))
    }
}

/// Builder for [`MemoryArchive`].
///
/// Paths may omit the leading `/`. Missing parent directories are created
/// with mode `0755`, owned by root. Adding a path twice keeps the later
/// metadata. The chaining methods skip paths containing `..`; call
/// [`try_entry`] to observe that error.
///
/// [`try_entry`]: MemoryArchiveBuilder::try_entry
#[derive(Debug, Clone)]
pub struct MemoryArchiveBuilder {
    archive: MemoryArchive,
}

impl MemoryArchiveBuilder {
    /// Creates a builder holding just the root directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            archive: MemoryArchive {
                index: TreeIndex::new(),
                data: HashMap::new(),
            },
        }
    }

    /// Adds an arbitrary entry with optional content.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] for paths with `..`.
    pub fn try_entry(&mut self, entry: Entry, content: Option<Vec<u8>>) -> Result<()> {
        let path = self.archive.index.insert(entry)?;
        match content {
            Some(bytes) => {
                self.archive.data.insert(path, bytes);
            }
            None => {
                self.archive.data.remove(&path);
            }
        }
        Ok(())
    }

    /// Adds an entry, silently ignoring paths that cannot be represented.
    #[must_use]
    pub fn entry(mut self, entry: Entry, content: Option<Vec<u8>>) -> Self {
        if let Err(e) = self.try_entry(entry, content) {
            tracing::debug!(error = %e, "memory archive entry ignored");
        }
        self
    }

    /// Adds a regular file whose recorded size matches its content.
    #[must_use]
    pub fn file(self, path: &str, content: &[u8], mode: u32) -> Self {
        let entry = Entry::regular(path, content.len() as u64).with_mode(mode);
        self.entry(entry, Some(content.to_vec()))
    }

    /// Adds a regular file that records `size` bytes but holds `content`.
    ///
    /// Useful to simulate truncated images.
    #[must_use]
    pub fn file_with_size(self, path: &str, content: &[u8], size: u64) -> Self {
        self.entry(Entry::regular(path, size), Some(content.to_vec()))
    }

    /// Adds a directory.
    #[must_use]
    pub fn dir(self, path: &str, mode: u32) -> Self {
        self.entry(Entry::directory(path).with_mode(mode), None)
    }

    /// Adds a symlink.
    #[must_use]
    pub fn symlink(self, path: &str, target: &str) -> Self {
        self.entry(Entry::symlink(path, target), None)
    }

    /// Builds the image.
    #[must_use]
    pub fn build(self) -> MemoryArchive {
        self.archive
    }
}

impl Default for MemoryArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::DeviceNumber;
    use std::io::Read;

    #[test]
    fn test_lookup_and_content() {
        let image = MemoryArchive::builder()
            .file("docs/readme", b"hello", 0o600)
            .build();

        let file = image.lookup("/docs/readme").unwrap();
        assert_eq!(file.size(), 5);
        assert_eq!(file.mode(), 0o600);

        let mut out = String::new();
        image
            .open_content(&file)
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn test_declared_size_may_differ() {
        let image = MemoryArchive::builder()
            .file_with_size("/short", b"abc", 10)
            .build();
        let file = image.lookup("/short").unwrap();
        assert_eq!(file.size(), 10);
        let mut out = Vec::new();
        image.open_content(&file).unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_open_content_on_directory_fails() {
        let image = MemoryArchive::builder().dir("/d", 0o755).build();
        let dir = image.lookup("/d").unwrap();
        assert!(image.open_content(&dir).is_err());
    }

    #[test]
    fn test_special_entries() {
        let image = MemoryArchive::builder()
            .entry(Entry::char_device("/dev/null", DeviceNumber::from_parts(1, 3)), None)
            .entry(Entry::fifo("/run/pipe"), None)
            .build();
        let dev = image.lookup("/dev/null").unwrap();
        assert_eq!(dev.device().unwrap().minor(), 3);
        assert!(image.lookup("/run").unwrap().is_dir());
        assert!(!image.is_empty());
    }

    #[test]
    fn test_try_entry_reports_traversal() {
        let mut builder = MemoryArchiveBuilder::new();
        let err = builder
            .try_entry(Entry::regular("/../../etc/shadow", 0), None)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::PathTraversal { .. }));
        assert!(builder.build().is_empty());
    }
}

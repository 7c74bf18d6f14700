//! Read-only filesystem images that can be walked and extracted.
//!
//! An [`ArchiveSource`] answers three questions about an image: what is at a
//! logical path, which names a directory contains, and what bytes a regular
//! file holds. The walker and the extraction engine need nothing else, so
//! any reader (squashfs, tar, an in-memory tree) plugs in by implementing
//! the trait.

mod index;
pub mod memory;
pub mod tar;

pub use self::memory::MemoryArchive;
pub use self::memory::MemoryArchiveBuilder;
pub use self::tar::TarSource;

use std::io::Read;
use std::io::Seek;

use crate::Result;
use crate::types::Entry;

/// Sequential, seekable reader over one regular file's content.
pub trait ContentReader: Read + Seek {}

impl<T: Read + Seek + ?Sized> ContentReader for T {}

/// A hierarchical, read-only image of filesystem entries.
pub trait ArchiveSource {
    /// Returns the metadata of the entry at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::NotFound`](crate::ExtractionError::NotFound)
    /// when nothing exists at `path`, or a read error if the image is
    /// damaged.
    fn lookup(&self, path: &str) -> Result<Entry>;

    /// Lists the names (not paths) of a directory's children in image order.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` is not a directory or cannot be read.
    fn list_children(&self, dir: &Entry) -> Result<Vec<String>>;

    /// Opens the content of a regular file.
    ///
    /// # Errors
    ///
    /// Returns an error if `file` is not a regular file or its data cannot
    /// be located.
    fn open_content(&self, file: &Entry) -> Result<Box<dyn ContentReader + '_>>;
}

impl<S: ArchiveSource + ?Sized> ArchiveSource for &S {
    fn lookup(&self, path: &str) -> Result<Entry> {
        (**self).lookup(path)
    }

    fn list_children(&self, dir: &Entry) -> Result<Vec<String>> {
        (**self).list_children(dir)
    }

    fn open_content(&self, file: &Entry) -> Result<Box<dyn ContentReader + '_>> {
        (**self).open_content(file)
    }
}

impl<S: ArchiveSource + ?Sized> ArchiveSource for Box<S> {
    fn lookup(&self, path: &str) -> Result<Entry> {
        (**self).lookup(path)
    }

    fn list_children(&self, dir: &Entry) -> Result<Vec<String>> {
        (**self).list_children(dir)
    }

    fn open_content(&self, file: &Entry) -> Result<Box<dyn ContentReader + '_>> {
        (**self).open_content(file)
    }
}

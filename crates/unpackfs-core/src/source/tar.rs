//! Tar images, optionally gzip-compressed.

use std::collections::HashMap;
use std::fs::File;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use std::path::PathBuf;

use flate2::read::GzDecoder;
use tracing::debug;

use super::ArchiveSource;
use super::ContentReader;
use super::index::TreeIndex;
use crate::ExtractionError;
use crate::Result;
use crate::io::WindowReader;
use crate::types::DeviceNumber;
use crate::types::Entry;
use crate::types::logical_path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug)]
enum Backing {
    /// Uncompressed tar on disk; members are read in place.
    File(PathBuf),
    /// Decompressed (or caller supplied) tar bytes.
    Memory(Vec<u8>),
}

/// Byte range of a member's data inside the tar stream.
#[derive(Debug, Clone, Copy)]
struct Span {
    offset: u64,
    len: u64,
}

/// [`ArchiveSource`] over a tar archive.
///
/// The archive is indexed once on open. Uncompressed archives on disk are
/// not loaded into memory: each [`open_content`](ArchiveSource::open_content)
/// reopens the file and reads a window over the member's data. Gzip input,
/// detected by its magic bytes, is decompressed into memory first.
///
/// Hard links are presented as regular files sharing their target's data.
/// Tar member kinds with no filesystem counterpart become irregular entries.
///
/// # Examples
///
/// ```no_run
/// use unpackfs_core::source::{ArchiveSource, TarSource};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let image = TarSource::open("rootfs.tar.gz")?;
/// let root = image.lookup("/")?;
/// for name in image.list_children(&root)? {
///     println!("{name}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TarSource {
    backing: Backing,
    index: TreeIndex,
    spans: HashMap<String, Span>,
}

impl TarSource {
    /// Opens and indexes a tar or tar.gz file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;

        let mut magic = [0u8; 2];
        let is_gzip = matches!(file.read_exact(&mut magic), Ok(()) if magic == GZIP_MAGIC);
        file.rewind()?;

        if is_gzip {
            debug!(path = %path.display(), "decompressing gzip tar into memory");
            let mut data = Vec::new();
            GzDecoder::new(file)
                .read_to_end(&mut data)
                .map_err(|e| ExtractionError::InvalidArchive(format!("gzip: {e}")))?;
            return Self::index_bytes(data);
        }

        let (index, spans) = build_index(file)?;
        Ok(Self {
            backing: Backing::File(path.to_path_buf()),
            index,
            spans,
        })
    }

    /// Indexes a tar or tar.gz held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.starts_with(&GZIP_MAGIC) {
            let mut plain = Vec::new();
            GzDecoder::new(data.as_slice())
                .read_to_end(&mut plain)
                .map_err(|e| ExtractionError::InvalidArchive(format!("gzip: {e}")))?;
            return Self::index_bytes(plain);
        }
        Self::index_bytes(data)
    }

    fn index_bytes(data: Vec<u8>) -> Result<Self> {
        let (index, spans) = build_index(Cursor::new(data.as_slice()))?;
        Ok(Self {
            backing: Backing::Memory(data),
            index,
            spans,
        })
    }

    /// Number of indexed entries, including synthesized directories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the archive has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.len() <= 1
    }
}

fn build_index<R: Read + Seek>(reader: R) -> Result<(TreeIndex, HashMap<String, Span>)> {
    let mut archive = ::tar::Archive::new(reader);
    let mut index = TreeIndex::new();
    let mut spans = HashMap::new();

    let entries = archive
        .entries_with_seek()
        .map_err(|e| ExtractionError::InvalidArchive(e.to_string()))?;

    for member in entries {
        let member = member.map_err(|e| ExtractionError::InvalidArchive(e.to_string()))?;
        let header = member.header();
        let kind = header.entry_type();

        if matches!(
            kind,
            ::tar::EntryType::XGlobalHeader
                | ::tar::EntryType::XHeader
                | ::tar::EntryType::GNULongName
                | ::tar::EntryType::GNULongLink
        ) {
            continue;
        }

        let raw_path = member
            .path()
            .map_err(|e| ExtractionError::InvalidArchive(e.to_string()))?;
        let path = logical_path::normalize(&raw_path.to_string_lossy())?;
        let link_name = member
            .link_name()
            .map_err(|e| ExtractionError::InvalidArchive(e.to_string()))?
            .map(|l| l.to_string_lossy().into_owned());

        let mode = header.mode().map_err(invalid_header)?;
        let uid = u32::try_from(header.uid().map_err(invalid_header)?)
            .map_err(|_| ExtractionError::InvalidArchive(format!("{path}: uid out of range")))?;
        let gid = u32::try_from(header.gid().map_err(invalid_header)?)
            .map_err(|_| ExtractionError::InvalidArchive(format!("{path}: gid out of range")))?;
        let mtime = i64::try_from(header.mtime().map_err(invalid_header)?).unwrap_or(i64::MAX);

        let entry = match kind {
            ::tar::EntryType::Regular | ::tar::EntryType::Continuous => {
                spans.insert(
                    path.clone(),
                    Span {
                        offset: member.raw_file_position(),
                        len: member.size(),
                    },
                );
                Entry::regular(path.as_str(), member.size())
            }
            ::tar::EntryType::Directory => Entry::directory(path.as_str()),
            ::tar::EntryType::Symlink => {
                let target = link_name.ok_or_else(|| {
                    ExtractionError::InvalidArchive(format!("{path}: symlink without target"))
                })?;
                Entry::symlink(path.as_str(), target)
            }
            ::tar::EntryType::Link => {
                let target = link_name.ok_or_else(|| {
                    ExtractionError::InvalidArchive(format!("{path}: hard link without target"))
                })?;
                let target = logical_path::normalize(&target)?;
                let span = spans.get(&target).copied().ok_or_else(|| {
                    ExtractionError::InvalidArchive(format!(
                        "{path}: hard link to unknown file {target}"
                    ))
                })?;
                spans.insert(path.clone(), span);
                Entry::regular(path.as_str(), span.len)
            }
            ::tar::EntryType::Fifo => Entry::fifo(path.as_str()),
            ::tar::EntryType::Char | ::tar::EntryType::Block => {
                let major = header.device_major().map_err(invalid_header)?.unwrap_or(0);
                let minor = header.device_minor().map_err(invalid_header)?.unwrap_or(0);
                let device = DeviceNumber::from_parts(major, minor);
                if kind == ::tar::EntryType::Char {
                    Entry::char_device(path.as_str(), device)
                } else {
                    Entry::block_device(path.as_str(), device)
                }
            }
            other => {
                debug!(path = %path, kind = ?other, "unsupported tar member kind");
                Entry::irregular(path.as_str())
            }
        };

        let entry = entry.with_mode(mode).with_owner(uid, gid).with_mtime(mtime);
        index.insert(entry)?;
    }

    Ok((index, spans))
}

fn invalid_header(e: std::io::Error) -> ExtractionError {
    ExtractionError::InvalidArchive(format!("bad tar header: {e}"))
}

impl ArchiveSource for TarSource {
    fn lookup(&self, path: &str) -> Result<Entry> {
        self.index.lookup(path)
    }

    fn list_children(&self, dir: &Entry) -> Result<Vec<String>> {
        self.index.list_children(dir)
    }

    fn open_content(&self, file: &Entry) -> Result<Box<dyn ContentReader + '_>> {
        let path = logical_path::normalize(file.path())?;
        let is_regular = self.index.get(&path).is_some_and(Entry::is_regular);
        let span = self
            .spans
            .get(&path)
            .filter(|_| is_regular)
            .ok_or_else(|| {
                ExtractionError::InvalidArchive(format!("{path} has no file content"))
            })?;

        match &self.backing {
            Backing::File(archive) => {
                let handle = File::open(archive)?;
                Ok(Box::new(WindowReader::new(handle, span.offset, span.len)?))
            }
            Backing::Memory(data) => Ok(Box::new(WindowReader::new(
                Cursor::new(data.as_slice()),
                span.offset,
                span.len,
            )?)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::TarTestBuilder;
    use crate::types::EntryKind;
    use std::io::Write;
    use tempfile::TempDir;

    fn sample() -> Vec<u8> {
        TarTestBuilder::new()
            .add_directory("etc/", 0o755)
            .add_file("etc/hostname", b"box\n", 0o644)
            .add_symlink("bin/sh", "busybox")
            .add_hardlink("etc/hostname.bak", "etc/hostname")
            .add_char_device("dev/null", 1, 3)
            .add_block_device("dev/sda", 8, 0)
            .add_fifo("run/initctl")
            .build()
    }

    fn read_all(source: &TarSource, path: &str) -> Vec<u8> {
        let entry = source.lookup(path).unwrap();
        let mut out = Vec::new();
        source
            .open_content(&entry)
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_index_kinds() {
        let source = TarSource::from_bytes(sample()).unwrap();

        assert!(source.lookup("/etc").unwrap().is_dir());
        assert_eq!(
            source.lookup("/bin/sh").unwrap().symlink_target(),
            Some("busybox")
        );
        let null = source.lookup("/dev/null").unwrap();
        assert_eq!(null.kind(), EntryKind::CharDevice);
        assert_eq!(null.device(), Some(DeviceNumber::from_parts(1, 3)));
        assert_eq!(
            source.lookup("/dev/sda").unwrap().kind(),
            EntryKind::BlockDevice
        );
        assert_eq!(
            source.lookup("/run/initctl").unwrap().kind(),
            EntryKind::Fifo
        );
    }

    #[test]
    fn test_synthesized_parents_are_root_owned() {
        let source = TarSource::from_bytes(sample()).unwrap();
        let bin = source.lookup("/bin").unwrap();
        assert!(bin.is_dir());
        assert_eq!(bin.mode(), 0o755);
        assert_eq!((bin.uid(), bin.gid()), (0, 0));
    }

    #[test]
    fn test_content_and_hardlink_share_data() {
        let source = TarSource::from_bytes(sample()).unwrap();
        assert_eq!(read_all(&source, "/etc/hostname"), b"box\n");
        assert_eq!(read_all(&source, "/etc/hostname.bak"), b"box\n");
        assert_eq!(source.lookup("/etc/hostname.bak").unwrap().size(), 4);
    }

    #[test]
    fn test_gzip_detected_by_magic() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&sample()).unwrap();
        let gz = encoder.finish().unwrap();

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("image.bin");
        std::fs::write(&path, gz).unwrap();

        let source = TarSource::open(&path).unwrap();
        assert_eq!(read_all(&source, "/etc/hostname"), b"box\n");
    }

    #[test]
    fn test_file_backed_reads_in_place() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("image.tar");
        std::fs::write(&path, sample()).unwrap();

        let source = TarSource::open(&path).unwrap();
        assert!(matches!(source.backing, Backing::File(_)));
        assert_eq!(read_all(&source, "/etc/hostname"), b"box\n");
        assert!(!source.is_empty());
    }

    #[test]
    fn test_directory_has_no_content() {
        let source = TarSource::from_bytes(sample()).unwrap();
        let etc = source.lookup("/etc").unwrap();
        assert!(source.open_content(&etc).is_err());
    }

    #[test]
    fn test_children_in_archive_order() {
        let data = TarTestBuilder::new()
            .add_file("d/z", b"", 0o644)
            .add_file("d/a", b"", 0o644)
            .build();
        let source = TarSource::from_bytes(data).unwrap();
        let d = source.lookup("/d").unwrap();
        assert_eq!(source.list_children(&d).unwrap(), vec!["z", "a"]);
    }

    #[test]
    fn test_header_owner_and_mtime_recorded() {
        let source = TarSource::from_bytes(sample()).unwrap();
        let hostname = source.lookup("/etc/hostname").unwrap();
        assert_eq!((hostname.uid(), hostname.gid()), (0, 0));
        assert_eq!(hostname.mtime(), 1_700_000_000);
        assert_eq!(hostname.mode(), 0o644);
    }

    #[test]
    fn test_blank_owner_field_is_invalid_archive() {
        let mut header = ::tar::Header::new_gnu();
        header.set_entry_type(::tar::EntryType::Regular);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_size(0);
        let mut builder = ::tar::Builder::new(Vec::new());
        builder.append_data(&mut header, "f", std::io::empty()).unwrap();

        let err = TarSource::from_bytes(builder.into_inner().unwrap()).unwrap_err();
        assert!(err.context().is_some_and(|c| c.contains("uid")));
    }

    #[test]
    fn test_garbage_is_invalid_archive() {
        let result = TarSource::from_bytes(vec![0x42; 1024]);
        assert!(matches!(result, Err(ExtractionError::InvalidArchive(_))));
    }
}

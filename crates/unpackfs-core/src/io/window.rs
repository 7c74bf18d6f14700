//! Bounded view over a byte range of a seekable stream.

use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::{self};

/// `Read + Seek` view of `len` bytes starting at `start` in `inner`.
///
/// Reads never go past the end of the window and seeks are relative to its
/// start, so a reader over one archive member behaves like a standalone
/// file.
///
/// # Examples
///
/// ```
/// use std::io::{Cursor, Read, Seek, SeekFrom};
/// use unpackfs_core::io::WindowReader;
///
/// let mut window = WindowReader::new(Cursor::new(b"headerBODYtrailer".to_vec()), 6, 4)?;
/// let mut body = String::new();
/// window.read_to_string(&mut body)?;
/// assert_eq!(body, "BODY");
///
/// window.seek(SeekFrom::End(-2))?;
/// let mut tail = String::new();
/// window.read_to_string(&mut tail)?;
/// assert_eq!(tail, "DY");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct WindowReader<R> {
    inner: R,
    start: u64,
    len: u64,
    pos: u64,
}

impl<R: Read + Seek> WindowReader<R> {
    /// Creates a window and positions `inner` at its start.
    pub fn new(mut inner: R, start: u64, len: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(start))?;
        Ok(Self {
            inner,
            start,
            len,
            pos: 0,
        })
    }

    /// Length of the window in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` for an empty window.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<R: Read + Seek> Read for WindowReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len.saturating_sub(self.pos);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let n = self.inner.read(&mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Read + Seek> Seek for WindowReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        }
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )
        })?;

        self.inner.seek(SeekFrom::Start(self.start + target))?;
        self.pos = target;
        Ok(target)
    }
}

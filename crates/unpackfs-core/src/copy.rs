//! Buffered content copy shared across the entries of one run.

use std::io::Read;
use std::io::Write;
use std::io::{self};

use crate::ExtractionError;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Reusable 64 KiB copy buffer, allocated once per extraction run.
#[derive(Debug)]
pub struct CopyBuffer {
    buf: Box<[u8]>,
}

impl CopyBuffer {
    /// Creates a new zeroed buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; COPY_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.len()
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies `reader` to `writer` until EOF and returns the byte count.
///
/// Interrupted reads are retried. The count is what was actually written;
/// the caller compares it with the size recorded in the source.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use unpackfs_core::copy::{CopyBuffer, copy_with_buffer};
///
/// let mut buffer = CopyBuffer::new();
/// let mut out = Vec::new();
/// let n = copy_with_buffer(&mut Cursor::new(b"hello"), &mut out, &mut buffer).unwrap();
/// assert_eq!(n, 5);
/// ```
pub fn copy_with_buffer<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
) -> Result<u64, ExtractionError> {
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ExtractionError::Io(e)),
        };

        writer.write_all(&buffer.buf[..bytes_read])?;
        total += bytes_read as u64;
    }

    Ok(total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_copy_buffer_size() {
        assert_eq!(CopyBuffer::new().size(), 64 * 1024);
        assert_eq!(CopyBuffer::default().size(), 64 * 1024);
    }

    #[test]
    fn test_copy_empty_source() {
        let mut buffer = CopyBuffer::new();
        let mut output = Vec::new();
        let n = copy_with_buffer(&mut Cursor::new(Vec::<u8>::new()), &mut output, &mut buffer)
            .unwrap();
        assert_eq!(n, 0);
        assert!(output.is_empty());
    }

    #[test]
    fn test_copy_spans_several_buffers() {
        let mut buffer = CopyBuffer::new();
        let data: Vec<u8> = (0..COPY_BUFFER_SIZE * 3 + 17).map(|i| i as u8).collect();
        let mut output = Vec::new();
        let n = copy_with_buffer(&mut Cursor::new(&data), &mut output, &mut buffer).unwrap();
        assert_eq!(n, data.len() as u64);
        assert_eq!(output, data);
    }

    #[test]
    fn test_copy_retries_interrupted_reads() {
        struct Flaky {
            data: Cursor<Vec<u8>>,
            calls: usize,
        }

        impl Read for Flaky {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.calls += 1;
                if self.calls % 2 == 1 {
                    return Err(io::Error::new(io::ErrorKind::Interrupted, "eintr"));
                }
                let len = buf.len().min(7);
                self.data.read(&mut buf[..len])
            }
        }

        let mut reader = Flaky {
            data: Cursor::new(vec![9u8; 100]),
            calls: 0,
        };
        let mut output = Vec::new();
        let n = copy_with_buffer(&mut reader, &mut output, &mut CopyBuffer::new()).unwrap();
        assert_eq!(n, 100);
        assert_eq!(output, vec![9u8; 100]);
    }

    #[test]
    fn test_copy_propagates_read_error() {
        struct Broken;

        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("corrupt block"))
            }
        }

        let result = copy_with_buffer(&mut Broken, &mut Vec::new(), &mut CopyBuffer::new());
        assert!(matches!(result, Err(ExtractionError::Io(_))));
    }
}

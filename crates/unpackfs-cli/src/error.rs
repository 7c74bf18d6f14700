//! Error conversion utilities for CLI.
//!
//! Converts unpackfs-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use std::path::Path;
use unpackfs_core::ExtractionError;

/// Converts `ExtractionError` to user-friendly anyhow error with context
pub fn convert_extraction_error(err: ExtractionError, archive: &Path) -> anyhow::Error {
    match err {
        ExtractionError::NotFound { path } => {
            anyhow!(
                "No entry '{}' in '{}'\n\
                 HINT: Run `unpackfs list` to see the paths the image contains.",
                path,
                archive.display()
            )
        }
        ExtractionError::PathTraversal { path } => {
            anyhow!(
                "Archive '{}' names a path outside the image: '{}'\n\
                 HINT: Paths may not contain '..' components.",
                archive.display(),
                path
            )
        }
        ExtractionError::InvalidArchive(reason) => {
            anyhow!(
                "Invalid archive '{}': {}\n\
                 HINT: The archive may be corrupted or malformed.",
                archive.display(),
                reason
            )
        }
        ExtractionError::SizeMismatch {
            entry,
            written,
            expected,
            ..
        } => {
            anyhow!(
                "Entry '{}' in '{}' is truncated: wrote {} of {} bytes\n\
                 HINT: The archive may be incomplete.",
                entry,
                archive.display(),
                written,
                expected
            )
        }
        err @ (ExtractionError::ParentNotWritable { .. } | ExtractionError::Operation { .. }) => {
            anyhow!(
                "{err}\n\
                 HINT: Ownership changes and device nodes need root. Run under fakeroot, \
                 or drop --owners and --devs."
            )
        }
        ExtractionError::ProviderUnavailable { provider, reason } => {
            anyhow!(
                "Cannot use {} operations: {}\n\
                 HINT: Use --ops auto or --ops command instead.",
                provider,
                reason
            )
        }
        ExtractionError::UnsupportedEntry { path, kind } => {
            anyhow!(
                "Cannot extract {} entry '{}' from '{}'\n\
                 HINT: Use --path to extract a subtree that avoids it.",
                kind,
                path,
                archive.display()
            )
        }
        ExtractionError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {}",
                archive.display(),
                io_err
            )
        }
        err @ ExtractionError::NotADirectory { .. } => anyhow::Error::from(err)
            .context(format!("Error processing archive '{}'", archive.display())),
    }
}

/// Adds context to a generic error about archive operations
pub fn add_archive_context<T>(
    result: Result<T, ExtractionError>,
    archive: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_extraction_error(e, archive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_convert_not_found_error() {
        let err = ExtractionError::NotFound {
            path: "/usr/share".into(),
        };
        let converted = convert_extraction_error(err, Path::new("rootfs.tar"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("/usr/share"));
        assert!(msg.contains("rootfs.tar"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_operation_error() {
        let err = ExtractionError::operation("chown", "/out/etc", "Operation not permitted");
        let converted = convert_extraction_error(err, Path::new("rootfs.tar"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("chown(/out/etc) failed"));
        assert!(msg.contains("fakeroot"));
    }

    #[test]
    fn test_convert_size_mismatch() {
        let err = ExtractionError::SizeMismatch {
            entry: "/big".into(),
            path: PathBuf::from("/out/big"),
            written: 3,
            expected: 9,
        };
        let msg = format!("{:?}", convert_extraction_error(err, Path::new("a.tar")));
        assert!(msg.contains("wrote 3 of 9 bytes"));
    }

    #[test]
    fn test_convert_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = ExtractionError::Io(io_err);
        let converted = convert_extraction_error(err, Path::new("archive.tar.gz"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("I/O error"));
    }
}

//! Error types for image extraction operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ExtractionError`.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Errors that can occur while walking a source or extracting it.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source has no entry at the requested logical path.
    #[error("no such entry in source: {path}")]
    NotFound {
        /// The logical path that was looked up.
        path: String,
    },

    /// The source image is corrupted or could not be parsed.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// A logical path would resolve outside the target directory.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending logical path.
        path: String,
    },

    /// The parent of a target path is missing or not a directory.
    #[error("dirname({path}) = {parent}: not a directory")]
    NotADirectory {
        /// Target path being created.
        path: PathBuf,
        /// Its parent directory.
        parent: PathBuf,
    },

    /// The parent directory could not be made writable.
    #[error("cannot make {parent} writable{}", restore_suffix(.restore_failed))]
    ParentNotWritable {
        /// The directory that stayed read-only.
        parent: PathBuf,
        /// Whether restoring its original mode also failed.
        restore_failed: bool,
    },

    /// A privileged operation (chmod, chown, mknod) failed.
    #[error("{operation}({path}) failed: {reason}")]
    Operation {
        /// Name of the operation.
        operation: &'static str,
        /// Path the operation was applied to.
        path: PathBuf,
        /// Low-level description of the failure.
        reason: String,
    },

    /// A regular file was written with a different length than recorded.
    #[error("wrote {written} bytes to {path}, expected {expected} from {entry}")]
    SizeMismatch {
        /// Logical path of the entry.
        entry: String,
        /// Target path that was written.
        path: PathBuf,
        /// Bytes actually written.
        written: u64,
        /// Size recorded in the source.
        expected: u64,
    },

    /// The entry kind cannot be materialized.
    #[error("cannot extract {kind} entry {path}")]
    UnsupportedEntry {
        /// Logical path of the entry.
        path: String,
        /// Human readable kind.
        kind: &'static str,
    },

    /// The privileged operation provider could not be initialized.
    #[error("cannot initialize {provider} operations: {reason}")]
    ProviderUnavailable {
        /// Provider name.
        provider: &'static str,
        /// Why it failed.
        reason: String,
    },
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn restore_suffix(restore_failed: &bool) -> &'static str {
    if *restore_failed {
        ", failed setting back"
    } else {
        ""
    }
}

impl ExtractionError {
    /// Builds an [`ExtractionError::Operation`] from any displayable cause.
    pub fn operation(
        operation: &'static str,
        path: impl Into<PathBuf>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::Operation {
            operation,
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` if the source had no entry at the requested path.
    ///
    /// # Examples
    ///
    /// ```
    /// use unpackfs_core::ExtractionError;
    ///
    /// let err = ExtractionError::NotFound { path: "/etc".into() };
    /// assert!(err.is_not_found());
    /// ```
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for a byte-count mismatch on a regular file.
    #[must_use]
    pub const fn is_size_mismatch(&self) -> bool {
        matches!(self, Self::SizeMismatch { .. })
    }

    /// Returns `true` if the error concerns the target tree rather than the
    /// source image.
    ///
    /// # Examples
    ///
    /// ```
    /// use unpackfs_core::ExtractionError;
    /// use std::path::PathBuf;
    ///
    /// let err = ExtractionError::NotADirectory {
    ///     path: PathBuf::from("/out/a/b"),
    ///     parent: PathBuf::from("/out/a"),
    /// };
    /// assert!(err.is_target_error());
    ///
    /// let err = ExtractionError::InvalidArchive("bad header".into());
    /// assert!(!err.is_target_error());
    /// ```
    #[must_use]
    pub const fn is_target_error(&self) -> bool {
        matches!(
            self,
            Self::NotADirectory { .. }
                | Self::ParentNotWritable { .. }
                | Self::Operation { .. }
                | Self::SizeMismatch { .. }
        )
    }

    /// Returns a context string for this error, if available.
    ///
    /// # Examples
    ///
    /// ```
    /// use unpackfs_core::ExtractionError;
    ///
    /// let err = ExtractionError::InvalidArchive("bad header".to_string());
    /// assert_eq!(err.context(), Some("bad header"));
    ///
    /// let err = ExtractionError::NotFound { path: "/x".into() };
    /// assert_eq!(err.context(), None);
    /// ```
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::InvalidArchive(msg) => Some(msg),
            Self::Operation { reason, .. } | Self::ProviderUnavailable { reason, .. } => {
                Some(reason)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ExtractionError::NotFound {
            path: "/usr/bin".into(),
        };
        assert_eq!(err.to_string(), "no such entry in source: /usr/bin");
        assert!(err.is_not_found());
        assert!(!err.is_target_error());
    }

    #[test]
    fn test_size_mismatch_display() {
        let err = ExtractionError::SizeMismatch {
            entry: "/etc/passwd".into(),
            path: PathBuf::from("/out/etc/passwd"),
            written: 10,
            expected: 20,
        };
        let display = err.to_string();
        assert!(display.contains("wrote 10 bytes"));
        assert!(display.contains("expected 20"));
        assert!(display.contains("/etc/passwd"));
        assert!(err.is_size_mismatch());
        assert!(err.is_target_error());
    }

    #[test]
    fn test_parent_not_writable_display() {
        let err = ExtractionError::ParentNotWritable {
            parent: PathBuf::from("/out/ro"),
            restore_failed: false,
        };
        assert_eq!(err.to_string(), "cannot make /out/ro writable");

        let err = ExtractionError::ParentNotWritable {
            parent: PathBuf::from("/out/ro"),
            restore_failed: true,
        };
        assert_eq!(
            err.to_string(),
            "cannot make /out/ro writable, failed setting back"
        );
    }

    #[test]
    fn test_operation_error() {
        let err = ExtractionError::operation("chmod", "/out/file", "permission denied");
        assert_eq!(err.to_string(), "chmod(/out/file) failed: permission denied");
        assert_eq!(err.context(), Some("permission denied"));
        assert!(err.is_target_error());
    }

    #[test]
    fn test_unsupported_entry() {
        let err = ExtractionError::UnsupportedEntry {
            path: "/weird".into(),
            kind: "irregular",
        };
        assert_eq!(err.to_string(), "cannot extract irregular entry /weird");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ExtractionError = io_err.into();
        assert!(matches!(err, ExtractionError::Io(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_context() {
        let err = ExtractionError::InvalidArchive("bad header".into());
        assert_eq!(err.context(), Some("bad header"));

        let err = ExtractionError::PathTraversal {
            path: "../etc".into(),
        };
        assert_eq!(err.context(), None);
    }
}

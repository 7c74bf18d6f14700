//! Validated extraction target directory.

use crate::ExtractionError;
use crate::Result;
use crate::types::logical_path;
use std::path::Path;
use std::path::PathBuf;

/// The directory an image is materialized into.
///
/// Constructed only for a path that exists and is a directory; stored in
/// canonical absolute form. Logical source paths are mapped under it with
/// [`TargetDir::resolve`], which never yields a path outside the directory.
///
/// # Examples
///
/// ```no_run
/// use unpackfs_core::types::TargetDir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let target = TargetDir::new("/tmp/rootfs")?;
/// let etc = target.resolve("/etc/passwd")?;
/// assert!(etc.starts_with(target.as_path()));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDir(PathBuf);

impl TargetDir {
    /// Validates and canonicalizes `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist, is not a directory, or
    /// cannot be canonicalized.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let meta = std::fs::metadata(&path).map_err(|e| {
            ExtractionError::Io(std::io::Error::new(
                e.kind(),
                format!("target directory {}: {e}", path.display()),
            ))
        })?;

        if !meta.is_dir() {
            return Err(ExtractionError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("target is not a directory: {}", path.display()),
            )));
        }

        let canonical = path.canonicalize().map_err(|e| {
            ExtractionError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to canonicalize {}: {e}", path.display()),
            ))
        })?;

        Ok(Self(canonical))
    }

    /// Returns the directory as a `&Path`.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Maps a logical source path to its location under the target.
    ///
    /// The root `/` maps to the target directory itself.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if `logical` contains a
    /// `..` component.
    pub fn resolve(&self, logical: &str) -> Result<PathBuf> {
        let normalized = logical_path::normalize(logical)?;
        let relative = normalized.trim_start_matches('/');
        if relative.is_empty() {
            Ok(self.0.clone())
        } else {
            Ok(self.0.join(relative))
        }
    }
}

impl AsRef<Path> for TargetDir {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_target_dir_valid() {
        let temp = TempDir::new().unwrap();
        let target = TargetDir::new(temp.path()).unwrap();
        assert!(target.as_path().is_absolute());
        assert_eq!(target.as_path(), temp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_target_dir_missing() {
        let temp = TempDir::new().unwrap();
        let result = TargetDir::new(temp.path().join("nope"));
        assert!(matches!(result, Err(ExtractionError::Io(_))));
    }

    #[test]
    fn test_target_dir_is_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        let err = TargetDir::new(&file).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_resolve() {
        let temp = TempDir::new().unwrap();
        let target = TargetDir::new(temp.path()).unwrap();
        assert_eq!(target.resolve("/").unwrap(), target.as_path());
        assert_eq!(
            target.resolve("/usr/bin/env").unwrap(),
            target.as_path().join("usr/bin/env")
        );
        assert_eq!(
            target.resolve("usr//lib").unwrap(),
            target.as_path().join("usr/lib")
        );
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let target = TargetDir::new(temp.path()).unwrap();
        assert!(matches!(
            target.resolve("/../../etc"),
            Err(ExtractionError::PathTraversal { .. })
        ));
    }
}

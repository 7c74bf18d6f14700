//! Filesystem-image extraction that survives without real root.
//!
//! `unpackfs-core` materializes a read-only image of filesystem entries
//! (files, directories, symlinks, device nodes, fifos, sockets and overlay
//! whiteouts) onto a real directory, reproducing types, permissions and
//! ownership. It is built for restricted environments: under fakeroot the
//! privileged calls are routed through the fakeroot library or the coreutils
//! binaries, and directories the extractor could not otherwise write into
//! are opened up during the run and restored afterwards.
//!
//! Images are read through the [`ArchiveSource`](source::ArchiveSource)
//! trait. Tar (optionally gzip-compressed) and in-memory sources are
//! included. Only Unix targets are supported.
//!
//! # Examples
//!
//! ```no_run
//! use unpackfs_core::source::TarSource;
//! use unpackfs_core::{ExtractOptions, extract};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let image = TarSource::open("rootfs.tar.gz")?;
//! let options = ExtractOptions::default().with_perms(true).with_whiteouts(true);
//! let report = extract(&image, "/", "/srv/rootfs", &options)?;
//! println!("extracted {} files", report.files_extracted);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod copy;
pub mod error;
pub mod extraction;
pub mod io;
pub mod ops;
pub mod report;
pub mod source;
pub mod types;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export main API types
pub use api::extract;
pub use api::extract_with_progress;
pub use api::list;
pub use config::ExtractOptions;
pub use config::OpsKind;
pub use error::ExtractionError;
pub use error::Result;
pub use extraction::Extractor;
pub use ops::FsOps;
pub use report::ExtractionReport;
pub use report::NoopProgress;
pub use report::ProgressCallback;
pub use walk::WalkControl;
pub use walk::walk;

pub use types::DeviceNumber;
pub use types::Entry;
pub use types::EntryKind;
pub use types::TargetDir;

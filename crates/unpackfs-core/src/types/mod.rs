//! Core value types: entry metadata, logical paths and the target directory.

pub mod entry;
pub mod logical_path;
pub mod target_dir;

pub use entry::DeviceNumber;
pub use entry::Entry;
pub use entry::EntryKind;
pub use target_dir::TargetDir;

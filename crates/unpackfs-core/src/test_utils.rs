//! Helpers for building tar fixtures in unit tests.
//!
//! # Panics
//!
//! Every builder method panics on I/O errors; they only run in tests.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

/// Builder for in-memory tar archives covering every member kind the
/// [`TarSource`](crate::source::TarSource) understands.
pub struct TarTestBuilder {
    builder: tar::Builder<Vec<u8>>,
}

impl TarTestBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    fn append(mut self, mut header: tar::Header, path: &str, data: &[u8]) -> Self {
        header.set_size(data.len() as u64);
        header.set_cksum();
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    fn header(kind: tar::EntryType, mode: u32) -> tar::Header {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(kind);
        header.set_mode(mode);
        header.set_uid(0);
        header.set_gid(0);
        header.set_mtime(1_700_000_000);
        header
    }

    #[must_use]
    pub fn add_file(self, path: &str, data: &[u8], mode: u32) -> Self {
        self.append(Self::header(tar::EntryType::Regular, mode), path, data)
    }

    #[must_use]
    pub fn add_directory(self, path: &str, mode: u32) -> Self {
        self.append(Self::header(tar::EntryType::Directory, mode), path, &[])
    }

    #[must_use]
    pub fn add_symlink(self, path: &str, target: &str) -> Self {
        let mut header = Self::header(tar::EntryType::Symlink, 0o777);
        header.set_link_name(target).unwrap();
        self.append(header, path, &[])
    }

    #[must_use]
    pub fn add_hardlink(self, path: &str, target: &str) -> Self {
        let mut header = Self::header(tar::EntryType::Link, 0o644);
        header.set_link_name(target).unwrap();
        self.append(header, path, &[])
    }

    #[must_use]
    pub fn add_char_device(self, path: &str, major: u32, minor: u32) -> Self {
        let mut header = Self::header(tar::EntryType::Char, 0o666);
        header.set_device_major(major).unwrap();
        header.set_device_minor(minor).unwrap();
        self.append(header, path, &[])
    }

    #[must_use]
    pub fn add_block_device(self, path: &str, major: u32, minor: u32) -> Self {
        let mut header = Self::header(tar::EntryType::Block, 0o660);
        header.set_device_major(major).unwrap();
        header.set_device_minor(minor).unwrap();
        self.append(header, path, &[])
    }

    #[must_use]
    pub fn add_fifo(self, path: &str) -> Self {
        self.append(Self::header(tar::EntryType::Fifo, 0o644), path, &[])
    }

    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }
}

impl Default for TarTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

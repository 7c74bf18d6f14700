//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use unpackfs_core::Entry;
use unpackfs_core::ExtractionReport;
use unpackfs_core::types::entry::mode_string;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ExtractionOutput<'a> {
    files_extracted: usize,
    directories_created: usize,
    symlinks_created: usize,
    fifos_created: usize,
    sockets_created: usize,
    devices_created: usize,
    whiteouts_applied: usize,
    entries_skipped: usize,
    bytes_written: u64,
    cleanups_run: usize,
    duration_ms: u128,
    warnings: &'a [String],
}

#[derive(Serialize)]
struct EntryOutput<'a> {
    path: &'a str,
    kind: &'static str,
    mode: String,
    permissions: String,
    uid: u32,
    gid: u32,
    size: u64,
    mtime: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<[u32; 2]>,
}

impl<'a> From<&'a Entry> for EntryOutput<'a> {
    fn from(entry: &'a Entry) -> Self {
        Self {
            path: entry.path(),
            kind: entry.kind().name(),
            mode: format!("{:04o}", entry.mode()),
            permissions: mode_string(entry.kind(), entry.mode()),
            uid: entry.uid(),
            gid: entry.gid(),
            size: entry.size(),
            mtime: entry.mtime(),
            target: entry.symlink_target(),
            device: entry.device().map(|dev| [dev.major(), dev.minor()]),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()> {
        let data = ExtractionOutput {
            files_extracted: report.files_extracted,
            directories_created: report.directories_created,
            symlinks_created: report.symlinks_created,
            fifos_created: report.fifos_created,
            sockets_created: report.sockets_created,
            devices_created: report.devices_created,
            whiteouts_applied: report.whiteouts_applied,
            entries_skipped: report.entries_skipped,
            bytes_written: report.bytes_written,
            cleanups_run: report.cleanups_run,
            duration_ms: report.duration.as_millis(),
            warnings: &report.warnings,
        };

        Self::output(&JsonOutput::success("extract", data))
    }

    fn format_listing(&self, entries: &[Entry]) -> Result<()> {
        let data: Vec<EntryOutput<'_>> = entries.iter().map(EntryOutput::from).collect();
        Self::output(&JsonOutput::success("list", data))
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData<'a> {
            message: &'a str,
        }

        let output = JsonOutput::warning("warning", WarningData { message });
        let _ = Self::output(&output);
    }
}

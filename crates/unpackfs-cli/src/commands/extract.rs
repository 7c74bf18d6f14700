//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use std::fs;
use tracing::debug;
use unpackfs_core::NoopProgress;
use unpackfs_core::extract_with_progress;
use unpackfs_core::source::TarSource;

pub fn execute(args: &ExtractArgs, formatter: &dyn OutputFormatter, quiet: bool) -> Result<()> {
    fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "failed to create output directory '{}'",
            args.output_dir.display()
        )
    })?;

    let source = add_archive_context(TarSource::open(&args.archive), &args.archive)?;
    let options = args.options();
    debug!(?options, archive = %args.archive.display(), "extracting");

    // Use a spinner if stderr is a terminal and output is not suppressed
    let report = if !quiet && CliProgress::should_show() {
        let mut progress = CliProgress::new("Extracting");
        extract_with_progress(&source, &args.path, &args.output_dir, &options, &mut progress)
    } else {
        extract_with_progress(&source, &args.path, &args.output_dir, &options, &mut NoopProgress)
    };
    let report = add_archive_context(report, &args.archive)?;

    formatter.format_extraction_result(&report)?;

    Ok(())
}

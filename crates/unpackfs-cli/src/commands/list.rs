//! List command implementation

use crate::cli::ListArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use anyhow::bail;
use unpackfs_core::list;
use unpackfs_core::source::TarSource;

pub fn execute(args: &ListArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let source = add_archive_context(TarSource::open(&args.archive), &args.archive)?;

    let mut entries = Vec::new();
    let mut failures = 0usize;
    add_archive_context(
        list(&source, &args.path, |path, entry| match entry {
            Ok(entry) => entries.push(entry.clone()),
            Err(e) => {
                failures += 1;
                formatter.format_warning(&format!("{path}: {e}"));
            }
        }),
        &args.archive,
    )?;

    formatter.format_listing(&entries)?;

    if failures > 0 {
        bail!(
            "{failures} {} in '{}' could not be read",
            if failures == 1 { "entry" } else { "entries" },
            args.archive.display()
        );
    }
    Ok(())
}

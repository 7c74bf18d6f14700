//! Diagnostic logging to stderr.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Verbosity of the diagnostic log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    /// No diagnostics.
    Quiet,
    /// Failures the extraction recovered from.
    Info,
    /// Every filesystem operation.
    Verbose,
    /// Everything, including traversal internals.
    Debug,
}

impl LogLevel {
    const fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "off",
            Self::Info => "info",
            Self::Verbose => "debug",
            Self::Debug => "trace",
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

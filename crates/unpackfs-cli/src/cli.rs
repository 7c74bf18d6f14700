//! CLI argument parsing using clap.

use crate::logging::LogLevel;
use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::PathBuf;
use unpackfs_core::ExtractOptions;
use unpackfs_core::OpsKind;

#[derive(Parser)]
#[command(name = "unpackfs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Diagnostic log level (RUST_LOG overrides)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract an image into a directory
    Extract(ExtractArgs),
    /// List image contents in ls -l format
    List(ListArgs),
    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the image (tar, optionally gzip-compressed)
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Output directory, created if missing
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Subtree of the image to extract
    #[arg(long, default_value = "/", value_name = "PATH")]
    pub path: String,

    /// Apply recorded owners
    #[arg(long)]
    pub owners: bool,

    /// Apply recorded permissions
    #[arg(long)]
    pub perms: bool,

    /// Create block and character device nodes
    #[arg(long)]
    pub devs: bool,

    /// Create unix sockets
    #[arg(long)]
    pub sockets: bool,

    /// Treat 0/0 character devices as overlay whiteouts
    #[arg(long)]
    pub whiteouts: bool,

    /// Enable all of --owners, --perms, --devs, --sockets and --whiteouts
    #[arg(short, long)]
    pub all: bool,

    /// Privileged operation provider (auto, native, command, library)
    #[arg(long, default_value_t = OpsKind::Auto)]
    pub ops: OpsKind,
}

impl ExtractArgs {
    pub fn options(&self) -> ExtractOptions {
        let base = if self.all {
            ExtractOptions::all()
        } else {
            ExtractOptions::default()
                .with_owners(self.owners)
                .with_perms(self.perms)
                .with_devices(self.devs)
                .with_sockets(self.sockets)
                .with_whiteouts(self.whiteouts)
        };
        base.with_ops(self.ops)
    }
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Path to the image (tar, optionally gzip-compressed)
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Subtree of the image to list
    #[arg(long, default_value = "/", value_name = "PATH")]
    pub path: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_flags_map_to_options() {
        let cli = Cli::parse_from([
            "unpackfs", "extract", "img.tar", "out", "--perms", "--whiteouts", "--ops", "Native",
        ]);
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        let options = args.options();
        assert!(options.extract_perms);
        assert!(options.apply_whiteouts);
        assert!(!options.extract_owners);
        assert!(!options.extract_devices);
        assert_eq!(options.ops, OpsKind::Native);
        assert_eq!(args.path, "/");
    }

    #[test]
    fn test_all_enables_everything() {
        let cli = Cli::parse_from(["unpackfs", "extract", "-a", "img.tar", "out"]);
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        let options = args.options();
        assert!(options.extract_owners);
        assert!(options.extract_devices);
        assert!(options.extract_sockets);
        assert_eq!(options.ops, OpsKind::Auto);
    }

    #[test]
    fn test_unknown_ops_rejected() {
        let result = Cli::try_parse_from(["unpackfs", "extract", "a", "b", "--ops", "magic"]);
        assert!(result.is_err());
    }
}

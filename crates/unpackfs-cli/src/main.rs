//! unpackfs CLI - extracts filesystem images without real root.

mod cli;
mod commands;
mod error;
mod logging;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;
use logging::LogLevel;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let level = if cli.quiet {
        LogLevel::Quiet
    } else {
        cli.log_level
    };
    logging::init(level);

    let formatter = output::create_formatter(cli.json, cli.log_level >= LogLevel::Verbose, cli.quiet);

    match &cli.command {
        cli::Commands::Extract(args) => commands::extract::execute(args, &*formatter, cli.quiet),
        cli::Commands::List(args) => commands::list::execute(args, &*formatter),
        cli::Commands::Completion { shell } => {
            commands::completion::execute(*shell);
            Ok(())
        }
    }
}

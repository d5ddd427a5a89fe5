//! `taskboard` command-line entry point.
//!
//! Every command opens the configured database, runs one board operation
//! as the `--user` given, and prints the result as JSON.

use clap::Parser;

mod cli;
mod commands;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    commands::run_command(cli)
}

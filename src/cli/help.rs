//! CLI help: stable command names for log lines.

use crate::cli::parse::Commands;

/// Command name string for logging (e.g. "run", "run-one").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Run { .. } => "run",
        Commands::RunOne { .. } => "run-one",
        Commands::Seeds { .. } => "seeds",
    }
}

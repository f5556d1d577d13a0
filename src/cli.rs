//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat, RunOptions};
pub use presentation::{
    format_dispatch_summary, format_dispatch_summary_json, format_dispatch_summary_text,
    format_outcome_text,
};
pub use route::{discover_settings_files, settings_pattern_regex, RunContext};

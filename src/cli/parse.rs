//! CLI parse: clap types for sdbatch. No behavior; definitions only.

use crate::seeds::DEFAULT_SEED_COUNT;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// sdbatch - Batch image generation across Stable Diffusion WebUI backends
#[derive(Parser)]
#[command(name = "sdbatch")]
#[command(about = "Dispatch batch txt2img jobs across a pool of Stable Diffusion WebUI backends")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (settings, seeds and prompts are looked up here)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run settings files across the endpoint pool, one worker per endpoint
    Run {
        /// Backend endpoint (repeatable; defaults to `endpoints` from the config)
        #[arg(long = "endpoint")]
        endpoints: Vec<String>,

        /// Settings file (repeatable; defaults to discovery in the workspace)
        #[arg(long = "settings")]
        settings: Vec<PathBuf>,

        #[command(flatten)]
        options: RunOptions,

        /// Summary format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Run one settings file against the endpoint written in it
    RunOne {
        /// Settings file
        settings: PathBuf,

        #[command(flatten)]
        options: RunOptions,
    },
    /// Write a file of random seeds
    Seeds {
        /// Number of seeds
        #[arg(long, default_value_t = DEFAULT_SEED_COUNT)]
        count: usize,

        /// Destination file
        #[arg(long, default_value = "random_seeds.txt")]
        output: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Options shared by `run` and `run-one`
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Seed file (overrides config)
    #[arg(long)]
    pub seeds: Option<PathBuf>,

    /// Prompt file (overrides config)
    #[arg(long)]
    pub prompts: Option<PathBuf>,

    /// Output root directory (overrides config)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Add to existing output directories without asking
    #[arg(long, conflicts_with = "skip_existing")]
    pub yes: bool,

    /// Skip jobs whose output directory already exists
    #[arg(long)]
    pub skip_existing: bool,
}

/// Rendering of the dispatch summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

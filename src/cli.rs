//! CLI argument parsing for the lead pipeline.
//!
//! Credentials never come from flags; they are read from the environment so
//! the same invocation works in mock and live mode.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default `.env` file consulted before reading the environment.
pub const DEFAULT_DOTENV: &str = ".env";

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "leadsync",
    version,
    about = "Turn engagement on a social post into enriched, reconciled leads",
    after_help = "Commands:\n  run [--post <id>]   Collect, enrich, reconcile and publish once (or on an interval)\n  modes               Show which integrations run live and which are mocked\n\nExamples:\n  leadsync run --post post-123\n  leadsync run --json --report /tmp/leadsync-report.json\n  leadsync run --interval-minutes 60\n  leadsync modes --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Modes(ModesArgs),
}

/// Run command inputs.
#[derive(Parser, Debug)]
#[command(about = "Run the pipeline for one post")]
pub struct RunArgs {
    /// Target post id; overrides LEADSYNC_POST_ID
    #[arg(long, value_name = "ID")]
    pub post: Option<String>,

    /// Emit the run summary as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Write the run summary snapshot to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Append run history to this JSONL file instead of the default location
    #[arg(long, value_name = "PATH", conflicts_with = "no_history")]
    pub history: Option<PathBuf>,

    /// Do not record run history
    #[arg(long)]
    pub no_history: bool,

    /// Repeat the run every N minutes until interrupted
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_minutes: Option<u64>,

    /// Use mock implementations for every integration, even with credentials set
    #[arg(long)]
    pub mock: bool,

    /// Environment file loaded before reading settings (skipped when missing)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DOTENV)]
    pub dotenv: PathBuf,

    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(long)]
    pub verbose: bool,
}

/// Modes command inputs.
#[derive(Parser, Debug)]
#[command(about = "Show the resolved live/mock mode for each integration")]
pub struct ModesArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Environment file loaded before reading settings (skipped when missing)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DOTENV)]
    pub dotenv: PathBuf,
}

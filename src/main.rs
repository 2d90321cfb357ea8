use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod cli;
mod collect;
mod config;
mod enrich;
mod error;
mod integrations;
mod mode;
mod model;
mod pipeline;
mod publish;
mod reconcile;
mod signal;
mod util;

use cli::{Command, ModesArgs, RootArgs, RunArgs};
use config::Settings;
use integrations::Integrations;
use mode::{resolve_modes, ModePlan};
use pipeline::history::{append_history, default_history_path, write_report, RunHistoryEntry};
use pipeline::summary::RunSummary;
use pipeline::Pipeline;
use signal::StopSignal;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    match args.command {
        Command::Run(args) => cmd_run(args),
        Command::Modes(args) => cmd_modes(args),
    }
}

/// Logs go to stderr; stdout carries only the summary.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_dotenv(path: &Path) -> Result<()> {
    if path.exists() {
        dotenvy::from_path(path).with_context(|| format!("load {}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded environment file");
    }
    Ok(())
}

fn cmd_run(args: RunArgs) -> Result<()> {
    init_tracing(args.verbose);
    load_dotenv(&args.dotenv)?;

    let settings = Settings::from_env()?;
    let post_id = settings.post_id(args.post.as_deref())?;
    let modes = if args.mock {
        ModePlan::all_mock()
    } else {
        resolve_modes(&settings.credentials)
    };
    for (integration, mode) in modes.iter() {
        tracing::info!(
            integration = %integration,
            service = integration.service(),
            mode = %mode,
            "integration mode"
        );
    }

    let history_path = if args.no_history {
        None
    } else if let Some(path) = args.history.clone() {
        Some(path)
    } else {
        match default_history_path() {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(error = %err, "run history disabled");
                None
            }
        }
    };

    let stop = StopSignal::new();
    stop.install_ctrlc()?;
    let integrations = Integrations::from_settings(&settings, &modes, &stop);
    let pipeline = Pipeline::new(&integrations, &modes, &stop);

    let interval = args
        .interval_minutes
        .map(|minutes| Duration::from_secs(minutes.saturating_mul(60)));
    pipeline.run_every(&post_id, interval, |summary| {
        emit_summary(summary, &args, history_path.as_deref())
    })
}

/// Print the summary and persist it. Persistence failures are logged, not
/// fatal: the run itself already completed.
fn emit_summary(
    summary: &RunSummary,
    args: &RunArgs,
    history_path: Option<&Path>,
) -> Result<()> {
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(summary).context("serialize run summary")?
        );
    } else {
        print!("{}", summary.render_text());
    }

    if let Some(path) = &args.report {
        if let Err(err) = write_report(path, summary) {
            tracing::warn!(
                path = %path.display(),
                error = %format!("{err:#}"),
                "report write failed"
            );
        }
    }
    if let Some(path) = history_path {
        let entry = RunHistoryEntry::from_summary(summary);
        match append_history(path, &entry) {
            Ok(()) => tracing::debug!(path = %path.display(), "run history appended"),
            Err(err) => tracing::warn!(
                path = %path.display(),
                error = %format!("{err:#}"),
                "history append failed"
            ),
        }
    }
    Ok(())
}

fn cmd_modes(args: ModesArgs) -> Result<()> {
    init_tracing(false);
    load_dotenv(&args.dotenv)?;

    let settings = Settings::from_env()?;
    let modes = resolve_modes(&settings.credentials);
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&modes).context("serialize modes")?
        );
        return Ok(());
    }
    for (integration, mode) in modes.iter() {
        let name = integration.as_str();
        let mode = mode.as_str();
        let service = integration.service();
        println!("{name:<16} {mode:<5} {service}");
    }
    Ok(())
}

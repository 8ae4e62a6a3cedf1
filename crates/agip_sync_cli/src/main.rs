//! `agip-sync` command-line entry point.
//!
//! # Responsibility
//! - Load configuration, start logging and invoke one core operation.
//! - Print a short human summary; details go to the log file and run report.
//!
//! # Invariants
//! - Any fatal error exits non-zero after printing its cause chain.
//! - Two instances must never run against the same ledger at once.

use agip_sync_core::{
    init_logging, DeploymentStatus, JsonFileProposalSource, Ledger, LogOptions,
    MarkerDirectoryEvidence, RunReport, SyncConfig, SyncService,
};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "agip-sync")]
#[command(version, about = "Pair sigprops with coreprops and track reward deployments")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "AGIP_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Tracking ledger path (overrides config file)
    #[arg(long, env = "AGIP_SYNC_LEDGER")]
    ledger: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long)]
    log_level: Option<String>,

    /// Log directory (overrides config file)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify, pair and reconcile proposals from an export file
    Run {
        /// Proposal export (JSON array or GraphQL response envelope)
        #[arg(short, long)]
        proposals: PathBuf,
    },
    /// Print tracking ledger entries, newest first
    Ledger {
        /// Only show entries with this status
        #[arg(long)]
        status: Option<DeploymentStatus>,
    },
    /// Record an operator-confirmed deployment
    MarkDeployed {
        /// AGIP number
        number: u32,
        /// External transaction reference
        #[arg(long)]
        tx: Option<String>,
    },
}

fn main() -> ExitCode {
    match run_cli(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("agip-sync: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    let mut config = SyncConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(ledger) = cli.ledger {
        config.tracking.ledger_path = ledger;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(dir) = cli.log_dir {
        config.logging.dir = dir;
    }

    init_logging(&LogOptions {
        level: config.logging.level.clone(),
        dir: config.logging.dir.clone(),
        echo_stderr: true,
    })
    .map_err(anyhow::Error::msg)
    .context("starting logging")?;

    match cli.command {
        Command::Run { proposals } => run_sync(config, proposals),
        Command::Ledger { status } => print_ledger(&config, status),
        Command::MarkDeployed { number, tx } => mark_deployed(&config, number, tx),
    }
}

fn run_sync(config: SyncConfig, proposals: PathBuf) -> Result<()> {
    let evidence = MarkerDirectoryEvidence::new(&config.tracking.deployment_marker_dir);
    let service = SyncService::new(config, JsonFileProposalSource::new(proposals), evidence);
    let report = service.run(Utc::now())?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!(
        "fetched={} eligible={} sigprops={} coreprops={} pairs={} unmatched_sigprops={}",
        report.fetched,
        report.eligible,
        report.qualified_sigprops,
        report.qualified_coreprops,
        report.pairs.len(),
        report.unmatched_sigprops
    );
    for pair in &report.pairs {
        let number = pair
            .sequence_number
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        println!(
            "  AGIP {number:>4}  {:.3}  {}  <->  {}",
            pair.similarity, pair.sigprop.title, pair.coreprop.title
        );
    }
    for gap in &report.sequence.gaps {
        println!("  missing AGIP {} ({:?})", gap.number, gap.cause);
    }
    let tracking = &report.tracking;
    println!(
        "tracking: created={} promoted={} updated={} unchanged={} scripts_generated={} skipped={}",
        tracking.created,
        tracking.promoted,
        tracking.updated,
        tracking.unchanged,
        tracking.scripts_generated,
        tracking.skipped
    );
}

fn print_ledger(config: &SyncConfig, status: Option<DeploymentStatus>) -> Result<()> {
    let path = &config.tracking.ledger_path;
    let ledger = Ledger::load(path)
        .with_context(|| format!("reading ledger `{}`", path.display()))?
        .unwrap_or_default();

    for entry in ledger
        .iter_desc()
        .filter(|entry| status.map_or(true, |wanted| entry.status == wanted))
    {
        let deployed_at = entry
            .deployed_at
            .map_or_else(String::new, |at| at.to_rfc3339());
        println!(
            "{:<10} {:<12} {:<26} {}",
            entry.key(),
            entry.status,
            deployed_at,
            entry.title
        );
    }
    let counts = ledger.status_counts();
    println!(
        "total={} {}",
        ledger.len(),
        counts
            .iter()
            .map(|(status, count)| format!("{status}={count}"))
            .collect::<Vec<_>>()
            .join(" ")
    );
    Ok(())
}

fn mark_deployed(config: &SyncConfig, number: u32, tx: Option<String>) -> Result<()> {
    let path = &config.tracking.ledger_path;
    let mut ledger = Ledger::load(path)
        .with_context(|| format!("reading ledger `{}`", path.display()))?
        .unwrap_or_default();

    let entry = ledger.record_deployment(number, tx, Utc::now())?;
    println!("{} -> {}", entry.key(), entry.status);
    ledger.save(path)?;
    Ok(())
}

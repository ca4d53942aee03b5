//! confleet - declarative fleet configuration orchestration
//!
//! ## Commands
//!
//! - `run`: validate intents and push them across the fleet in phases
//! - `backup`: capture running configurations only
//! - `restore`: print or write a stored configuration snapshot
//! - `report`: summarize a previously written run report

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};

use confleet_backup::{capture_action, BackupStore, FsBackupStore};
use confleet_core::executor::{CancelToken, ExecutorConfig, PhaseExecutor};
use confleet_core::fakes::ScriptedConnector;
use confleet_core::model::{ConfigIntent, Inventory};
use confleet_core::orchestrator::{Orchestrator, Phase};
use confleet_core::session::{DeviceConnector, RetryPolicy};
use confleet_core::{actions, telemetry, validate, RunReport, RunStatus};

mod config;

#[derive(Parser)]
#[command(name = "confleet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Declarative configuration orchestration for network device fleets", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate intents and push them across the fleet
    Run {
        /// Inventory YAML file
        #[arg(short, long)]
        inventory: PathBuf,

        /// Intents YAML file
        #[arg(long)]
        intents: PathBuf,

        /// Backup store directory
        #[arg(long, default_value = "backups")]
        backup_dir: PathBuf,

        /// Devices configured concurrently per phase
        #[arg(long, default_value = "8")]
        max_concurrent: usize,

        /// Per-device action timeout in seconds
        #[arg(long, default_value = "30")]
        timeout_secs: u64,

        /// Use the scripted in-memory transport instead of real devices
        #[arg(long)]
        dry_run: bool,

        /// Write the JSON run report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Capture running configurations without pushing anything
    Backup {
        /// Inventory YAML file
        #[arg(short, long)]
        inventory: PathBuf,

        /// Backup store directory
        #[arg(long, default_value = "backups")]
        backup_dir: PathBuf,

        /// Devices captured concurrently
        #[arg(long, default_value = "8")]
        max_concurrent: usize,

        /// Use the scripted in-memory transport instead of real devices
        #[arg(long)]
        dry_run: bool,
    },

    /// Print or write a stored configuration snapshot
    Restore {
        /// Device name
        device: String,

        /// Snapshot identifier, e.g. R1_20260314_092653 (default: latest)
        #[arg(long)]
        snapshot: Option<String>,

        /// Backup store directory
        #[arg(long, default_value = "backups")]
        backup_dir: PathBuf,

        /// Output path for the snapshot content
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize a previously written run report
    Report {
        /// Path to a JSON run report
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            inventory,
            intents,
            backup_dir,
            max_concurrent,
            timeout_secs,
            dry_run,
            output,
        } => {
            cmd_run(
                &inventory,
                &intents,
                &backup_dir,
                max_concurrent,
                timeout_secs,
                dry_run,
                output.as_deref(),
            )
            .await
        }
        Commands::Backup {
            inventory,
            backup_dir,
            max_concurrent,
            dry_run,
        } => cmd_backup(&inventory, &backup_dir, max_concurrent, dry_run).await,
        Commands::Restore {
            device,
            snapshot,
            backup_dir,
            output,
        } => cmd_restore(&device, snapshot.as_deref(), &backup_dir, output.as_deref()).await,
        Commands::Report { path } => cmd_report(&path),
    }
}

fn connector_for(dry_run: bool) -> Result<Arc<dyn DeviceConnector>> {
    if dry_run {
        Ok(Arc::new(ScriptedConnector::new()))
    } else {
        // An SSH transport plugs in behind DeviceConnector; this build
        // ships only the scripted one.
        bail!("no device transport is configured in this build; use --dry-run")
    }
}

fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();
    let handler = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling unstarted work");
            handler.cancel();
        }
    });
    cancel
}

fn preflight(inventory: &Inventory, intents: &ConfigIntent) -> Result<()> {
    if let Err(err) = validate::validate(inventory, intents) {
        eprintln!("Validation failed:");
        for violation in &err.violations {
            eprintln!("  - {violation}");
        }
        bail!("{} violation(s); no device was touched", err.violations.len());
    }
    Ok(())
}

async fn cmd_run(
    inventory_path: &std::path::Path,
    intents_path: &std::path::Path,
    backup_dir: &std::path::Path,
    max_concurrent: usize,
    timeout_secs: u64,
    dry_run: bool,
    output: Option<&std::path::Path>,
) -> Result<()> {
    let inventory = config::load_inventory(inventory_path)?;
    let intents = Arc::new(config::load_intents(intents_path)?);
    preflight(&inventory, &intents)?;

    let connector = connector_for(dry_run)?;
    let store: Arc<dyn BackupStore> = Arc::new(FsBackupStore::open(backup_dir).await?);

    let executor = PhaseExecutor::new(
        ExecutorConfig {
            default_concurrency: max_concurrent,
            action_timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy::default(),
        },
        cancel_on_ctrl_c(),
    );

    let devices = inventory.devices().to_vec();
    let phases = vec![
        Phase::new(
            "interfaces",
            devices.clone(),
            actions::interfaces_action(connector.clone(), intents.clone()),
        ),
        Phase::new(
            "routing",
            devices.clone(),
            actions::routing_action(connector.clone(), intents.clone()),
        )
        .after(&["interfaces"]),
        Phase::new(
            "vlans",
            devices.clone(),
            actions::vlans_action(connector.clone(), intents.clone()),
        )
        .after(&["interfaces"]),
        Phase::new("backup", devices, capture_action(connector, store))
            .after(&["routing", "vlans"]),
    ];

    info!(
        devices = inventory.len(),
        dry_run, "starting fleet configuration run"
    );
    let report = Orchestrator::new(phases, executor)?.run().await;

    print_summary(&report);
    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    match report.status() {
        RunStatus::Success => Ok(()),
        RunStatus::PartialFailure => bail!("{} device failure(s)", report.failed_count()),
    }
}

async fn cmd_backup(
    inventory_path: &std::path::Path,
    backup_dir: &std::path::Path,
    max_concurrent: usize,
    dry_run: bool,
) -> Result<()> {
    let inventory = config::load_inventory(inventory_path)?;
    let connector = connector_for(dry_run)?;
    let store: Arc<dyn BackupStore> = Arc::new(FsBackupStore::open(backup_dir).await?);

    let executor = PhaseExecutor::new(
        ExecutorConfig {
            default_concurrency: max_concurrent,
            ..ExecutorConfig::default()
        },
        cancel_on_ctrl_c(),
    );

    let phase = Phase::new(
        "backup",
        inventory.devices().to_vec(),
        capture_action(connector, store),
    );
    let report = Orchestrator::new(vec![phase], executor)?.run().await;

    print_summary(&report);
    match report.status() {
        RunStatus::Success => Ok(()),
        RunStatus::PartialFailure => bail!("{} device failure(s)", report.failed_count()),
    }
}

async fn cmd_restore(
    device: &str,
    snapshot_id: Option<&str>,
    backup_dir: &std::path::Path,
    output: Option<&std::path::Path>,
) -> Result<()> {
    let store = FsBackupStore::open(backup_dir).await?;

    let snapshot = match snapshot_id {
        Some(id) => store.restore(device, id).await?,
        None => store
            .latest(device)
            .await?
            .with_context(|| format!("no snapshots stored for device '{device}'"))?,
    };

    if let Some(path) = output {
        std::fs::write(path, &snapshot.content)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        println!("Restored {} to {}", snapshot.id(), path.display());
    } else {
        print!("{}", snapshot.content);
    }
    Ok(())
}

fn cmd_report(path: &std::path::Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read report {}", path.display()))?;
    let report: RunReport =
        serde_json::from_str(&raw).with_context(|| format!("invalid report {}", path.display()))?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!("Run: {}", report.run_id);
    println!(
        "Status: {}",
        match report.status() {
            RunStatus::Success => "SUCCESS",
            RunStatus::PartialFailure => "PARTIAL FAILURE",
        }
    );
    println!(
        "Outcomes: {} succeeded, {} failed, {} skipped",
        report.succeeded_count(),
        report.failed_count(),
        report.skipped_count()
    );

    for phase in report.phases() {
        if let Some(outcomes) = report.phase_outcomes(phase) {
            let ok = outcomes.values().filter(|o| o.is_succeeded()).count();
            println!("  {phase}: {ok}/{} succeeded", outcomes.len());
        }
    }

    let failures = report.failures();
    if !failures.is_empty() {
        println!("Failures:");
        for entry in failures {
            println!("  - [{}] {}: {}", entry.phase, entry.device, entry.reason);
        }
    }
}

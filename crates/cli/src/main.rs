// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! crewly - fleet control-plane CLI
//!
//! A thin front end over the controller surface (component H): every
//! subcommand loads the persistent store at `--home` (default `~/.crewly`),
//! builds a [`crewly_controller::Controller`], and either performs one
//! operation or (for `daemon run`) keeps the message and check schedulers
//! alive for the life of the process.

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crewly_adapters::TmuxAdapter;
use crewly_controller::Controller;
use crewly_core::UuidIdGen;
use crewly_delivery::DeliveryPolicy;
use crewly_engine::TaskLifecycle;
use crewly_storage::{ActivityLog, ChecksStore, DataStore, TrackingIndex};
use output::OutputFormat;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "crewly", version, about = "Fleet control-plane CLI for long-running terminal agent sessions")]
struct Cli {
    /// Root directory for data.json, activity.json, and the check stores
    #[arg(long, global = true, value_name = "DIR")]
    home: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task lifecycle: assign, complete, block, unblock, and query tasks
    Task(commands::task::TaskArgs),
    /// Scheduled one-off and recurring messages to a session
    Message(commands::message::MessageArgs),
    /// Programmatic check-ins a session schedules on itself
    Check(commands::check::CheckArgs),
    /// Run the long-lived scheduler process
    Daemon(commands::daemon::DaemonArgs),
}

fn default_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".crewly")
}

/// Installs the global subscriber honoring `RUST_LOG`, defaulting to `info`
/// when unset or invalid.
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let home = cli.home.unwrap_or_else(default_home);
    std::fs::create_dir_all(&home).with_context(|| format!("creating {}", home.display()))?;

    let store = Arc::new(DataStore::load(&home).with_context(|| format!("loading data store at {}", home.display()))?);
    let tracking = Arc::new(TrackingIndex::load(&home).with_context(|| format!("loading tracking index at {}", home.display()))?);
    let activity = ActivityLog::load(&home, store.with_data(|d| d.settings.activity_log_cap))
        .with_context(|| format!("loading activity log at {}", home.display()))?;
    let checks_store = Arc::new(ChecksStore::load(&home).with_context(|| format!("loading check stores at {}", home.display()))?);

    let lifecycle = Arc::new(TaskLifecycle::new(store.clone(), tracking, activity.clone(), UuidIdGen));
    let adapter = TmuxAdapter::new();
    let messages = Arc::new(crewly_engine::MessageScheduler::new(
        store.clone(),
        activity.clone(),
        adapter.clone(),
        DeliveryPolicy::default(),
        Duration::from_millis(250),
    ));
    let checks = Arc::new(crewly_engine::CheckScheduler::new(
        checks_store,
        store.clone(),
        activity,
        adapter,
        DeliveryPolicy::default(),
    ));
    let controller = Controller::new(store, lifecycle, messages, checks);

    match cli.command {
        Commands::Task(args) => commands::task::run(&controller, args, cli.output).await,
        Commands::Message(args) => commands::message::run(&controller, args, cli.output),
        Commands::Check(args) => commands::check::run(&controller, args, cli.output),
        Commands::Daemon(args) => commands::daemon::run(&controller, args).await,
    }
}

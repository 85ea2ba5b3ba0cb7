// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `crewly daemon run` — keeps the message and check schedulers alive for
//! the life of the process, restoring every persisted timer on startup and
//! draining them on shutdown via `start()`/`cleanup()`.

use anyhow::Result;
use clap::{Args, Subcommand};
use crewly_adapters::TmuxAdapter;
use crewly_controller::Controller;
use crewly_core::IdGen;
use tracing::info;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Arm both schedulers and block until interrupted
    Run,
}

pub async fn run<G: IdGen>(controller: &Controller<G, TmuxAdapter>, args: DaemonArgs) -> Result<()> {
    match args.command {
        DaemonCommand::Run => {
            controller.start();
            info!("crewly daemon started; message and check schedulers armed");
            tokio::signal::ctrl_c().await?;
            info!("shutdown signal received, draining timers");
            controller.cleanup().await;
        }
    }
    Ok(())
}

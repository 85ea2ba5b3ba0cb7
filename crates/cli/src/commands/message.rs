// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `crewly message` — the message scheduler exposed as CLI
//! subcommands.

use crate::commands::target::parse_target;
use crate::output::{print_response, OutputFormat};
use anyhow::{bail, Result};
use clap::{Args, Subcommand, ValueEnum};
use crewly_adapters::TmuxAdapter;
use crewly_controller::Controller;
use crewly_core::IdGen;
use crewly_storage::{DelayUnit, ProjectId, ScheduledMessage, ScheduledMessageId};

#[derive(Args)]
pub struct MessageArgs {
    #[command(subcommand)]
    pub command: MessageCommand,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DelayUnitArg {
    Seconds,
    Minutes,
    Hours,
}

impl From<DelayUnitArg> for DelayUnit {
    fn from(value: DelayUnitArg) -> Self {
        match value {
            DelayUnitArg::Seconds => DelayUnit::Seconds,
            DelayUnitArg::Minutes => DelayUnit::Minutes,
            DelayUnitArg::Hours => DelayUnit::Hours,
        }
    }
}

#[derive(Subcommand)]
pub enum MessageCommand {
    /// Persist a message and arm its timer
    Schedule {
        #[arg(long)]
        name: String,
        /// "orchestrator", "team:<id>", or "session:<name>"
        #[arg(long)]
        target: String,
        #[arg(long)]
        text: String,
        #[arg(long)]
        delay_amount: u64,
        #[arg(long, value_enum, default_value_t = DelayUnitArg::Minutes)]
        delay_unit: DelayUnitArg,
        #[arg(long)]
        recurring: bool,
        /// Tie this message's lifetime to a project; orphaned if it's deleted
        #[arg(long)]
        project: Option<String>,
    },
    /// Clear the in-memory timer for a message
    Cancel {
        #[arg(long)]
        id: String,
    },
    /// Re-install timers for every active persisted message
    RescheduleAll,
}

pub fn run<G: IdGen>(controller: &Controller<G, TmuxAdapter>, args: MessageArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        MessageCommand::Schedule { name, target, text, delay_amount, delay_unit, recurring, project } => {
            let target = parse_target(&target).map_err(|e| anyhow::anyhow!(e))?;
            if delay_amount == 0 {
                bail!("delay-amount must be greater than zero");
            }
            let now = chrono::Utc::now();
            let message = ScheduledMessage {
                id: ScheduledMessageId::new(uuid::Uuid::new_v4().to_string()),
                name,
                target,
                target_project: project.map(ProjectId::new),
                message: text,
                delay_amount,
                delay_unit: delay_unit.into(),
                is_recurring: recurring,
                is_active: true,
                last_run: None,
                created_at: now,
                updated_at: now,
            };
            let response = controller.schedule_message(message)?;
            print_response(&response, format);
        }
        MessageCommand::Cancel { id } => {
            let response = controller.cancel_message(&ScheduledMessageId::new(id));
            print_response(&response, format);
        }
        MessageCommand::RescheduleAll => {
            let response = controller.reschedule_all_messages();
            print_response(&response, format);
        }
    }
    Ok(())
}

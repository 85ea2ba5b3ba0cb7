// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `crewly check` — the check scheduler exposed as CLI
//! subcommands.

use crate::commands::target::parse_target;
use crate::output::{print_response, OutputFormat};
use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use crewly_adapters::TmuxAdapter;
use crewly_controller::Controller;
use crewly_core::IdGen;
use crewly_storage::{CheckId, CheckType};

#[derive(Args)]
pub struct CheckArgs {
    #[command(subcommand)]
    pub command: CheckCommand,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CheckTypeArg {
    CheckIn,
    ProgressCheck,
    CommitReminder,
    Continuation,
    Adaptive,
}

impl From<CheckTypeArg> for CheckType {
    fn from(value: CheckTypeArg) -> Self {
        match value {
            CheckTypeArg::CheckIn => CheckType::CheckIn,
            CheckTypeArg::ProgressCheck => CheckType::ProgressCheck,
            CheckTypeArg::CommitReminder => CheckType::CommitReminder,
            CheckTypeArg::Continuation => CheckType::Continuation,
            CheckTypeArg::Adaptive => CheckType::Adaptive,
        }
    }
}

#[derive(Subcommand)]
pub enum CheckCommand {
    /// Arm a one-time check-in
    Schedule {
        /// "orchestrator", "team:<id>", or "session:<name>"
        #[arg(long)]
        target: String,
        #[arg(long)]
        minutes: u64,
        #[arg(long)]
        prompt: String,
        #[arg(long = "type", value_enum, default_value_t = CheckTypeArg::CheckIn)]
        check_type: CheckTypeArg,
    },
    /// Arm a check that re-fires on a fixed interval
    ScheduleRecurring {
        #[arg(long)]
        target: String,
        #[arg(long)]
        interval_minutes: u64,
        #[arg(long)]
        prompt: String,
        #[arg(long = "type", value_enum, default_value_t = CheckTypeArg::CheckIn)]
        check_type: CheckTypeArg,
        /// Stop re-arming after this many firings; unbounded if omitted
        #[arg(long)]
        max_occurrences: Option<u32>,
    },
    /// Clear a scheduled check's in-memory timer
    Cancel {
        #[arg(long)]
        id: String,
    },
}

pub fn run<G: IdGen>(controller: &Controller<G, TmuxAdapter>, args: CheckArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        CheckCommand::Schedule { target, minutes, prompt, check_type } => {
            let target = parse_target(&target).map_err(|e| anyhow::anyhow!(e))?;
            let response = controller.schedule_check(target, minutes, &prompt, check_type.into())?;
            print_response(&response, format);
        }
        CheckCommand::ScheduleRecurring { target, interval_minutes, prompt, check_type, max_occurrences } => {
            let target = parse_target(&target).map_err(|e| anyhow::anyhow!(e))?;
            let response = controller.schedule_recurring_check(target, interval_minutes, &prompt, check_type.into(), max_occurrences)?;
            print_response(&response, format);
        }
        CheckCommand::Cancel { id } => {
            let response = controller.cancel_check(&CheckId::new(id));
            print_response(&response, format);
        }
    }
    Ok(())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `crewly task` — the folder state machine exposed as CLI
//! subcommands, one per controller operation.

use crate::output::{print_response, OutputFormat};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use crewly_adapters::TmuxAdapter;
use crewly_controller::Controller;
use crewly_core::IdGen;
use std::path::PathBuf;

#[derive(Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Move an /open/ task into /in_progress/ and assign it to a session
    Assign {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        session: String,
    },
    /// Complete an /in_progress/ task, optionally with schema-validated output
    Complete {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        session: String,
        /// Path to a JSON file with the task's output payload
        #[arg(long)]
        output_file: Option<PathBuf>,
    },
    /// Move an /in_progress/ task to /blocked/
    Block {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Move a /blocked/ task back to /open/
    Unblock {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        note: Option<String>,
    },
    /// Return the lexicographically first /open/ task
    Next {
        #[arg(long)]
        project: PathBuf,
        #[arg(long)]
        milestone: Option<String>,
    },
    /// Task counts + percent done for one milestone or the whole project
    Status {
        #[arg(long)]
        project: PathBuf,
        #[arg(long)]
        milestone: Option<String>,
    },
    /// Aggregate task counts across every milestone
    Progress {
        #[arg(long)]
        project: PathBuf,
    },
    /// Write a new task markdown file into /open/ (or /in_progress/)
    Create {
        #[arg(long)]
        project: PathBuf,
        #[arg(long)]
        milestone: String,
        #[arg(long)]
        file_name: String,
        #[arg(long)]
        title: String,
        #[arg(long = "role")]
        target_role: String,
        #[arg(long, default_value_t = 0)]
        delay_minutes: u64,
        /// Path to a JSON Schema file gating completion
        #[arg(long)]
        schema_file: Option<PathBuf>,
        #[arg(long)]
        start_in_progress: bool,
    },
    /// Read the `<task>.output.json` sibling of a completed task
    Output {
        #[arg(long)]
        path: PathBuf,
    },
    /// Reclaim tasks whose owning session has vanished or stopped heartbeating
    Recover {
        /// Currently-live session names; anything tracked outside this set is abandoned
        #[arg(long = "active")]
        active_sessions: Vec<String>,
        #[arg(long, default_value_t = 30 * 60)]
        threshold_secs: u64,
    },
}

pub async fn run<G: IdGen>(controller: &Controller<G, TmuxAdapter>, args: TaskArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        TaskCommand::Assign { path, session } => {
            let response = controller.assign_task(&path, &session).await?;
            print_response(&response, format);
        }
        TaskCommand::Complete { path, session, output_file } => {
            let output = output_file
                .map(|f| -> Result<_> {
                    let content = std::fs::read_to_string(&f).with_context(|| format!("reading {}", f.display()))?;
                    serde_json::from_str(&content).with_context(|| format!("parsing {} as JSON", f.display()))
                })
                .transpose()?;
            let response = controller.complete_task(&path, &session, output).await?;
            print_response(&response, format);
        }
        TaskCommand::Block { path, reason } => {
            let response = controller.block_task(&path, reason).await?;
            print_response(&response, format);
        }
        TaskCommand::Unblock { path, note } => {
            let response = controller.unblock_task(&path, note).await?;
            print_response(&response, format);
        }
        TaskCommand::Next { project, milestone } => {
            let response = controller.take_next_task(&project, milestone.as_deref());
            print_response(&response, format);
        }
        TaskCommand::Status { project, milestone } => {
            let response = controller.sync_task_status(&project, milestone.as_deref());
            print_response(&response, format);
        }
        TaskCommand::Progress { project } => {
            let response = controller.get_team_progress(&project);
            print_response(&response, format);
        }
        TaskCommand::Create { project, milestone, file_name, title, target_role, delay_minutes, schema_file, start_in_progress } => {
            let schema = schema_file
                .map(|f| -> Result<_> {
                    let content = std::fs::read_to_string(&f).with_context(|| format!("reading {}", f.display()))?;
                    serde_json::from_str(&content).with_context(|| format!("parsing {} as JSON", f.display()))
                })
                .transpose()?;
            let response = controller.create_task(
                &project,
                &milestone,
                &file_name,
                &title,
                &target_role,
                delay_minutes,
                schema.as_ref(),
                start_in_progress,
            )?;
            print_response(&response, format);
        }
        TaskCommand::Output { path } => {
            let response = controller.get_task_output(&path)?;
            print_response(&response, format);
        }
        TaskCommand::Recover { active_sessions, threshold_secs } => {
            let response = controller.recover_abandoned_tasks(&active_sessions, threshold_secs).await;
            print_response(&response, format);
        }
    }
    Ok(())
}

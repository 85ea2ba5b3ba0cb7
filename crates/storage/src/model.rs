// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `data.json` document schema: projects, teams,
//! assignments, settings, and the message scheduler's own persisted list.

use crewly_core::RuntimeType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

crewly_core::define_id! {
    pub struct ProjectId;
}
crewly_core::define_id! {
    pub struct TeamId;
}
crewly_core::define_id! {
    pub struct MemberId;
}
crewly_core::define_id! {
    pub struct ScheduledMessageId;
}

/// A project the daemon coordinates work for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub path: PathBuf,
}

/// A member's role within a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The team's orchestrator session — every team must have exactly one
    /// member in this role.
    Orchestrator,
    Worker,
}

/// A single fleet member: a named session driven by a specific runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub session_name: String,
    pub role: Role,
    #[serde(default = "default_runtime")]
    pub runtime_type: RuntimeType,
}

fn default_runtime() -> RuntimeType {
    RuntimeType::DEFAULT
}

/// A team of members collaborating on a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    pub members: Vec<Member>,
}

impl Team {
    pub fn member_by_session(&self, session_name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.session_name == session_name)
    }

    pub fn has_orchestrator(&self) -> bool {
        self.members.iter().any(|m| m.role == Role::Orchestrator)
    }
}

/// Directory entry mapping a session name to its owning team/member, used by
/// `findMemberBySessionName` without scanning every team on every lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub session_name: String,
    pub team_id: TeamId,
    pub member_id: MemberId,
}

/// Process-wide tunables that are part of the durable document rather than
/// environment-only configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_activity_cap")]
    pub activity_log_cap: usize,
    #[serde(default = "default_abandon_secs")]
    pub abandon_threshold_secs: u64,
    /// Whether `DataStore::save` writes a `data.json.backup` sibling (a copy
    /// of the document as it stood before the new one replaces it) before
    /// every save.
    #[serde(default = "default_backup_on_save")]
    pub backup_on_save: bool,
    #[serde(default, flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_activity_cap() -> usize {
    2000
}

fn default_abandon_secs() -> u64 {
    30 * 60
}

fn default_backup_on_save() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            activity_log_cap: default_activity_cap(),
            abandon_threshold_secs: default_abandon_secs(),
            backup_on_save: default_backup_on_save(),
            extra: HashMap::new(),
        }
    }
}

/// The unit a [`ScheduledMessage`]'s delay is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Seconds,
    Minutes,
    Hours,
}

impl DelayUnit {
    pub fn to_duration(self, amount: u64) -> std::time::Duration {
        let secs = match self {
            DelayUnit::Seconds => amount,
            DelayUnit::Minutes => amount * 60,
            DelayUnit::Hours => amount * 3600,
        };
        std::time::Duration::from_secs(secs)
    }
}

/// A one-shot or recurring message target: the orchestrator, a team (routed
/// to that team's orchestrator member), or a literal session name (used by
/// the check scheduler, which is handed a concrete session rather than a
/// symbolic role).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageTarget {
    Orchestrator,
    Team { team_id: TeamId },
    Literal { session_name: String },
}

/// A scheduled message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub id: ScheduledMessageId,
    pub name: String,
    pub target: MessageTarget,
    #[serde(default)]
    pub target_project: Option<ProjectId>,
    pub message: String,
    pub delay_amount: u64,
    pub delay_unit: DelayUnit,
    pub is_recurring: bool,
    pub is_active: bool,
    #[serde(default)]
    pub last_run: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// The complete `data.json` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Data {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub scheduled_messages: Vec<ScheduledMessage>,
}

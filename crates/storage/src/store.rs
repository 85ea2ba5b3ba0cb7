// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persistent store (component A): a whole-document `data.json`, guarded
//! by a single mutex and validated on every save.

use crate::atomic::{backup_before_write, load_json_strict, write_json_atomic, AtomicIoError};
use crate::model::{Assignment, Data, Member, Project, ScheduledMessage, Team};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Io(#[from] AtomicIoError),
    #[error("corrupt data.json: {0}")]
    CorruptStore(String),
    #[error("validation failed: {field}: {message}")]
    Validation { field: String, message: String },
    #[error("not found: {0}")]
    NotFound(String),
}

/// Checks `data` against referential-integrity invariants before a save is
/// allowed to land on disk.
fn validate(data: &Data) -> Result<(), StoreError> {
    for team in &data.teams {
        if !team.has_orchestrator() {
            return Err(StoreError::Validation {
                field: format!("teams[{}].members", team.id),
                message: "team has no member with role orchestrator".into(),
            });
        }
    }

    for assignment in &data.assignments {
        if !data.teams.iter().any(|t| t.id == assignment.team_id) {
            return Err(StoreError::Validation {
                field: "assignments[].teamId".into(),
                message: format!("team {} does not exist", assignment.team_id),
            });
        }
        let member_exists = data
            .teams
            .iter()
            .any(|t| t.members.iter().any(|m| m.id == assignment.member_id));
        if !member_exists {
            return Err(StoreError::Validation {
                field: "assignments[].memberId".into(),
                message: format!("member {} does not exist", assignment.member_id),
            });
        }
    }

    for team in &data.teams {
        if let Some(project_id) = &team.project_id {
            if !data.projects.iter().any(|p| &p.id == project_id) {
                return Err(StoreError::Validation {
                    field: format!("teams[{}].projectId", team.id),
                    message: format!("project {project_id} does not exist"),
                });
            }
        }
    }

    Ok(())
}

/// Owns `data.json`: the projects/teams/assignments/settings/scheduled
/// message document, loaded whole and rewritten whole on every mutation.
pub struct DataStore {
    path: PathBuf,
    data: Mutex<Data>,
}

impl DataStore {
    /// Loads `<home>/data.json`, falling back to an empty document if the
    /// file is absent. A malformed file is a hard failure
    /// ([`StoreError::CorruptStore`]), never silently discarded — the
    /// operator needs to know before the daemon starts trusting an empty
    /// store in place of one that failed to parse.
    pub fn load(home: &Path) -> Result<Self, StoreError> {
        let path = home.join("data.json");
        let data = match load_json_strict::<Data>(&path) {
            Ok(data) => data.unwrap_or_default(),
            Err(AtomicIoError::Json(e)) => return Err(StoreError::CorruptStore(e.to_string())),
            Err(e) => return Err(e.into()),
        };
        validate(&data)?;
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Validates, backs up the current file (if `settings.backup_on_save`
    /// is set — the default), then atomically replaces it. The backup is a
    /// plain copy of the last saved document, taken before the new one is
    /// written, so a bad save is still recoverable from `data.json.backup`.
    fn persist(&self, data: &Data) -> Result<(), StoreError> {
        validate(data)?;
        if data.settings.backup_on_save {
            backup_before_write(&self.path)?;
        }
        write_json_atomic(&self.path, data)?;
        Ok(())
    }

    /// Read-only access to the in-memory document.
    pub fn with_data<R>(&self, f: impl FnOnce(&Data) -> R) -> R {
        let data = self.data.lock();
        f(&data)
    }

    /// Applies `f` to a clone of the document; persists only if `f` returns
    /// `Ok` and the result passes validation. The in-memory copy is updated
    /// together with the file so the two never diverge.
    pub fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Data) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut guard = self.data.lock();
        let mut next = guard.clone();
        let result = f(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(result)
    }

    pub fn find_member_by_session_name(&self, session_name: &str) -> Option<(Team, Member)> {
        self.with_data(|data| {
            for team in &data.teams {
                if let Some(member) = team.member_by_session(session_name) {
                    return Some((team.clone(), member.clone()));
                }
            }
            None
        })
    }

    pub fn upsert_project(&self, project: Project) -> Result<(), StoreError> {
        self.mutate(|data| {
            if let Some(existing) = data.projects.iter_mut().find(|p| p.id == project.id) {
                *existing = project;
            } else {
                data.projects.push(project);
            }
            Ok(())
        })
    }

    pub fn upsert_team(&self, team: Team) -> Result<(), StoreError> {
        self.mutate(|data| {
            if let Some(existing) = data.teams.iter_mut().find(|t| t.id == team.id) {
                *existing = team;
            } else {
                data.teams.push(team);
            }
            Ok(())
        })
    }

    pub fn upsert_assignment(&self, assignment: Assignment) -> Result<(), StoreError> {
        self.mutate(|data| {
            if let Some(existing) = data
                .assignments
                .iter_mut()
                .find(|a| a.session_name == assignment.session_name)
            {
                *existing = assignment;
            } else {
                data.assignments.push(assignment);
            }
            Ok(())
        })
    }

    pub fn upsert_scheduled_message(&self, message: ScheduledMessage) -> Result<(), StoreError> {
        self.mutate(|data| {
            if let Some(existing) = data
                .scheduled_messages
                .iter_mut()
                .find(|m| m.id == message.id)
            {
                *existing = message;
            } else {
                data.scheduled_messages.push(message);
            }
            Ok(())
        })
    }

    pub fn remove_scheduled_message(&self, id: &crate::model::ScheduledMessageId) -> Result<(), StoreError> {
        self.mutate(|data| {
            let before = data.scheduled_messages.len();
            data.scheduled_messages.retain(|m| &m.id != id);
            if data.scheduled_messages.len() == before {
                return Err(StoreError::NotFound(format!("scheduled message {id}")));
            }
            Ok(())
        })
    }

    pub fn list_scheduled_messages(&self) -> Vec<ScheduledMessage> {
        self.with_data(|data| data.scheduled_messages.clone())
    }

    /// Also rejects a [`Role::Orchestrator`] being removed when it's the
    /// team's only orchestrator, surfacing that as a validation error rather
    /// than a silently broken team.
    pub fn remove_member(
        &self,
        team_id: &crate::model::TeamId,
        member_id: &crate::model::MemberId,
    ) -> Result<(), StoreError> {
        self.mutate(|data| {
            let team = data
                .teams
                .iter_mut()
                .find(|t| &t.id == team_id)
                .ok_or_else(|| StoreError::NotFound(format!("team {team_id}")))?;
            team.members.retain(|m| &m.id != member_id);
            if !team.has_orchestrator() {
                return Err(StoreError::Validation {
                    field: format!("teams[{team_id}].members"),
                    message: "removing member leaves team without an orchestrator".into(),
                });
            }
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

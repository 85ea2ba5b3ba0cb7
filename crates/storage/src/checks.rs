// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence for the check scheduler (component G): recurring and one-time
//! checks live in their own files (`recurring-checks.json`,
//! `one-time-checks.json`), separate from `data.json`, matching the
//! filesystem layout's treatment of them as an optional, independently
//! evolving store.

use crate::atomic::{load_json_with_backup, write_json_atomic, AtomicIoError};
use crate::model::MessageTarget;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

crewly_core::define_id! {
    pub struct CheckId;
}

#[derive(Debug, Error)]
pub enum ChecksError {
    #[error("{0}")]
    Io(#[from] AtomicIoError),
    #[error("not found: {0}")]
    NotFound(String),
}

/// The programmatic check kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckType {
    CheckIn,
    ProgressCheck,
    CommitReminder,
    Continuation,
    Adaptive,
}

/// A check that re-fires on a fixed interval until cancelled or its
/// occurrence cap is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringCheck {
    pub id: CheckId,
    pub name: String,
    pub target: MessageTarget,
    pub prompt: String,
    #[serde(default = "default_check_type")]
    pub check_type: CheckType,
    pub interval_secs: u64,
    pub is_active: bool,
    #[serde(default)]
    pub last_run: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub current_occurrence: u32,
    #[serde(default)]
    pub max_occurrences: Option<u32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

fn default_check_type() -> CheckType {
    CheckType::CheckIn
}

/// A check that fires once, optionally rescheduling itself adaptively based
/// on the previous response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneTimeCheck {
    pub id: CheckId,
    pub name: String,
    pub target: MessageTarget,
    pub prompt: String,
    #[serde(default = "default_check_type")]
    pub check_type: CheckType,
    pub fire_at: chrono::DateTime<chrono::Utc>,
    pub fired: bool,
    #[serde(default)]
    pub continuation_of: Option<CheckId>,
    /// Carried through for [`CheckType::Continuation`] checks, which hand
    /// these to the external Continuation collaborator rather than deliver
    /// `prompt` as a message.
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub project_path: Option<std::path::PathBuf>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Owns both check files behind one lock each, mirroring `DataStore`'s
/// load-whole/mutate/save-whole shape but kept as a separate store since the
/// two kinds of checks are cancelled and queried independently of teams.
pub struct ChecksStore {
    recurring_path: PathBuf,
    recurring: Mutex<Vec<RecurringCheck>>,
    one_time_path: PathBuf,
    one_time: Mutex<Vec<OneTimeCheck>>,
}

impl ChecksStore {
    pub fn load(home: &Path) -> Result<Self, ChecksError> {
        let recurring_path = home.join("recurring-checks.json");
        let one_time_path = home.join("one-time-checks.json");
        let recurring = load_json_with_backup::<Vec<RecurringCheck>>(&recurring_path)?.unwrap_or_default();
        let one_time = load_json_with_backup::<Vec<OneTimeCheck>>(&one_time_path)?.unwrap_or_default();
        Ok(Self {
            recurring_path,
            recurring: Mutex::new(recurring),
            one_time_path,
            one_time: Mutex::new(one_time),
        })
    }

    pub fn upsert_recurring(&self, check: RecurringCheck) -> Result<(), ChecksError> {
        let mut guard = self.recurring.lock();
        if let Some(existing) = guard.iter_mut().find(|c| c.id == check.id) {
            *existing = check;
        } else {
            guard.push(check);
        }
        write_json_atomic(&self.recurring_path, &*guard)?;
        Ok(())
    }

    pub fn cancel_recurring(&self, id: &CheckId) -> Result<(), ChecksError> {
        let mut guard = self.recurring.lock();
        let before = guard.len();
        guard.retain(|c| &c.id != id);
        if guard.len() == before {
            return Err(ChecksError::NotFound(format!("recurring check {id}")));
        }
        write_json_atomic(&self.recurring_path, &*guard)?;
        Ok(())
    }

    pub fn list_recurring(&self) -> Vec<RecurringCheck> {
        self.recurring.lock().clone()
    }

    pub fn upsert_one_time(&self, check: OneTimeCheck) -> Result<(), ChecksError> {
        let mut guard = self.one_time.lock();
        if let Some(existing) = guard.iter_mut().find(|c| c.id == check.id) {
            *existing = check;
        } else {
            guard.push(check);
        }
        write_json_atomic(&self.one_time_path, &*guard)?;
        Ok(())
    }

    pub fn cancel_one_time(&self, id: &CheckId) -> Result<(), ChecksError> {
        let mut guard = self.one_time.lock();
        let before = guard.len();
        guard.retain(|c| &c.id != id);
        if guard.len() == before {
            return Err(ChecksError::NotFound(format!("one-time check {id}")));
        }
        write_json_atomic(&self.one_time_path, &*guard)?;
        Ok(())
    }

    pub fn list_one_time(&self) -> Vec<OneTimeCheck> {
        self.one_time.lock().clone()
    }
}

#[cfg(test)]
#[path = "checks_tests.rs"]
mod tests;

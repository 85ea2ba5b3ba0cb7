// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-progress task tracking index (`in_progress_tasks.json`): a small
//! side table the task lifecycle engine uses to find abandoned tasks without
//! walking every team's task folders.

use crate::atomic::{load_json_with_backup, write_json_atomic, AtomicIoError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("{0}")]
    Io(#[from] AtomicIoError),
}

/// One entry per task currently assigned to a session. Created when a task
/// is assigned, removed on a terminal transition or abandonment recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InProgressTaskEntry {
    pub task_id: String,
    pub team_id: String,
    pub session_name: String,
    pub task_path: PathBuf,
    pub assigned_at: chrono::DateTime<chrono::Utc>,
    pub last_heartbeat: chrono::DateTime<chrono::Utc>,
}

/// `in_progress_tasks.json`, guarded by a mutex like `data.json`.
pub struct TrackingIndex {
    path: PathBuf,
    entries: Mutex<Vec<InProgressTaskEntry>>,
}

impl TrackingIndex {
    pub fn load(home: &Path) -> Result<Self, TrackingError> {
        let path = home.join("in_progress_tasks.json");
        let entries = load_json_with_backup::<Vec<InProgressTaskEntry>>(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &[InProgressTaskEntry]) -> Result<(), TrackingError> {
        write_json_atomic(&self.path, &entries)?;
        Ok(())
    }

    pub fn insert(&self, entry: InProgressTaskEntry) -> Result<(), TrackingError> {
        let mut guard = self.entries.lock();
        guard.retain(|e| e.task_id != entry.task_id);
        guard.push(entry);
        self.persist(&guard)
    }

    pub fn remove(&self, task_id: &str) -> Result<Option<InProgressTaskEntry>, TrackingError> {
        let mut guard = self.entries.lock();
        let position = guard.iter().position(|e| e.task_id == task_id);
        let removed = position.map(|idx| guard.remove(idx));
        if removed.is_some() {
            self.persist(&guard)?;
        }
        Ok(removed)
    }

    pub fn touch_heartbeat(
        &self,
        task_id: &str,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<bool, TrackingError> {
        let mut guard = self.entries.lock();
        let Some(entry) = guard.iter_mut().find(|e| e.task_id == task_id) else {
            return Ok(false);
        };
        entry.last_heartbeat = at;
        self.persist(&guard)?;
        Ok(true)
    }

    pub fn list(&self) -> Vec<InProgressTaskEntry> {
        self.entries.lock().clone()
    }

    /// Entries whose last heartbeat is older than `threshold_secs`, relative
    /// to `now` — candidates for abandonment recovery.
    pub fn stale(
        &self,
        now: chrono::DateTime<chrono::Utc>,
        threshold_secs: u64,
    ) -> Vec<InProgressTaskEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| {
                let age = now.signed_duration_since(e.last_heartbeat);
                age.num_seconds() >= threshold_secs as i64
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "tracking_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The activity log (`activity.json`): an append-mostly, ring-rotated record
//! of delivery attempts and lifecycle events.
//!
//! Writes are serialized by a single in-process writer task reading from an
//! mpsc channel, so concurrent callers never race on the file themselves —
//! they just hand their entry to the channel and move on.

use crate::atomic::{load_json_with_backup, write_json_atomic, AtomicIoError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::error;

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("{0}")]
    Io(#[from] AtomicIoError),
    #[error("activity log writer task is no longer running")]
    WriterGone,
}

/// A single entry appended to the activity log.
///
/// Doubles as a `DeliveryLog` record: a scheduler delivery attempt is
/// appended with `success`/`error` populated, while a lifecycle event
/// leaves them `None`. Both share one append-only, capped file rather
/// than two.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub kind: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub session_name: Option<String>,
    pub detail: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ActivityEntry {
    /// A plain lifecycle/activity entry with no delivery outcome attached.
    pub fn activity(
        timestamp: chrono::DateTime<chrono::Utc>,
        kind: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            kind: kind.into(),
            task_id: None,
            session_name: None,
            detail: detail.into(),
            success: None,
            error: None,
        }
    }

    /// A delivery-outcome entry.
    #[allow(clippy::too_many_arguments)]
    pub fn delivery(
        timestamp: chrono::DateTime<chrono::Utc>,
        kind: impl Into<String>,
        session_name: impl Into<String>,
        detail: impl Into<String>,
        success: bool,
        error: Option<String>,
    ) -> Self {
        Self {
            timestamp,
            kind: kind.into(),
            task_id: None,
            session_name: Some(session_name.into()),
            detail: detail.into(),
            success: Some(success),
            error,
        }
    }
}

enum Command {
    Append(ActivityEntry, oneshot::Sender<Result<(), ActivityError>>),
    Recent(usize, oneshot::Sender<Vec<ActivityEntry>>),
}

/// Handle to the background writer task. Cloning is cheap; all clones share
/// the same channel and the same in-memory ring buffer.
#[derive(Clone)]
pub struct ActivityLog {
    tx: mpsc::UnboundedSender<Command>,
}

impl ActivityLog {
    /// Loads `<home>/activity.json` (or starts empty) and spawns the writer
    /// task that owns the file from then on.
    pub fn load(home: &Path, cap: usize) -> Result<Self, ActivityError> {
        let path = home.join("activity.json");
        let initial = load_json_with_backup::<Vec<ActivityEntry>>(&path)?.unwrap_or_default();

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(path, cap, initial, rx));
        Ok(Self { tx })
    }

    pub async fn append(&self, entry: ActivityEntry) -> Result<(), ActivityError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Append(entry, reply_tx))
            .map_err(|_| ActivityError::WriterGone)?;
        reply_rx.await.map_err(|_| ActivityError::WriterGone)?
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<ActivityEntry>, ActivityError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Recent(limit, reply_tx))
            .map_err(|_| ActivityError::WriterGone)?;
        reply_rx.await.map_err(|_| ActivityError::WriterGone)
    }
}

async fn run_writer(
    path: PathBuf,
    cap: usize,
    mut entries: Vec<ActivityEntry>,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Append(entry, reply) => {
                entries.push(entry);
                if entries.len() > cap {
                    let excess = entries.len() - cap;
                    entries.drain(0..excess);
                }
                let result = write_json_atomic(&path, &entries).map_err(ActivityError::from);
                if let Err(e) = &result {
                    error!(error = %e, path = %path.display(), "failed to persist activity log");
                }
                let _ = reply.send(result);
            }
            Command::Recent(limit, reply) => {
                let start = entries.len().saturating_sub(limit);
                let _ = reply.send(entries[start..].to_vec());
            }
        }
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The message scheduler (component F): one active timer per scheduled
//! message, a single FIFO execution queue so two concurrently-firing
//! messages never interleave their two-phase writes to the same session,
//! recurring reschedule, orphan cleanup, and restart-restore.

use crewly_adapters::SessionAdapter;
use crewly_core::RuntimeType;
use crewly_delivery::{deliver, DeliveryPolicy, StuckScanner};
use crewly_storage::{
    ActivityEntry, ActivityLog, DataStore, MessageTarget, ScheduledMessage, ScheduledMessageId,
    StoreError,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Reserved session name the `"orchestrator"` scheduling target maps to.
pub const ORCHESTRATOR_SESSION_NAME: &str = "orchestrator";

/// Default period for the background stuck-message scanner.
const DEFAULT_STUCK_SCAN_PERIOD: Duration = Duration::from_secs(30);

fn epoch_ms(at: chrono::DateTime<chrono::Utc>) -> u64 {
    at.timestamp_millis().max(0) as u64
}

const CONTINUATION_PROLOGUE: &str =
    "[Scheduled check-in] Please acknowledge this message, then resume whatever you were working on before it arrived.\n\n";
const CONTINUATION_EPILOGUE: &str =
    "\n\n[End scheduled check-in] Continue your prior work once you've acknowledged the above.";

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanCleanupReport {
    pub found: u32,
    pub deactivated: u32,
    pub errors: Vec<String>,
}

fn wrap_continuation(message: &str) -> String {
    format!("{CONTINUATION_PROLOGUE}{message}{CONTINUATION_EPILOGUE}")
}

struct Inner<A: SessionAdapter> {
    store: Arc<DataStore>,
    activity: ActivityLog,
    adapter: A,
    delivery_policy: DeliveryPolicy,
    inter_message_quantum: Duration,
    stuck: Arc<StuckScanner>,
    stuck_scan_period: Mutex<Duration>,
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
    queue_tx: mpsc::UnboundedSender<ScheduledMessage>,
}

impl<A: SessionAdapter> Inner<A> {
    fn resolve_target(&self, target: &MessageTarget) -> Option<(String, RuntimeType)> {
        crate::target::resolve_target(&self.store, target)
    }

    fn project_exists(&self, project_id: &crewly_storage::ProjectId) -> bool {
        self.store
            .with_data(|data| data.projects.iter().any(|p| &p.id == project_id))
    }

    async fn execute_message(self: &Arc<Self>, mut message: ScheduledMessage) {
        let now = chrono::Utc::now();

        if let Some(project_id) = &message.target_project {
            if !self.project_exists(project_id) {
                message.is_active = false;
                message.last_run = Some(now);
                let _ = self.store.upsert_scheduled_message(message.clone());
                self.cancel_timer(&message.id);
                let _ = self
                    .activity
                    .append(ActivityEntry::delivery(
                        now,
                        "message_executed",
                        "(orphaned)",
                        format!("message {} orphaned: project {} no longer exists", message.id, project_id),
                        false,
                        Some("orphaned".to_string()),
                    ))
                    .await;
                warn!(message_id = %message.id, "scheduled message orphaned: project gone");
                return;
            }
        }

        let Some((session_name, runtime)) = self.resolve_target(&message.target) else {
            warn!(message_id = %message.id, "scheduled message target could not be resolved");
            let _ = self
                .activity
                .append(ActivityEntry::delivery(
                    now,
                    "message_executed",
                    "(unresolved)",
                    format!("message {} could not resolve a target session", message.id),
                    false,
                    Some("unresolved target".to_string()),
                ))
                .await;
            self.finish(message, now, false).await;
            return;
        };

        let payload = wrap_continuation(&message.message);
        self.stuck.track(message.id.as_str(), &session_name, &payload, runtime, epoch_ms(now));
        let outcome = deliver(&self.adapter, &session_name, &payload, runtime, &self.delivery_policy).await;

        let (success, error) = match &outcome {
            Ok(o) => {
                info!(message_id = %message.id, attempts = o.attempts, "message_executed");
                self.stuck.acknowledge(message.id.as_str());
                (true, None)
            }
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "message delivery failed");
                (false, Some(e.to_string()))
            }
        };

        let _ = self
            .activity
            .append(ActivityEntry::delivery(
                now,
                "message_executed",
                session_name,
                message.name.clone(),
                success,
                error,
            ))
            .await;

        self.finish(message, now, success).await;
    }

    async fn finish(self: &Arc<Self>, mut message: ScheduledMessage, now: chrono::DateTime<chrono::Utc>, _success: bool) {
        message.last_run = Some(now);
        if !message.is_recurring {
            message.is_active = false;
        }
        let _ = self.store.upsert_scheduled_message(message.clone());

        if message.is_recurring && message.is_active {
            self.arm_timer(message);
        } else {
            self.cancel_timer(&message.id);
        }
    }

    fn cancel_timer(&self, id: &ScheduledMessageId) {
        if let Some(handle) = self.timers.lock().remove(id.as_str()) {
            handle.abort();
        }
    }

    /// Installs a fresh timer for `message`, firing `delayAmount x delayUnit`
    /// from now — never from `createdAt`, so a restart never produces a
    /// catch-up storm.
    fn arm_timer(self: &Arc<Self>, message: ScheduledMessage) {
        self.cancel_timer(&message.id);
        let delay = message.delay_unit.to_duration(message.delay_amount);
        let inner = self.clone();
        let id = message.id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = inner.queue_tx.send(message);
        });
        self.timers.lock().insert(id.as_str().to_string(), handle);
    }
}

/// Owns one active timer per scheduled message and the single FIFO queue
/// that sequences their delivery.
pub struct MessageScheduler<A: SessionAdapter> {
    inner: Arc<Inner<A>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stuck_scanner_task: Mutex<Option<JoinHandle<()>>>,
    queue_rx: Mutex<Option<mpsc::UnboundedReceiver<ScheduledMessage>>>,
}

impl<A: SessionAdapter> MessageScheduler<A> {
    pub fn new(
        store: Arc<DataStore>,
        activity: ActivityLog,
        adapter: A,
        delivery_policy: DeliveryPolicy,
        inter_message_quantum: Duration,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            store,
            activity,
            adapter,
            delivery_policy,
            inter_message_quantum,
            stuck: Arc::new(StuckScanner::new()),
            stuck_scan_period: Mutex::new(DEFAULT_STUCK_SCAN_PERIOD),
            timers: Mutex::new(HashMap::new()),
            queue_tx,
        });
        Self {
            inner,
            worker: Mutex::new(None),
            stuck_scanner_task: Mutex::new(None),
            queue_rx: Mutex::new(Some(queue_rx)),
        }
    }

    /// Overrides the background stuck-message scanner's period.
    pub fn with_stuck_scan_period(self, period: Duration) -> Self {
        *self.inner.stuck_scan_period.lock() = period;
        self
    }

    /// Spawns the sequential delivery worker, the background stuck-message
    /// scanner, and installs a timer for every persisted active message.
    /// Calling this more than once is a no-op for the worker and scanner
    /// (each only spawns if not already running), but always re-arms timers
    /// for every active message.
    pub fn start(&self) {
        let mut rx_slot = self.queue_rx.lock();
        if let Some(mut rx) = rx_slot.take() {
            let inner = self.inner.clone();
            let handle = tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    inner.execute_message(message).await;
                    tokio::time::sleep(inner.inter_message_quantum).await;
                }
            });
            *self.worker.lock() = Some(handle);
        }
        drop(rx_slot);

        let mut scanner_slot = self.stuck_scanner_task.lock();
        if scanner_slot.is_none() {
            let inner = self.inner.clone();
            let handle = tokio::spawn(async move {
                loop {
                    let period = *inner.stuck_scan_period.lock();
                    tokio::time::sleep(period).await;
                    let now = epoch_ms(chrono::Utc::now());
                    let threshold = period.as_millis() as u64;
                    let _ = inner
                        .stuck
                        .rescan_once(&inner.adapter, now, threshold, &inner.delivery_policy.verify_schedule)
                        .await;
                }
            });
            *scanner_slot = Some(handle);
        }
        drop(scanner_slot);

        for message in self.inner.store.list_scheduled_messages() {
            if message.is_active {
                self.inner.arm_timer(message);
            }
        }
    }

    /// Persists `message` and (re)installs its timer if active.
    pub fn schedule_message(&self, message: ScheduledMessage) -> Result<(), SchedulerError> {
        self.inner.cancel_timer(&message.id);
        self.inner.store.upsert_scheduled_message(message.clone())?;
        if message.is_active {
            self.inner.arm_timer(message);
        }
        Ok(())
    }

    /// Clears the in-memory timer and drops the in-memory entry. The
    /// persisted record is untouched — the caller deactivates it explicitly
    /// if that's the intent.
    pub fn cancel_message(&self, id: &ScheduledMessageId) {
        self.inner.cancel_timer(id);
    }

    /// Deactivates every active, project-targeted message whose project no
    /// longer exists.
    pub async fn cleanup_orphaned_messages(&self) -> OrphanCleanupReport {
        let mut report = OrphanCleanupReport::default();
        for message in self.inner.store.list_scheduled_messages() {
            let Some(project_id) = &message.target_project else {
                continue;
            };
            if !message.is_active {
                continue;
            }
            report.found += 1;
            if self.inner.project_exists(project_id) {
                continue;
            }
            self.inner.cancel_timer(&message.id);
            let mut deactivated = message.clone();
            deactivated.is_active = false;
            match self.inner.store.upsert_scheduled_message(deactivated) {
                Ok(()) => report.deactivated += 1,
                Err(e) => report.errors.push(format!("{}: {e}", message.id)),
            }
        }
        report
    }

    /// Cancels every timer, the stuck-message scanner, and lets the
    /// delivery worker drain and exit.
    pub async fn cleanup(&self) {
        let ids: Vec<String> = self.inner.timers.lock().keys().cloned().collect();
        for id in ids {
            if let Some(handle) = self.inner.timers.lock().remove(&id) {
                handle.abort();
            }
        }
        if let Some(handle) = self.worker.lock().take() {
            handle.abort();
        }
        if let Some(handle) = self.stuck_scanner_task.lock().take() {
            handle.abort();
        }
    }

    pub fn pending_timer_count(&self) -> usize {
        self.inner.timers.lock().len()
    }

    /// Deliveries awaiting acknowledgement or rescan.
    pub fn pending_stuck_count(&self) -> usize {
        self.inner.stuck.pending_count()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The check scheduler (component G): programmatic one-shot and recurring
//! check-ins the orchestrator runtime installs on itself, distinct from the
//! user-facing message scheduler in that the message content is
//! programmatic, intervals are minutes-only, and a check can be a
//! *continuation* (dispatched to an external collaborator) or *adaptive*
//! (its interval computed once from current activity).

use crewly_adapters::SessionAdapter;
use crewly_delivery::{deliver, DeliveryPolicy, StuckScanner};
use crewly_storage::{
    ActivityEntry, ActivityLog, CheckId, ChecksError, ChecksStore, DataStore, MessageTarget,
    OneTimeCheck, RecurringCheck,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Default period for the background stuck-message scanner shared with the
/// message scheduler.
const DEFAULT_STUCK_SCAN_PERIOD: Duration = Duration::from_secs(30);

fn epoch_ms(at: DateTime<Utc>) -> u64 {
    at.timestamp_millis().max(0) as u64
}

/// Re-exported so `crewly_engine::CheckType` names the same check kind the
/// rest of the engine's public API speaks in, without callers having to
/// reach into `crewly_storage` directly.
pub use crewly_storage::CheckType;

#[derive(Debug, Error)]
pub enum CheckSchedulerError {
    #[error("{0}")]
    Checks(#[from] ChecksError),
}

/// Fixed intervals for `scheduleDefaultCheckins`, overridable at
/// construction so a deployment can tune them without recompiling.
#[derive(Debug, Clone, Copy)]
pub struct DefaultCheckinIntervals {
    pub initial_minutes: u64,
    pub progress_minutes: u64,
    pub commit_reminder_minutes: u64,
}

impl Default for DefaultCheckinIntervals {
    fn default() -> Self {
        Self {
            initial_minutes: 5,
            progress_minutes: 30,
            commit_reminder_minutes: 25,
        }
    }
}

/// Bounds and sensitivity for `scheduleAdaptiveCheckin`'s interval formula:
/// `interval = clamp(base × factor if busy, base / factor if idle, base
/// otherwise, [min, max])`.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveConfig {
    pub base_minutes: u64,
    pub min_minutes: u64,
    pub max_minutes: u64,
    pub factor: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            base_minutes: 15,
            min_minutes: 5,
            max_minutes: 60,
            factor: 2.0,
        }
    }
}

impl AdaptiveConfig {
    fn interval_minutes(&self, status: ActivityStatus) -> u64 {
        let base = self.base_minutes as f64;
        let raw = match status {
            ActivityStatus::InProgress => base * self.factor,
            ActivityStatus::Idle => base / self.factor,
        };
        raw.clamp(self.min_minutes as f64, self.max_minutes as f64).round() as u64
    }
}

/// What the Activity Monitor collaborator reports for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    Idle,
    InProgress,
}

/// Queried once at `scheduleAdaptiveCheckin` time, never re-evaluated for the
/// lifetime of that check.
pub trait ActivityMonitor: Send + Sync {
    fn status(&self, session_name: &str) -> ActivityStatus;
}

/// The synthetic event a continuation check hands to its collaborator
/// instead of delivering `prompt` as a message.
#[derive(Debug, Clone)]
pub struct ContinuationEvent {
    pub trigger: String,
    pub session: String,
    pub agent_id: Option<String>,
    pub project_path: Option<PathBuf>,
    pub timestamp: DateTime<Utc>,
}

pub trait ContinuationHandler: Send + Sync {
    fn notify(&self, event: ContinuationEvent);
}

/// Read-only projection over in-memory + persisted check state.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledCheckView {
    pub id: CheckId,
    pub name: String,
    pub session_name: String,
    pub check_type: CheckType,
    pub recurring: bool,
    pub interval_minutes: Option<u64>,
    pub fire_at: Option<DateTime<Utc>>,
    pub current_occurrence: Option<u32>,
    pub max_occurrences: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckStats {
    pub recurring_active: usize,
    pub one_time_pending: usize,
    pub active_timers: usize,
}

struct Inner<A: SessionAdapter> {
    checks: Arc<ChecksStore>,
    data_store: Arc<DataStore>,
    activity: ActivityLog,
    adapter: A,
    delivery_policy: DeliveryPolicy,
    default_intervals: Mutex<DefaultCheckinIntervals>,
    adaptive: Mutex<AdaptiveConfig>,
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
    continuation: Mutex<Option<Arc<dyn ContinuationHandler>>>,
    monitor: Mutex<Option<Arc<dyn ActivityMonitor>>>,
    stuck: Arc<StuckScanner>,
    stuck_scan_period: Mutex<Duration>,
}

impl<A: SessionAdapter> Inner<A> {
    fn resolve(&self, target: &MessageTarget) -> Option<(String, crewly_core::RuntimeType)> {
        crate::target::resolve_target(&self.data_store, target)
    }

    async fn deliver_check(&self, target: &MessageTarget, prompt: &str, check_id: &CheckId) {
        let now = Utc::now();
        let Some((session_name, runtime)) = self.resolve(target) else {
            warn!(check_id = %check_id, "check target could not be resolved");
            let _ = self
                .activity
                .append(ActivityEntry::delivery(
                    now,
                    "check_executed",
                    "(unresolved)",
                    format!("check {check_id} could not resolve a target session"),
                    false,
                    Some("unresolved target".to_string()),
                ))
                .await;
            return;
        };

        self.stuck.track(check_id.as_str(), &session_name, prompt, runtime, epoch_ms(now));
        let outcome = deliver(&self.adapter, &session_name, prompt, runtime, &self.delivery_policy).await;
        let (success, error) = match &outcome {
            Ok(o) => {
                info!(check_id = %check_id, attempts = o.attempts, "check_executed");
                self.stuck.acknowledge(check_id.as_str());
                (true, None)
            }
            Err(e) => {
                warn!(check_id = %check_id, error = %e, "check delivery failed");
                (false, Some(e.to_string()))
            }
        };
        let _ = self
            .activity
            .append(ActivityEntry::delivery(now, "check_executed", session_name, check_id.to_string(), success, error))
            .await;
    }

    fn cancel_timer(&self, id: &CheckId) {
        if let Some(handle) = self.timers.lock().remove(id.as_str()) {
            handle.abort();
        }
    }
}

/// Owns the in-memory timers backing persisted recurring and one-time
/// checks.
pub struct CheckScheduler<A: SessionAdapter> {
    inner: Arc<Inner<A>>,
    stuck_scanner_task: Mutex<Option<JoinHandle<()>>>,
}

impl<A: SessionAdapter> CheckScheduler<A> {
    pub fn new(
        checks: Arc<ChecksStore>,
        data_store: Arc<DataStore>,
        activity: ActivityLog,
        adapter: A,
        delivery_policy: DeliveryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                checks,
                data_store,
                activity,
                adapter,
                delivery_policy,
                default_intervals: Mutex::new(DefaultCheckinIntervals::default()),
                adaptive: Mutex::new(AdaptiveConfig::default()),
                timers: Mutex::new(HashMap::new()),
                continuation: Mutex::new(None),
                monitor: Mutex::new(None),
                stuck: Arc::new(StuckScanner::new()),
                stuck_scan_period: Mutex::new(DEFAULT_STUCK_SCAN_PERIOD),
            }),
            stuck_scanner_task: Mutex::new(None),
        }
    }

    pub fn with_default_intervals(self, intervals: DefaultCheckinIntervals) -> Self {
        *self.inner.default_intervals.lock() = intervals;
        self
    }

    pub fn with_adaptive_config(self, config: AdaptiveConfig) -> Self {
        *self.inner.adaptive.lock() = config;
        self
    }

    /// Overrides the background stuck-message scanner's period.
    pub fn with_stuck_scan_period(self, period: Duration) -> Self {
        *self.inner.stuck_scan_period.lock() = period;
        self
    }

    pub fn set_continuation_handler(&self, handler: Arc<dyn ContinuationHandler>) {
        *self.inner.continuation.lock() = Some(handler);
    }

    pub fn set_activity_monitor(&self, monitor: Arc<dyn ActivityMonitor>) {
        *self.inner.monitor.lock() = Some(monitor);
    }

    /// Reinstalls timers for every persisted check. Recurring checks always
    /// fire their next occurrence at `now + interval`; one-shot checks fire
    /// after their remaining time, or are discarded if `fireAt` has already
    /// passed.
    pub fn start(&self) {
        for check in self.inner.checks.list_recurring() {
            if check.is_active {
                self.arm_recurring(check);
            }
        }
        for check in self.inner.checks.list_one_time() {
            if check.fired {
                continue;
            }
            let remaining = check.fire_at.signed_duration_since(Utc::now());
            if remaining.num_milliseconds() <= 0 {
                let _ = self.inner.checks.cancel_one_time(&check.id);
                continue;
            }
            self.arm_one_time(check);
        }

        let mut scanner_slot = self.stuck_scanner_task.lock();
        if scanner_slot.is_none() {
            let inner = self.inner.clone();
            let handle = tokio::spawn(async move {
                loop {
                    let period = *inner.stuck_scan_period.lock();
                    tokio::time::sleep(period).await;
                    let now = epoch_ms(Utc::now());
                    let threshold = period.as_millis() as u64;
                    let _ = inner
                        .stuck
                        .rescan_once(&inner.adapter, now, threshold, &inner.delivery_policy.verify_schedule)
                        .await;
                }
            });
            *scanner_slot = Some(handle);
        }
    }

    fn arm_recurring(&self, check: RecurringCheck) {
        self.inner.cancel_timer(&check.id);
        let inner = self.inner.clone();
        let id = check.id.clone();
        let handle = tokio::spawn(async move {
            let mut check = check;
            loop {
                tokio::time::sleep(Duration::from_secs(check.interval_secs)).await;
                inner.deliver_check(&check.target, &check.prompt, &check.id).await;

                check.current_occurrence += 1;
                check.last_run = Some(Utc::now());
                let done = check
                    .max_occurrences
                    .is_some_and(|max| check.current_occurrence >= max);
                if done {
                    let _ = inner.checks.cancel_recurring(&check.id);
                    inner.timers.lock().remove(check.id.as_str());
                    return;
                }
                if inner.checks.upsert_recurring(check.clone()).is_err() {
                    return;
                }
            }
        });
        self.inner.timers.lock().insert(id.as_str().to_string(), handle);
    }

    fn arm_one_time(&self, check: OneTimeCheck) {
        self.inner.cancel_timer(&check.id);
        let delay = check
            .fire_at
            .signed_duration_since(Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let inner = self.inner.clone();
        let id = check.id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if check.check_type == CheckType::Continuation {
                let handler = inner.continuation.lock().clone();
                match handler {
                    Some(handler) => {
                        let Some((session_name, _)) = inner.resolve(&check.target) else {
                            inner.deliver_check(&check.target, &check.prompt, &check.id).await;
                            let _ = inner.checks.cancel_one_time(&check.id);
                            inner.timers.lock().remove(check.id.as_str());
                            return;
                        };
                        handler.notify(ContinuationEvent {
                            trigger: "explicit_request".to_string(),
                            session: session_name,
                            agent_id: check.agent_id.clone(),
                            project_path: check.project_path.clone(),
                            timestamp: Utc::now(),
                        });
                    }
                    None => inner.deliver_check(&check.target, &check.prompt, &check.id).await,
                }
            } else {
                inner.deliver_check(&check.target, &check.prompt, &check.id).await;
            }

            let _ = inner.checks.cancel_one_time(&check.id);
            inner.timers.lock().remove(check.id.as_str());
        });
        self.inner.timers.lock().insert(id.as_str().to_string(), handle);
    }

    /// One-shot check; persists then arms.
    pub fn schedule_check(
        &self,
        session: MessageTarget,
        minutes: u64,
        prompt: impl Into<String>,
        check_type: CheckType,
    ) -> Result<CheckId, CheckSchedulerError> {
        let id = CheckId::new(uuid::Uuid::new_v4().to_string());
        let check = OneTimeCheck {
            id: id.clone(),
            name: format!("check-{id}"),
            target: session,
            prompt: prompt.into(),
            check_type,
            fire_at: Utc::now() + chrono::Duration::minutes(minutes as i64),
            fired: false,
            continuation_of: None,
            agent_id: None,
            project_path: None,
            created_at: Utc::now(),
        };
        self.inner.checks.upsert_one_time(check.clone())?;
        self.arm_one_time(check);
        Ok(id)
    }

    /// Recurring check; the *next* timer is armed only once the current
    /// delivery finishes, never a fixed-period wheel.
    pub fn schedule_recurring_check(
        &self,
        session: MessageTarget,
        interval_minutes: u64,
        prompt: impl Into<String>,
        check_type: CheckType,
        max_occurrences: Option<u32>,
    ) -> Result<CheckId, CheckSchedulerError> {
        let id = CheckId::new(uuid::Uuid::new_v4().to_string());
        let check = RecurringCheck {
            id: id.clone(),
            name: format!("recurring-{id}"),
            target: session,
            prompt: prompt.into(),
            check_type,
            interval_secs: interval_minutes * 60,
            is_active: true,
            last_run: None,
            current_occurrence: 0,
            max_occurrences,
            created_at: Utc::now(),
        };
        self.inner.checks.upsert_recurring(check.clone())?;
        self.arm_recurring(check);
        Ok(id)
    }

    /// Installs the standard trio: an initial one-shot, a recurring progress
    /// check, and a recurring commit reminder.
    pub fn schedule_default_checkins(
        &self,
        session_name: &str,
    ) -> Result<[CheckId; 3], CheckSchedulerError> {
        let target = MessageTarget::Literal {
            session_name: session_name.to_string(),
        };
        let intervals = *self.inner.default_intervals.lock();
        let initial = self.schedule_check(
            target.clone(),
            intervals.initial_minutes,
            "Initial check-in: how's it going so far?",
            CheckType::CheckIn,
        )?;
        let progress = self.schedule_recurring_check(
            target.clone(),
            intervals.progress_minutes,
            "Progress check-in: what's your current status?",
            CheckType::ProgressCheck,
            None,
        )?;
        let commit = self.schedule_recurring_check(
            target,
            intervals.commit_reminder_minutes,
            "Reminder: commit your progress if you haven't recently.",
            CheckType::CommitReminder,
            None,
        )?;
        Ok([initial, progress, commit])
    }

    /// One-shot check that, on fire, hands a synthetic event to the
    /// Continuation collaborator instead of delivering a message — or falls
    /// back to a regular check if no collaborator is set.
    pub fn schedule_continuation_check(
        &self,
        session_name: &str,
        delay_minutes: u64,
        agent_id: Option<String>,
        project_path: Option<PathBuf>,
    ) -> Result<CheckId, CheckSchedulerError> {
        let id = CheckId::new(uuid::Uuid::new_v4().to_string());
        let check = OneTimeCheck {
            id: id.clone(),
            name: format!("continuation-{id}"),
            target: MessageTarget::Literal {
                session_name: session_name.to_string(),
            },
            prompt: "Please acknowledge and resume your prior work.".to_string(),
            check_type: CheckType::Continuation,
            fire_at: Utc::now() + chrono::Duration::minutes(delay_minutes as i64),
            fired: false,
            continuation_of: None,
            agent_id,
            project_path,
            created_at: Utc::now(),
        };
        self.inner.checks.upsert_one_time(check.clone())?;
        self.arm_one_time(check);
        Ok(id)
    }

    /// One-shot check whose interval is computed once, from the Activity
    /// Monitor collaborator's current read on `session_name`, never
    /// re-evaluated for subsequent recurrences.
    pub fn schedule_adaptive_checkin(
        &self,
        session_name: &str,
        config: Option<AdaptiveConfig>,
    ) -> Result<CheckId, CheckSchedulerError> {
        let config = config.unwrap_or(*self.inner.adaptive.lock());
        let status = self
            .inner
            .monitor
            .lock()
            .as_ref()
            .map(|m| m.status(session_name))
            .unwrap_or(ActivityStatus::Idle);
        let minutes = config.interval_minutes(status);
        self.schedule_check(
            MessageTarget::Literal {
                session_name: session_name.to_string(),
            },
            minutes,
            "Adaptive check-in: how's progress?",
            CheckType::Adaptive,
        )
    }

    pub fn cancel_check(&self, id: &CheckId) {
        self.inner.cancel_timer(id);
        let _ = self.inner.checks.cancel_recurring(id);
        let _ = self.inner.checks.cancel_one_time(id);
    }

    pub fn cancel_all_checks_for_session(&self, session_name: &str) {
        for view in self.get_checks_for_session(session_name) {
            self.cancel_check(&view.id);
        }
    }

    fn session_for(&self, target: &MessageTarget) -> String {
        self.inner
            .resolve(target)
            .map(|(name, _)| name)
            .unwrap_or_else(|| "(unresolved)".to_string())
    }

    pub fn list_scheduled_checks(&self) -> Vec<ScheduledCheckView> {
        let mut views: Vec<ScheduledCheckView> = self
            .inner
            .checks
            .list_recurring()
            .into_iter()
            .map(|c| ScheduledCheckView {
                session_name: self.session_for(&c.target),
                id: c.id,
                name: c.name,
                check_type: c.check_type,
                recurring: true,
                interval_minutes: Some(c.interval_secs / 60),
                fire_at: None,
                current_occurrence: Some(c.current_occurrence),
                max_occurrences: c.max_occurrences,
            })
            .collect();
        views.extend(self.inner.checks.list_one_time().into_iter().map(|c| ScheduledCheckView {
            session_name: self.session_for(&c.target),
            id: c.id,
            name: c.name,
            check_type: c.check_type,
            recurring: false,
            interval_minutes: None,
            fire_at: Some(c.fire_at),
            current_occurrence: None,
            max_occurrences: None,
        }));
        views
    }

    pub fn get_checks_for_session(&self, session_name: &str) -> Vec<ScheduledCheckView> {
        self.list_scheduled_checks()
            .into_iter()
            .filter(|v| v.session_name == session_name)
            .collect()
    }

    pub fn get_stats(&self) -> CheckStats {
        CheckStats {
            recurring_active: self.inner.checks.list_recurring().iter().filter(|c| c.is_active).count(),
            one_time_pending: self.inner.checks.list_one_time().iter().filter(|c| !c.fired).count(),
            active_timers: self.inner.timers.lock().len(),
        }
    }

    /// Cancels every in-flight timer and the stuck-message scanner without
    /// touching persisted state, so a subsequent `start()` (e.g. after a
    /// restart) restores from it.
    pub async fn cleanup(&self) {
        let ids: Vec<String> = self.inner.timers.lock().keys().cloned().collect();
        for id in ids {
            if let Some(handle) = self.inner.timers.lock().remove(&id) {
                handle.abort();
            }
        }
        if let Some(handle) = self.stuck_scanner_task.lock().take() {
            handle.abort();
        }
    }

    /// Deliveries awaiting acknowledgement or rescan.
    pub fn pending_stuck_count(&self) -> usize {
        self.inner.stuck.pending_count()
    }
}

#[cfg(test)]
#[path = "checks_tests.rs"]
mod tests;

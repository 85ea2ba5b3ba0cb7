// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crewly_adapters::FakeSessionAdapter;
use tempfile::TempDir;

fn fast_policy() -> DeliveryPolicy {
    DeliveryPolicy {
        max_attempts: 2,
        retry_delay: Duration::from_millis(50),
        idle_poll_attempts: 2,
        idle_poll_interval: Duration::from_millis(10),
        verify_schedule: [
            Duration::from_millis(1),
            Duration::from_millis(1),
            Duration::from_millis(1),
            Duration::from_millis(1),
        ],
    }
}

struct Fixture {
    _home: TempDir,
    checks: Arc<ChecksStore>,
    store: Arc<DataStore>,
    adapter: FakeSessionAdapter,
    activity: ActivityLog,
}

fn setup() -> Fixture {
    let home = tempfile::tempdir().unwrap();
    let checks = Arc::new(ChecksStore::load(home.path()).unwrap());
    let store = Arc::new(DataStore::load(home.path()).unwrap());
    let adapter = FakeSessionAdapter::new();
    adapter.add_session("alpha-lead");
    adapter.set_idle("alpha-lead", true);
    let activity = ActivityLog::load(home.path(), 100).unwrap();
    Fixture { _home: home, checks, store, adapter, activity }
}

fn scheduler(fx: &Fixture) -> CheckScheduler<FakeSessionAdapter> {
    CheckScheduler::new(
        fx.checks.clone(),
        fx.store.clone(),
        fx.activity.clone(),
        fx.adapter.clone(),
        fast_policy(),
    )
}

fn target() -> MessageTarget {
    MessageTarget::Literal {
        session_name: "alpha-lead".to_string(),
    }
}

async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn one_shot_check_fires_and_clears_persistence() {
    let fx = setup();
    let sched = scheduler(&fx);
    let id = sched.schedule_check(target(), 1, "are you stuck?", CheckType::CheckIn).unwrap();

    tokio::time::advance(Duration::from_secs(90)).await;
    settle().await;

    let recent = fx.activity.recent(10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].success, Some(true));
    assert!(fx.checks.list_one_time().is_empty(), "fired one-shot check is removed");
    assert_eq!(sched.get_stats().active_timers, 0);
    let _ = id;
}

#[tokio::test(start_paused = true)]
async fn recurring_check_stops_after_max_occurrences() {
    let fx = setup();
    let sched = scheduler(&fx);
    sched
        .schedule_recurring_check(target(), 1, "progress?", CheckType::ProgressCheck, Some(2))
        .unwrap();

    tokio::time::advance(Duration::from_secs(70)).await;
    settle().await;
    tokio::time::advance(Duration::from_secs(70)).await;
    settle().await;

    let recent = fx.activity.recent(10).await.unwrap();
    assert_eq!(recent.len(), 2, "fires exactly maxOccurrences times");
    assert!(fx.checks.list_recurring().is_empty(), "cancelled once the cap is reached");
    assert_eq!(sched.get_stats().active_timers, 0);
}

#[tokio::test]
async fn default_checkins_install_one_initial_and_two_recurring() {
    let fx = setup();
    let sched = scheduler(&fx);
    let ids = sched.schedule_default_checkins("alpha-lead").unwrap();

    assert_eq!(ids.len(), 3);
    assert_eq!(fx.checks.list_one_time().len(), 1);
    assert_eq!(fx.checks.list_recurring().len(), 2);
    let stats = sched.get_stats();
    assert_eq!(stats.one_time_pending, 1);
    assert_eq!(stats.recurring_active, 2);
}

struct RecordingHandler {
    events: Mutex<Vec<ContinuationEvent>>,
}

impl ContinuationHandler for RecordingHandler {
    fn notify(&self, event: ContinuationEvent) {
        self.events.lock().push(event);
    }
}

#[tokio::test(start_paused = true)]
async fn continuation_check_without_handler_falls_back_to_a_message() {
    let fx = setup();
    let sched = scheduler(&fx);
    sched
        .schedule_continuation_check("alpha-lead", 1, Some("agent-1".into()), None)
        .unwrap();

    tokio::time::advance(Duration::from_secs(90)).await;
    settle().await;

    let recent = fx.activity.recent(10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].success, Some(true));
}

#[tokio::test(start_paused = true)]
async fn continuation_check_with_handler_dispatches_synthetic_event_instead_of_a_message() {
    let fx = setup();
    let sched = scheduler(&fx);
    let handler = Arc::new(RecordingHandler { events: Mutex::new(Vec::new()) });
    sched.set_continuation_handler(handler.clone());
    sched
        .schedule_continuation_check("alpha-lead", 1, Some("agent-1".into()), Some(PathBuf::from("/proj")))
        .unwrap();

    tokio::time::advance(Duration::from_secs(90)).await;
    settle().await;

    assert!(fx.activity.recent(10).await.unwrap().is_empty(), "no message delivered when a handler is set");
    let events = handler.events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].trigger, "explicit_request");
    assert_eq!(events[0].session, "alpha-lead");
    assert_eq!(events[0].agent_id.as_deref(), Some("agent-1"));
    assert_eq!(events[0].project_path, Some(PathBuf::from("/proj")));
}

struct FixedMonitor(ActivityStatus);

impl ActivityMonitor for FixedMonitor {
    fn status(&self, _session_name: &str) -> ActivityStatus {
        self.0
    }
}

#[tokio::test]
async fn adaptive_checkin_shortens_interval_when_idle() {
    let fx = setup();
    let sched = scheduler(&fx).with_adaptive_config(AdaptiveConfig {
        base_minutes: 20,
        min_minutes: 5,
        max_minutes: 60,
        factor: 2.0,
    });
    sched.set_activity_monitor(Arc::new(FixedMonitor(ActivityStatus::Idle)));
    sched.schedule_adaptive_checkin("alpha-lead", None).unwrap();

    let persisted = fx.checks.list_one_time();
    assert_eq!(persisted.len(), 1);
    let minutes = persisted[0].fire_at.signed_duration_since(chrono::Utc::now()).num_minutes();
    assert!((8..=12).contains(&minutes), "expected ~10 minutes (base/factor), got {minutes}");
}

#[tokio::test]
async fn adaptive_checkin_lengthens_interval_when_busy() {
    let fx = setup();
    let sched = scheduler(&fx).with_adaptive_config(AdaptiveConfig {
        base_minutes: 20,
        min_minutes: 5,
        max_minutes: 60,
        factor: 2.0,
    });
    sched.set_activity_monitor(Arc::new(FixedMonitor(ActivityStatus::InProgress)));
    sched.schedule_adaptive_checkin("alpha-lead", None).unwrap();

    let persisted = fx.checks.list_one_time();
    let minutes = persisted[0].fire_at.signed_duration_since(chrono::Utc::now()).num_minutes();
    assert!((38..=42).contains(&minutes), "expected ~40 minutes (base*factor), got {minutes}");
}

#[tokio::test(start_paused = true)]
async fn cancel_check_prevents_delivery() {
    let fx = setup();
    let sched = scheduler(&fx);
    let id = sched.schedule_check(target(), 1, "never sent", CheckType::CheckIn).unwrap();
    sched.cancel_check(&id);

    tokio::time::advance(Duration::from_secs(90)).await;
    settle().await;

    assert!(fx.activity.recent(10).await.unwrap().is_empty());
    assert!(fx.checks.list_one_time().is_empty());
    assert_eq!(sched.get_stats().active_timers, 0);
}

#[tokio::test]
async fn cancel_all_checks_for_session_removes_every_matching_check() {
    let fx = setup();
    let sched = scheduler(&fx);
    sched.schedule_default_checkins("alpha-lead").unwrap();
    sched
        .schedule_check(
            MessageTarget::Literal { session_name: "other-session".to_string() },
            5,
            "status?",
            CheckType::CheckIn,
        )
        .unwrap();

    sched.cancel_all_checks_for_session("alpha-lead");

    assert!(fx.checks.list_recurring().is_empty());
    assert_eq!(fx.checks.list_one_time().len(), 1, "the other session's check survives");
    assert_eq!(sched.get_checks_for_session("alpha-lead").len(), 0);
}

#[tokio::test]
async fn list_and_get_checks_for_session_reflect_persisted_state() {
    let fx = setup();
    let sched = scheduler(&fx);
    sched.schedule_default_checkins("alpha-lead").unwrap();

    assert_eq!(sched.list_scheduled_checks().len(), 3);
    assert_eq!(sched.get_checks_for_session("alpha-lead").len(), 3);
    assert_eq!(sched.get_checks_for_session("nobody").len(), 0);
}

#[tokio::test(start_paused = true)]
async fn stuck_scanner_recovers_a_check_once_the_session_goes_idle() {
    let fx = setup();
    fx.adapter.set_idle("alpha-lead", false);
    fx.adapter.set_echoes_payload("alpha-lead", false);

    let sched = CheckScheduler::new(
        fx.checks.clone(),
        fx.store.clone(),
        fx.activity.clone(),
        fx.adapter.clone(),
        fast_policy(),
    )
    .with_stuck_scan_period(Duration::from_millis(500));
    sched.start();
    sched.schedule_check(target(), 1, "are you stuck?", CheckType::CheckIn).unwrap();

    tokio::time::advance(Duration::from_secs(90)).await;
    settle().await;
    assert_eq!(sched.pending_stuck_count(), 1, "failed delivery stays tracked as stuck");

    fx.adapter.set_idle("alpha-lead", true);
    fx.adapter.set_echoes_payload("alpha-lead", true);

    tokio::time::advance(Duration::from_millis(600)).await;
    settle().await;

    assert_eq!(sched.pending_stuck_count(), 0, "rescan recovers once the session is idle again");
}

#[tokio::test]
async fn restore_installs_a_timer_for_a_persisted_active_recurring_check() {
    let fx = setup();
    fx.checks
        .upsert_recurring(RecurringCheck {
            id: CheckId::new("restored"),
            name: "progress".into(),
            target: target(),
            prompt: "progress?".into(),
            check_type: CheckType::ProgressCheck,
            interval_secs: 900,
            is_active: true,
            last_run: None,
            current_occurrence: 0,
            max_occurrences: None,
            created_at: chrono::Utc::now(),
        })
        .unwrap();

    let sched = scheduler(&fx);
    sched.start();

    assert_eq!(sched.get_stats().active_timers, 1);
}

#[tokio::test]
async fn restore_discards_a_one_shot_check_whose_fire_time_has_already_passed() {
    let fx = setup();
    fx.checks
        .upsert_one_time(OneTimeCheck {
            id: CheckId::new("stale"),
            name: "stale check".into(),
            target: target(),
            prompt: "status?".into(),
            check_type: CheckType::CheckIn,
            fire_at: chrono::Utc::now() - chrono::Duration::minutes(5),
            fired: false,
            continuation_of: None,
            agent_id: None,
            project_path: None,
            created_at: chrono::Utc::now(),
        })
        .unwrap();

    let sched = scheduler(&fx);
    sched.start();

    assert_eq!(sched.get_stats().active_timers, 0);
    assert!(fx.checks.list_one_time().is_empty(), "stale check is discarded, not fired");
}

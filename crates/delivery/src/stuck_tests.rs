// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crewly_adapters::FakeSessionAdapter;
use crewly_core::RuntimeType;

fn fast_schedule() -> Vec<Duration> {
    vec![Duration::from_millis(1); 2]
}

#[test]
fn tracked_delivery_appears_as_pending() {
    let scanner = StuckScanner::new();
    scanner.track("m1", "alpha", "hello", RuntimeType::ClaudeCode, 1000);

    let pending = scanner.get("m1").unwrap();
    assert_eq!(pending.attempts, 1);
    assert_eq!(pending.session_name, "alpha");
}

#[test]
fn retracking_the_same_id_increments_attempts() {
    let scanner = StuckScanner::new();
    scanner.track("m1", "alpha", "hello", RuntimeType::ClaudeCode, 1000);
    scanner.track("m1", "alpha", "hello", RuntimeType::ClaudeCode, 2000);

    let pending = scanner.get("m1").unwrap();
    assert_eq!(pending.attempts, 2);
    assert_eq!(pending.last_attempt_epoch_ms, 2000);
}

#[test]
fn acknowledge_removes_from_pending() {
    let scanner = StuckScanner::new();
    scanner.track("m1", "alpha", "hello", RuntimeType::ClaudeCode, 1000);
    scanner.acknowledge("m1");

    assert!(scanner.get("m1").is_none());
    assert_eq!(scanner.pending_count(), 0);
}

#[test]
fn acknowledged_id_is_not_retracked() {
    let scanner = StuckScanner::new();
    scanner.track("m1", "alpha", "hello", RuntimeType::ClaudeCode, 1000);
    scanner.acknowledge("m1");

    // A late retry signal for the same id/payload shouldn't resurrect it.
    scanner.track("m1", "alpha", "hello", RuntimeType::ClaudeCode, 1500);
    assert!(scanner.get("m1").is_none());
}

#[test]
fn different_payload_for_same_id_is_tracked_again() {
    let scanner = StuckScanner::new();
    scanner.track("m1", "alpha", "hello", RuntimeType::ClaudeCode, 1000);
    scanner.acknowledge("m1");

    scanner.track("m1", "alpha", "a different message", RuntimeType::ClaudeCode, 1500);
    assert!(scanner.get("m1").is_some());
}

#[test]
fn stale_returns_only_entries_past_threshold_oldest_first() {
    let scanner = StuckScanner::new();
    scanner.track("fresh", "alpha", "a", RuntimeType::ClaudeCode, 9000);
    scanner.track("old", "alpha", "b", RuntimeType::ClaudeCode, 1000);

    let stale = scanner.stale(10_000, 2000);
    assert_eq!(stale, vec!["old".to_string()]);
}

#[test]
fn acknowledged_history_is_bounded() {
    let scanner = StuckScanner::new();
    for i in 0..(MAX_ACKNOWLEDGED_HISTORY + 10) {
        let id = format!("m{i}");
        scanner.track(&id, "alpha", "payload", RuntimeType::ClaudeCode, 0);
        scanner.acknowledge(&id);
    }

    assert_eq!(scanner.state.lock().acknowledged.len(), MAX_ACKNOWLEDGED_HISTORY);
}

#[tokio::test]
async fn rescan_recovers_a_stale_delivery_once_session_is_idle_again() {
    let scanner = StuckScanner::new();
    let adapter = FakeSessionAdapter::new();
    adapter.add_session("alpha");
    adapter.set_idle("alpha", true);

    scanner.track("m1", "alpha", "hi there", RuntimeType::ClaudeCode, 0);

    let recovered = scanner.rescan_once(&adapter, 60_000, 5_000, &fast_schedule()).await;

    assert_eq!(recovered, vec!["m1".to_string()]);
    assert!(scanner.get("m1").is_none());
}

#[tokio::test]
async fn rescan_leaves_a_busy_session_pending() {
    let scanner = StuckScanner::new();
    let adapter = FakeSessionAdapter::new();
    adapter.add_session("alpha");
    adapter.set_idle("alpha", false);

    scanner.track("m1", "alpha", "hi there", RuntimeType::ClaudeCode, 0);

    let recovered = scanner.rescan_once(&adapter, 60_000, 5_000, &fast_schedule()).await;

    assert!(recovered.is_empty());
    assert!(scanner.get("m1").is_some());
}

#[tokio::test]
async fn rescan_ignores_entries_not_yet_stale() {
    let scanner = StuckScanner::new();
    let adapter = FakeSessionAdapter::new();
    adapter.add_session("alpha");
    adapter.set_idle("alpha", true);

    scanner.track("m1", "alpha", "hi there", RuntimeType::ClaudeCode, 59_000);

    let recovered = scanner.rescan_once(&adapter, 60_000, 5_000, &fast_schedule()).await;

    assert!(recovered.is_empty());
    assert!(scanner.get("m1").is_some());
}

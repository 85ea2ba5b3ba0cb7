// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::model::MessageTarget;
use tempfile::tempdir;

fn recurring(id: &str) -> RecurringCheck {
    RecurringCheck {
        id: CheckId::new(id),
        name: "health check".into(),
        target: MessageTarget::Orchestrator,
        prompt: "are you stuck?".into(),
        check_type: CheckType::ProgressCheck,
        interval_secs: 900,
        is_active: true,
        last_run: None,
        current_occurrence: 0,
        max_occurrences: None,
        created_at: chrono::Utc::now(),
    }
}

fn one_time(id: &str) -> OneTimeCheck {
    OneTimeCheck {
        id: CheckId::new(id),
        name: "follow up".into(),
        target: MessageTarget::Orchestrator,
        prompt: "status?".into(),
        check_type: CheckType::CheckIn,
        fire_at: chrono::Utc::now(),
        fired: false,
        continuation_of: None,
        agent_id: None,
        project_path: None,
        created_at: chrono::Utc::now(),
    }
}

#[test]
fn recurring_checks_round_trip_through_reload() {
    let dir = tempdir().unwrap();
    let store = ChecksStore::load(dir.path()).unwrap();
    store.upsert_recurring(recurring("c1")).unwrap();

    let reloaded = ChecksStore::load(dir.path()).unwrap();
    assert_eq!(reloaded.list_recurring().len(), 1);
}

#[test]
fn cancel_recurring_removes_entry() {
    let dir = tempdir().unwrap();
    let store = ChecksStore::load(dir.path()).unwrap();
    store.upsert_recurring(recurring("c1")).unwrap();

    store.cancel_recurring(&CheckId::new("c1")).unwrap();
    assert!(store.list_recurring().is_empty());
}

#[test]
fn cancel_unknown_recurring_check_errors() {
    let dir = tempdir().unwrap();
    let store = ChecksStore::load(dir.path()).unwrap();
    let err = store.cancel_recurring(&CheckId::new("ghost")).unwrap_err();
    assert!(matches!(err, ChecksError::NotFound(_)));
}

#[test]
fn one_time_checks_are_independent_of_recurring_checks() {
    let dir = tempdir().unwrap();
    let store = ChecksStore::load(dir.path()).unwrap();
    store.upsert_recurring(recurring("c1")).unwrap();
    store.upsert_one_time(one_time("o1")).unwrap();

    assert_eq!(store.list_recurring().len(), 1);
    assert_eq!(store.list_one_time().len(), 1);
}

#[test]
fn upsert_one_time_replaces_by_id() {
    let dir = tempdir().unwrap();
    let store = ChecksStore::load(dir.path()).unwrap();
    store.upsert_one_time(one_time("o1")).unwrap();

    let mut fired = one_time("o1");
    fired.fired = true;
    store.upsert_one_time(fired).unwrap();

    let list = store.list_one_time();
    assert_eq!(list.len(), 1);
    assert!(list[0].fired);
}

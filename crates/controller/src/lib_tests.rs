// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crewly_adapters::FakeSessionAdapter;
use crewly_core::{RuntimeType, SequentialIdGen};
use crewly_delivery::DeliveryPolicy;
use crewly_engine::CheckType;
use crewly_storage::{Member, MemberId, Project, ProjectId, Role, Team, TeamId, TrackingIndex};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    _project_dir: TempDir,
    _home_dir: TempDir,
    project_path: PathBuf,
    controller: Controller<SequentialIdGen, FakeSessionAdapter>,
}

fn fast_policy() -> DeliveryPolicy {
    DeliveryPolicy {
        max_attempts: 2,
        retry_delay: Duration::from_millis(10),
        idle_poll_attempts: 2,
        idle_poll_interval: Duration::from_millis(5),
        verify_schedule: [
            Duration::from_millis(1),
            Duration::from_millis(1),
            Duration::from_millis(1),
            Duration::from_millis(1),
        ],
    }
}

fn setup() -> Fixture {
    let project_dir = tempfile::tempdir().unwrap();
    let home_dir = tempfile::tempdir().unwrap();
    let project_path = project_dir.path().join("gas-vibe-coder");
    let milestone = project_path.join(".crewly/tasks/m0");
    for status in ["open", "in_progress", "done", "blocked"] {
        fs::create_dir_all(milestone.join(status)).unwrap();
    }

    let store = Arc::new(DataStore::load(home_dir.path()).unwrap());
    store
        .upsert_project(Project {
            id: ProjectId::new("proj-1"),
            name: "gas-vibe-coder".into(),
            path: project_path.clone(),
        })
        .unwrap();
    store
        .upsert_team(Team {
            id: TeamId::new("team-1"),
            name: "Alpha".into(),
            project_id: Some(ProjectId::new("proj-1")),
            members: vec![Member {
                id: MemberId::new("member-1"),
                session_name: "alpha-lead".into(),
                role: Role::Orchestrator,
                runtime_type: RuntimeType::ClaudeCode,
            }],
        })
        .unwrap();

    let tracking = Arc::new(TrackingIndex::load(home_dir.path()).unwrap());
    let activity = crewly_storage::ActivityLog::load(home_dir.path(), 1000).unwrap();
    let lifecycle = Arc::new(TaskLifecycle::new(
        store.clone(),
        tracking,
        activity.clone(),
        SequentialIdGen::new("task"),
    ));

    let adapter = FakeSessionAdapter::new();
    adapter.add_session("alpha-lead");
    adapter.set_idle("alpha-lead", true);

    let messages = Arc::new(MessageScheduler::new(
        store.clone(),
        activity.clone(),
        adapter.clone(),
        fast_policy(),
        Duration::from_millis(1),
    ));
    let checks_store = Arc::new(crewly_storage::ChecksStore::load(home_dir.path()).unwrap());
    let checks = Arc::new(CheckScheduler::new(checks_store, store.clone(), activity, adapter, fast_policy()));

    let controller = Controller::new(store, lifecycle, messages, checks);

    Fixture {
        _project_dir: project_dir,
        _home_dir: home_dir,
        project_path,
        controller,
    }
}

fn write_task(fx: &Fixture, status: &str, name: &str, body: &str) -> PathBuf {
    let path = fx.project_path.join(".crewly/tasks/m0").join(status).join(name);
    fs::write(&path, body).unwrap();
    path
}

#[tokio::test]
async fn assign_task_rejects_empty_session_name_as_a_validation_error() {
    let fx = setup();
    let task = write_task(&fx, "open", "01.md", "# Ship it\n");

    let err = fx.controller.assign_task(&task, "").await.unwrap_err();
    assert_eq!(err.status_class(), 400);
}

#[tokio::test]
async fn assign_task_succeeds_and_returns_the_outcome_as_data() {
    let fx = setup();
    let task = write_task(&fx, "open", "01.md", "# Ship it\n");

    let response = fx.controller.assign_task(&task, "alpha-lead").await.unwrap();
    assert!(response.success);
    assert!(response.data.is_some());
}

#[tokio::test]
async fn assign_task_in_wrong_folder_is_a_graceful_failure_not_an_error() {
    let fx = setup();
    let task = write_task(&fx, "in_progress", "01.md", "# Ship it\n");

    let response = fx.controller.assign_task(&task, "alpha-lead").await.unwrap();
    assert!(!response.success);
    assert!(response.suggestion.as_ref().unwrap().contains("in_progress"));
}

#[tokio::test]
async fn complete_task_without_schema_reports_success() {
    let fx = setup();
    let task = write_task(&fx, "open", "01.md", "# Ship it\n");
    fx.controller.assign_task(&task, "alpha-lead").await.unwrap();
    let in_progress = fx.project_path.join(".crewly/tasks/m0/in_progress/01.md");

    let response = fx.controller.complete_task(&in_progress, "alpha-lead", None).await.unwrap();
    assert!(response.success);
}

#[tokio::test]
async fn complete_task_requiring_schema_without_output_is_a_graceful_failure() {
    let fx = setup();
    let body = "# Ship it\n\n## Output Schema\n```json\n{\"type\":\"object\"}\n```\n";
    let task = write_task(&fx, "open", "01.md", body);
    fx.controller.assign_task(&task, "alpha-lead").await.unwrap();
    let in_progress = fx.project_path.join(".crewly/tasks/m0/in_progress/01.md");

    let response = fx.controller.complete_task(&in_progress, "alpha-lead", None).await.unwrap();
    assert!(!response.success);
    assert!(response.suggestion.is_some());
}

#[tokio::test]
async fn block_and_unblock_round_trip() {
    let fx = setup();
    let task = write_task(&fx, "open", "01.md", "# Ship it\n");
    fx.controller.assign_task(&task, "alpha-lead").await.unwrap();
    let in_progress = fx.project_path.join(".crewly/tasks/m0/in_progress/01.md");

    let response = fx.controller.block_task(&in_progress, Some("waiting on design".into())).await.unwrap();
    assert!(response.success);
    let blocked = fx.project_path.join(".crewly/tasks/m0/blocked/01.md");
    assert!(blocked.exists());

    let response = fx.controller.unblock_task(&blocked, None).await.unwrap();
    assert!(response.success);
    assert!(fx.project_path.join(".crewly/tasks/m0/open/01.md").exists());
}

#[tokio::test]
async fn take_next_task_reports_none_when_open_is_empty() {
    let fx = setup();
    let response = fx.controller.take_next_task(&fx.project_path, None);
    assert!(!response.success);
}

#[tokio::test]
async fn take_next_task_returns_the_lexicographically_first_open_task() {
    let fx = setup();
    write_task(&fx, "open", "02.md", "# second\n");
    write_task(&fx, "open", "01.md", "# first\n");

    let response = fx.controller.take_next_task(&fx.project_path, None);
    assert!(response.success);
}

#[tokio::test]
async fn sync_task_status_and_team_progress_count_every_folder() {
    let fx = setup();
    write_task(&fx, "open", "01.md", "# a\n");
    write_task(&fx, "done", "02.md", "# b\n");

    let response = fx.controller.sync_task_status(&fx.project_path, None);
    assert!(response.success);
    let response = fx.controller.get_team_progress(&fx.project_path);
    assert!(response.success);
}

#[tokio::test]
async fn create_task_rejects_a_missing_title() {
    let fx = setup();
    let err = fx
        .controller
        .create_task(&fx.project_path, "m0", "03.md", "", "worker", 5, None, false)
        .unwrap_err();
    assert_eq!(err.status_class(), 400);
}

#[tokio::test]
async fn create_task_then_get_task_output_round_trips() {
    let fx = setup();
    let response = fx
        .controller
        .create_task(&fx.project_path, "m0", "03.md", "Write docs", "worker", 5, None, true)
        .unwrap();
    assert!(response.success);

    let task = fx.project_path.join(".crewly/tasks/m0/in_progress/03.md");
    let response = fx.controller.complete_task(&task, "alpha-lead", None).await.unwrap();
    assert!(response.success);

    let done = fx.project_path.join(".crewly/tasks/m0/done/03.md");
    let response = fx.controller.get_task_output(&done).unwrap();
    assert!(!response.success, "no schema was attached, so there's no output.json");
}

#[tokio::test]
async fn recover_abandoned_tasks_reports_zero_when_nothing_is_tracked() {
    let fx = setup();
    let response = fx.controller.recover_abandoned_tasks(&[], 1800).await;
    assert!(response.success);
}

#[tokio::test]
async fn schedule_and_cancel_message_round_trip() {
    let fx = setup();
    let message = ScheduledMessage {
        id: crewly_storage::ScheduledMessageId::new("msg-1"),
        name: "nudge".into(),
        target: MessageTarget::Orchestrator,
        target_project: None,
        message: "status please".into(),
        delay_amount: 30,
        delay_unit: crewly_storage::DelayUnit::Seconds,
        is_recurring: false,
        is_active: true,
        last_run: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };
    let id = message.id.clone();
    let response = fx.controller.schedule_message(message).unwrap();
    assert!(response.success);

    let response = fx.controller.cancel_message(&id);
    assert!(response.success);
}

#[tokio::test]
async fn schedule_and_cancel_check_round_trip() {
    let fx = setup();
    let target = MessageTarget::Literal { session_name: "alpha-lead".into() };
    let response = fx
        .controller
        .schedule_check(target, 5, "how's it going?", CheckType::CheckIn)
        .unwrap();
    assert!(response.success);

    let id: crewly_storage::CheckId =
        serde_json::from_value(response.data.clone().unwrap()).unwrap();
    let response = fx.controller.cancel_check(&id);
    assert!(response.success);
}

#[tokio::test]
async fn reschedule_all_messages_is_a_no_op_with_nothing_persisted() {
    let fx = setup();
    let response = fx.controller.reschedule_all_messages();
    assert!(response.success);
}

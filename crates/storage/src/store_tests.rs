// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::model::{Member, MemberId, ProjectId, Role, Team, TeamId};
use tempfile::tempdir;

fn orchestrator_team() -> Team {
    Team {
        id: TeamId::new("team-1"),
        name: "Alpha".into(),
        project_id: None,
        members: vec![Member {
            id: MemberId::new("member-1"),
            session_name: "alpha-lead".into(),
            role: Role::Orchestrator,
            runtime_type: crewly_core::RuntimeType::ClaudeCode,
        }],
    }
}

#[test]
fn loads_empty_document_when_file_is_absent() {
    let dir = tempdir().unwrap();
    let store = DataStore::load(dir.path()).unwrap();
    assert!(store.with_data(|d| d.teams.is_empty()));
}

#[test]
fn upsert_team_persists_across_reload() {
    let dir = tempdir().unwrap();
    let store = DataStore::load(dir.path()).unwrap();
    store.upsert_team(orchestrator_team()).unwrap();

    let reloaded = DataStore::load(dir.path()).unwrap();
    assert_eq!(reloaded.with_data(|d| d.teams.len()), 1);
}

#[test]
fn team_without_orchestrator_is_rejected() {
    let dir = tempdir().unwrap();
    let store = DataStore::load(dir.path()).unwrap();

    let mut team = orchestrator_team();
    team.members[0].role = Role::Worker;

    let err = store.upsert_team(team).unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));
}

#[test]
fn rejected_mutation_does_not_change_in_memory_state() {
    let dir = tempdir().unwrap();
    let store = DataStore::load(dir.path()).unwrap();
    store.upsert_team(orchestrator_team()).unwrap();

    let mut broken = orchestrator_team();
    broken.members[0].role = Role::Worker;
    let _ = store.upsert_team(broken);

    assert_eq!(store.with_data(|d| d.teams.len()), 1);
    assert_eq!(store.with_data(|d| d.teams[0].members[0].role), Role::Orchestrator);
}

#[test]
fn assignment_referencing_unknown_team_is_rejected() {
    let dir = tempdir().unwrap();
    let store = DataStore::load(dir.path()).unwrap();

    let err = store
        .upsert_assignment(Assignment {
            session_name: "ghost".into(),
            team_id: TeamId::new("no-such-team"),
            member_id: MemberId::new("no-such-member"),
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));
}

#[test]
fn find_member_by_session_name_scans_all_teams() {
    let dir = tempdir().unwrap();
    let store = DataStore::load(dir.path()).unwrap();
    store.upsert_team(orchestrator_team()).unwrap();

    let (team, member) = store.find_member_by_session_name("alpha-lead").unwrap();
    assert_eq!(team.id, TeamId::new("team-1"));
    assert_eq!(member.id, MemberId::new("member-1"));
    assert!(store.find_member_by_session_name("missing").is_none());
}

#[test]
fn removing_only_orchestrator_is_rejected() {
    let dir = tempdir().unwrap();
    let store = DataStore::load(dir.path()).unwrap();
    let team = orchestrator_team();
    let team_id = team.id.clone();
    let member_id = team.members[0].id.clone();
    store.upsert_team(team).unwrap();

    let err = store.remove_member(&team_id, &member_id).unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));
}

#[test]
fn corrupt_data_file_fails_to_load() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("data.json"), b"{not json").unwrap();

    let err = DataStore::load(dir.path()).unwrap_err();
    assert!(matches!(err, StoreError::CorruptStore(_)));
}

#[test]
fn second_save_writes_backup_sibling_of_previous_content() {
    let dir = tempdir().unwrap();
    let backup_path = dir.path().join("data.json.backup");
    let store = DataStore::load(dir.path()).unwrap();

    store.upsert_team(orchestrator_team()).unwrap();
    assert!(!backup_path.exists(), "nothing to back up on the first save");

    store
        .upsert_project(Project {
            id: ProjectId::new("proj-1"),
            name: "Widgets".into(),
            path: dir.path().to_path_buf(),
        })
        .unwrap();

    assert!(backup_path.exists());
    let backed_up: Data = serde_json::from_str(&std::fs::read_to_string(&backup_path).unwrap()).unwrap();
    assert_eq!(backed_up.teams.len(), 1);
    assert!(backed_up.projects.is_empty());
}

#[test]
fn backup_on_save_false_skips_backup_sibling() {
    let dir = tempdir().unwrap();
    let backup_path = dir.path().join("data.json.backup");
    let store = DataStore::load(dir.path()).unwrap();

    store
        .mutate(|data| {
            data.settings.backup_on_save = false;
            Ok(())
        })
        .unwrap();
    store.upsert_team(orchestrator_team()).unwrap();

    assert!(!backup_path.exists());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parses the `--target` flag shared by `message schedule` and `check
//! schedule`/`check schedule-recurring` into a [`MessageTarget`]:
//! `orchestrator`, `team:<teamId>`, or `session:<name>`.

use crewly_storage::{MessageTarget, TeamId};

pub fn parse_target(raw: &str) -> Result<MessageTarget, String> {
    if raw == "orchestrator" {
        return Ok(MessageTarget::Orchestrator);
    }
    if let Some(team_id) = raw.strip_prefix("team:") {
        if team_id.is_empty() {
            return Err("team: target requires a team id, e.g. team:alpha".to_string());
        }
        return Ok(MessageTarget::Team { team_id: TeamId::new(team_id) });
    }
    if let Some(session_name) = raw.strip_prefix("session:") {
        if session_name.is_empty() {
            return Err("session: target requires a session name, e.g. session:alpha-lead".to_string());
        }
        return Ok(MessageTarget::Literal { session_name: session_name.to_string() });
    }
    Err(format!(
        "unrecognized target \"{raw}\" — use \"orchestrator\", \"team:<id>\", or \"session:<name>\""
    ))
}

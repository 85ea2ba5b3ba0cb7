// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared `MessageTarget` → `(sessionName, runtimeType)` resolution, used by
//! both the message scheduler and the check scheduler so a team target
//! always routes to that team's orchestrator member the same way in both
//! places.

use crewly_core::RuntimeType;
use crewly_storage::{DataStore, MessageTarget, Role};

/// Resolves `target` against the current store contents. Returns `None` when
/// the target cannot be resolved to a concrete session (unknown team, team
/// with no orchestrator — which `DataStore` validation should already
/// prevent, but the caller still has to handle the theoretical gap).
pub(crate) fn resolve_target(
    store: &DataStore,
    target: &MessageTarget,
) -> Option<(String, RuntimeType)> {
    match target {
        MessageTarget::Orchestrator => {
            let runtime = store
                .find_member_by_session_name(crate::scheduler::ORCHESTRATOR_SESSION_NAME)
                .map(|(_, member)| member.runtime_type)
                .unwrap_or(RuntimeType::DEFAULT);
            Some((crate::scheduler::ORCHESTRATOR_SESSION_NAME.to_string(), runtime))
        }
        MessageTarget::Team { team_id } => store.with_data(|data| {
            let team = data.teams.iter().find(|t| &t.id == team_id)?;
            let orchestrator = team
                .members
                .iter()
                .find(|m| matches!(m.role, Role::Orchestrator))?;
            Some((orchestrator.session_name.clone(), orchestrator.runtime_type))
        }),
        MessageTarget::Literal { session_name } => {
            let runtime = store
                .find_member_by_session_name(session_name)
                .map(|(_, member)| member.runtime_type)
                .unwrap_or(RuntimeType::DEFAULT);
            Some((session_name.clone(), runtime))
        }
    }
}

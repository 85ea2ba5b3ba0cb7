// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The controller surface (component H): thin, transport-neutral handlers
//! validating input and delegating to the task lifecycle engine (E), the
//! message scheduler (F), and the check scheduler (G). No handler holds
//! business logic of its own — every decision it makes is "is this request
//! well-formed" or "how do I fold that engine result into a `{success, …}`
//! envelope".
//!
//! A function-and-context design rather than a class capturing `this`:
//! [`Controller`] is a plain struct of shared handles, and every operation
//! is a method that borrows it rather than a closure capturing mutable
//! state.

mod error;
mod response;

pub use error::ControllerError;
pub use response::Response;

use chrono::Utc;
use crewly_adapters::SessionAdapter;
use crewly_core::IdGen;
use crewly_engine::{
    CheckScheduler, CheckType, LifecycleError, MessageScheduler, TaskLifecycle,
};
use crewly_storage::{DataStore, MessageTarget, ScheduledMessage, ScheduledMessageId};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

fn require(condition: bool, field: &str) -> Result<(), ControllerError> {
    if condition {
        Ok(())
    } else {
        Err(ControllerError::Validation(format!("missing required field: {field}")))
    }
}

/// Folds a [`LifecycleError`] into the response it deserves: wrong-folder
/// and missing-file outcomes are non-transitional failures surfaced as
/// `success: false` with a `suggestion`, not propagated as request-boundary
/// errors.
fn lifecycle_outcome(err: LifecycleError) -> Result<Response, ControllerError> {
    match err {
        LifecycleError::Conflict { current_folder, expected_folder } => Ok(Response::failed(
            format!("task is in /{current_folder}/, not /{expected_folder}/ — move it there first or re-check its path"),
        )),
        LifecycleError::TaskNotFound(path) => Ok(Response::failed(format!(
            "no task file at {} — it may have already moved; re-run takeNextTask",
            path.display()
        ))),
        LifecycleError::UnknownProject(segment) => Ok(Response::failed(format!(
            "no project registered for path segment \"{segment}\" — register the project before assigning its tasks"
        ))),
        LifecycleError::UnknownSession(session) => Ok(Response::failed(format!(
            "no fleet member with session name \"{session}\" — add it to a team before assigning"
        ))),
        LifecycleError::MalformedTaskPath(path) => Ok(Response::failed(format!(
            "task path {} is too shallow to resolve a milestone folder",
            path.display()
        ))),
        other => Err(ControllerError::Lifecycle(other)),
    }
}

/// Shared handles the controller surface delegates to. Construct one per
/// daemon instance and share it across every transport.
pub struct Controller<G: IdGen, A: SessionAdapter> {
    pub store: Arc<DataStore>,
    pub lifecycle: Arc<TaskLifecycle<G>>,
    pub messages: Arc<MessageScheduler<A>>,
    pub checks: Arc<CheckScheduler<A>>,
}

impl<G: IdGen, A: SessionAdapter> Controller<G, A> {
    pub fn new(
        store: Arc<DataStore>,
        lifecycle: Arc<TaskLifecycle<G>>,
        messages: Arc<MessageScheduler<A>>,
        checks: Arc<CheckScheduler<A>>,
    ) -> Self {
        Self { store, lifecycle, messages, checks }
    }

    /// Starts both schedulers, restoring timers for every persisted active
    /// message and check.
    pub fn start(&self) {
        self.messages.start();
        self.checks.start();
    }

    /// Cancels every in-flight timer on both schedulers without touching
    /// persisted state.
    pub async fn cleanup(&self) {
        self.messages.cleanup().await;
        self.checks.cleanup().await;
    }

    // ---- task lifecycle --------------------------------------------------

    pub async fn assign_task(&self, task_path: &Path, session_name: &str) -> Result<Response, ControllerError> {
        require(!session_name.is_empty(), "sessionName")?;
        match self.lifecycle.assign_task(task_path, session_name, Utc::now()).await {
            Ok(outcome) => Ok(Response::ok(outcome)),
            Err(e) => lifecycle_outcome(e),
        }
    }

    pub async fn complete_task(
        &self,
        task_path: &Path,
        session_name: &str,
        output: Option<Value>,
    ) -> Result<Response, ControllerError> {
        require(!session_name.is_empty(), "sessionName")?;
        match self.lifecycle.complete_task(task_path, session_name, output, Utc::now()).await {
            Ok(outcome @ crewly_engine::CompleteOutcome::Completed { .. }) => Ok(Response::ok(outcome)),
            // Reported under `suggestion`, matching every other non-transitional
            // failure `Response` emits, even though boundary scenarios frame it
            // as an `error` string.
            Ok(outcome @ crewly_engine::CompleteOutcome::MissingOutput) => {
                Ok(Response::failed("Task requires structured output but none was provided").tagged(outcome))
            }
            Ok(outcome @ crewly_engine::CompleteOutcome::RetryRecorded { retry_count, max_retries }) => Ok(Response::failed(format!(
                "output failed validation; retry {retry_count}/{max_retries} recorded, task remains in /in_progress/"
            )).tagged(outcome)),
            Ok(outcome @ crewly_engine::CompleteOutcome::Blocked { .. }) => Ok(Response::failed(
                "output failed validation past the retry ceiling; task moved to /blocked/ — call unblockTask once the schema mismatch is fixed",
            ).tagged(outcome)),
            Err(e) => lifecycle_outcome(e),
        }
    }

    pub async fn block_task(&self, task_path: &Path, block_reason: Option<String>) -> Result<Response, ControllerError> {
        match self.lifecycle.block_task(task_path, block_reason, Utc::now()).await {
            Ok(()) => Ok(Response::ok_empty()),
            Err(e) => lifecycle_outcome(e),
        }
    }

    pub async fn unblock_task(&self, task_path: &Path, unblock_note: Option<String>) -> Result<Response, ControllerError> {
        match self.lifecycle.unblock_task(task_path, unblock_note, Utc::now()).await {
            Ok(()) => Ok(Response::ok_empty()),
            Err(e) => lifecycle_outcome(e),
        }
    }

    pub fn take_next_task(&self, project_path: &Path, task_group: Option<&str>) -> Response {
        match crewly_engine::take_next_task(project_path, task_group) {
            Some(path) => Response::ok(path),
            None => Response::failed("no /open/ tasks remain for this project/milestone"),
        }
    }

    pub fn sync_task_status(&self, project_path: &Path, task_group: Option<&str>) -> Response {
        Response::ok(crewly_engine::sync_task_status(project_path, task_group))
    }

    pub fn get_team_progress(&self, project_path: &Path) -> Response {
        Response::ok(crewly_engine::get_team_progress(project_path))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_task(
        &self,
        project_path: &Path,
        milestone: &str,
        file_name: &str,
        title: &str,
        target_role: &str,
        estimated_delay_minutes: u64,
        output_schema: Option<&Value>,
        start_in_progress: bool,
    ) -> Result<Response, ControllerError> {
        require(!title.is_empty(), "task")?;
        require(!target_role.is_empty(), "targetRole")?;
        match crewly_engine::create_task(
            project_path,
            milestone,
            file_name,
            title,
            target_role,
            estimated_delay_minutes,
            output_schema,
            start_in_progress,
        ) {
            Ok(path) => Ok(Response::ok(path)),
            Err(e) => lifecycle_outcome(e),
        }
    }

    pub fn get_task_output(&self, task_path: &Path) -> Result<Response, ControllerError> {
        match crewly_engine::get_task_output(task_path) {
            Ok(output) => Ok(Response::ok(output)),
            Err(LifecycleError::TaskNotFound(path)) => Ok(Response::failed(format!(
                "no output recorded for this task yet ({})",
                path.display()
            ))),
            Err(e) => Err(ControllerError::Lifecycle(e)),
        }
    }

    pub async fn recover_abandoned_tasks(&self, active_sessions: &[String], abandon_threshold_secs: u64) -> Response {
        let report = self.lifecycle.recover_abandoned(active_sessions, abandon_threshold_secs, Utc::now()).await;
        Response::ok(report)
    }

    // ---- message scheduler ------------------------------------------------

    pub fn schedule_message(&self, message: ScheduledMessage) -> Result<Response, ControllerError> {
        self.messages.schedule_message(message)?;
        Ok(Response::ok_empty())
    }

    pub fn cancel_message(&self, id: &ScheduledMessageId) -> Response {
        self.messages.cancel_message(id);
        Response::ok_empty()
    }

    /// Re-installs timers for every active persisted message from scratch —
    /// the same reload `start()` performs, exposed as an explicit operation
    /// a transport can invoke without a process restart.
    pub fn reschedule_all_messages(&self) -> Response {
        for message in self.store.list_scheduled_messages() {
            self.messages.cancel_message(&message.id);
        }
        self.messages.start();
        Response::ok_empty()
    }

    // ---- check scheduler ---------------------------------------------------

    pub fn schedule_check(
        &self,
        session: MessageTarget,
        minutes: u64,
        prompt: &str,
        check_type: CheckType,
    ) -> Result<Response, ControllerError> {
        let id = self.checks.schedule_check(session, minutes, prompt, check_type)?;
        Ok(Response::ok(id))
    }

    pub fn schedule_recurring_check(
        &self,
        session: MessageTarget,
        interval_minutes: u64,
        prompt: &str,
        check_type: CheckType,
        max_occurrences: Option<u32>,
    ) -> Result<Response, ControllerError> {
        let id = self.checks.schedule_recurring_check(session, interval_minutes, prompt, check_type, max_occurrences)?;
        Ok(Response::ok(id))
    }

    pub fn cancel_check(&self, id: &crewly_storage::CheckId) -> Response {
        self.checks.cancel_check(id);
        Response::ok_empty()
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task Lifecycle Engine (component E): the folder state machine, heartbeat
//! driven abandonment recovery, and the read-only helpers the controller
//! surface exposes around it.

use crate::error::LifecycleError;
use crate::paths::{in_status, project_segment_from_task_path, status_folder};
use crate::task::{
    append_section, extract_retry_info, extract_schema, render_retry_section,
    render_schema_section, replace_or_append_section, strip_section, RetryInfo, TaskParseError,
    RETRY_HEADER,
};
use chrono::{DateTime, Utc};
use crewly_core::IdGen;
use crewly_storage::{ActivityEntry, ActivityLog, DataStore, InProgressTaskEntry, TrackingIndex};
use crewly_validator::{validate_against_schema, validate_size, DEFAULT_MAX_BYTES};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default retry ceiling for a schema-bearing task with no explicit
/// `maxRetries` recorded yet.
const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignOutcome {
    pub task_id: String,
    pub team_id: crewly_storage::TeamId,
    pub member_id: crewly_storage::MemberId,
    pub task_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CompleteOutcome {
    Completed { output_written: bool },
    MissingOutput,
    RetryRecorded { retry_count: u32, max_retries: u32 },
    Blocked { max_retries_exceeded: bool },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReport {
    pub recovered: u32,
    pub skipped: u32,
    pub errors: Vec<String>,
}

fn output_sibling_path(task_path: &Path) -> PathBuf {
    let stem = task_path.file_stem().and_then(|s| s.to_str()).unwrap_or("task");
    task_path.with_file_name(format!("{stem}.output.json"))
}

fn require_folder(task_path: &Path, expected: &str) -> Result<(), LifecycleError> {
    let current = status_folder(task_path).unwrap_or_default().to_string();
    if current != expected {
        return Err(LifecycleError::Conflict {
            current_folder: current,
            expected_folder: expected.to_string(),
        });
    }
    Ok(())
}

fn require_exists(task_path: &Path) -> Result<(), LifecycleError> {
    if !task_path.exists() {
        return Err(LifecycleError::TaskNotFound(task_path.to_path_buf()));
    }
    Ok(())
}

/// Owns the parts of the task board whose lifecycle moves through the folder
/// state machine: assignment, completion, blocking, unblocking, and
/// heartbeat-driven recovery.
pub struct TaskLifecycle<G: IdGen> {
    store: Arc<DataStore>,
    tracking: Arc<TrackingIndex>,
    activity: ActivityLog,
    id_gen: G,
}

impl<G: IdGen> TaskLifecycle<G> {
    pub fn new(
        store: Arc<DataStore>,
        tracking: Arc<TrackingIndex>,
        activity: ActivityLog,
        id_gen: G,
    ) -> Self {
        Self {
            store,
            tracking,
            activity,
            id_gen,
        }
    }

    fn find_tracking_by_path(&self, task_path: &Path) -> Option<InProgressTaskEntry> {
        self.tracking
            .list()
            .into_iter()
            .find(|e| e.task_path == task_path)
    }

    async fn move_task(
        &self,
        task_path: &Path,
        updated_content: &str,
        target_status: &str,
    ) -> Result<PathBuf, LifecycleError> {
        let target_path = in_status(task_path, target_status)
            .ok_or_else(|| LifecycleError::MalformedTaskPath(task_path.to_path_buf()))?;
        fs::write(&target_path, updated_content)?;
        fs::remove_file(task_path)?;
        Ok(target_path)
    }

    /// Assigns an `/open/` task to `sessionName`: writes the Assignment
    /// Information block, moves the file into `/in_progress/`, and creates a
    /// tracking entry.
    pub async fn assign_task(
        &self,
        task_path: &Path,
        session_name: &str,
        now: DateTime<Utc>,
    ) -> Result<AssignOutcome, LifecycleError> {
        require_folder(task_path, "open")?;
        require_exists(task_path)?;

        let segment = project_segment_from_task_path(task_path)?;
        let known_project = self.store.with_data(|data| {
            data.projects
                .iter()
                .any(|p| p.path.file_name().and_then(|n| n.to_str()) == Some(segment.as_str()))
        });
        if !known_project {
            return Err(LifecycleError::UnknownProject(segment));
        }

        let (team, member) = self
            .store
            .find_member_by_session_name(session_name)
            .ok_or_else(|| LifecycleError::UnknownSession(session_name.to_string()))?;

        let content = fs::read_to_string(task_path)?;
        let assignment_block = format!(
            "- **Assigned To**: {session_name}\n- **Assigned At**: {}",
            now.to_rfc3339()
        );
        let updated = append_section(&content, "Assignment Information", &assignment_block);
        let target_path = self.move_task(task_path, &updated, "in_progress").await?;

        let task_id = self.id_gen.next();
        self.tracking.insert(InProgressTaskEntry {
            task_id: task_id.clone(),
            team_id: team.id.as_str().to_string(),
            session_name: session_name.to_string(),
            task_path: target_path.clone(),
            assigned_at: now,
            last_heartbeat: now,
        })?;

        self.activity
            .append(ActivityEntry {
                task_id: Some(task_id.clone()),
                session_name: Some(session_name.to_string()),
                ..ActivityEntry::activity(
                    now,
                    "task_assigned",
                    format!("assigned {} to {session_name}", target_path.display()),
                )
            })
            .await?;

        Ok(AssignOutcome {
            task_id,
            team_id: team.id,
            member_id: member.id,
            task_path: target_path,
        })
    }

    async fn transition_to_done(
        &self,
        task_path: &Path,
        content: &str,
        session_name: &str,
        output: Option<&Value>,
        now: DateTime<Utc>,
    ) -> Result<PathBuf, LifecycleError> {
        let completion_block = format!(
            "- **Completed By**: {session_name}\n- **Completed At**: {}",
            now.to_rfc3339()
        );
        let updated = append_section(content, "Completion Information", &completion_block);
        let target_path = self.move_task(task_path, &updated, "done").await?;

        if let Some(output) = output {
            let sibling = output_sibling_path(&target_path);
            #[derive(Serialize)]
            struct OutputDoc<'a> {
                output: &'a Value,
                #[serde(rename = "producedAt")]
                produced_at: String,
                #[serde(rename = "sessionName")]
                session_name: &'a str,
            }
            let doc = OutputDoc {
                output,
                produced_at: now.to_rfc3339(),
                session_name,
            };
            let rendered = serde_json::to_string_pretty(&doc).unwrap_or_default();
            fs::write(sibling, rendered)?;
        }

        if let Some(entry) = self.find_tracking_by_path(task_path) {
            self.tracking.remove(&entry.task_id)?;
        }

        self.activity
            .append(ActivityEntry {
                session_name: Some(session_name.to_string()),
                ..ActivityEntry::activity(now, "task_completed", format!("completed {}", target_path.display()))
            })
            .await?;

        Ok(target_path)
    }

    async fn record_failed_validation(
        &self,
        task_path: &Path,
        content: &str,
        error_message: String,
        now: DateTime<Utc>,
    ) -> Result<CompleteOutcome, LifecycleError> {
        let existing = extract_retry_info(content)?;
        let max_retries = existing.as_ref().map_or(DEFAULT_MAX_RETRIES, |r| r.max_retries);
        let retry_count = existing.as_ref().map_or(0, |r| r.retry_count) + 1;
        let mut last_errors = existing.map(|r| r.last_errors).unwrap_or_default();
        last_errors.push(error_message);
        let retry = RetryInfo {
            retry_count,
            max_retries,
            last_errors,
            last_attempt_at: Some(now),
        };
        let updated =
            replace_or_append_section(content, RETRY_HEADER, &render_retry_section(&retry));

        if retry_count > max_retries {
            let updated = append_section(
                &updated,
                "Output Validation Failure",
                &format!("- **Max Retries Exceeded**: true\n- **At**: {}", now.to_rfc3339()),
            );
            let target_path = self.move_task(task_path, &updated, "blocked").await?;
            if let Some(entry) = self.find_tracking_by_path(task_path) {
                self.tracking.remove(&entry.task_id)?;
            }
            self.activity
                .append(ActivityEntry::activity(
                    now,
                    "task_blocked",
                    format!("blocked {} (max retries exceeded)", target_path.display()),
                ))
                .await?;
            Ok(CompleteOutcome::Blocked {
                max_retries_exceeded: true,
            })
        } else {
            fs::write(task_path, &updated)?;
            Ok(CompleteOutcome::RetryRecorded {
                retry_count,
                max_retries,
            })
        }
    }

    /// Completes an `/in_progress/` task. Whether a schema gates
    /// completion is read straight off the task markdown.
    pub async fn complete_task(
        &self,
        task_path: &Path,
        session_name: &str,
        output: Option<Value>,
        now: DateTime<Utc>,
    ) -> Result<CompleteOutcome, LifecycleError> {
        require_folder(task_path, "in_progress")?;
        require_exists(task_path)?;

        let content = fs::read_to_string(task_path)?;
        let Some(schema) = extract_schema(&content)? else {
            self.transition_to_done(task_path, &content, session_name, None, now)
                .await?;
            return Ok(CompleteOutcome::Completed {
                output_written: false,
            });
        };

        let Some(output) = output else {
            return Ok(CompleteOutcome::MissingOutput);
        };

        let serialized = serde_json::to_string(&output).unwrap_or_default();
        if let Err(size_err) = validate_size(&serialized, DEFAULT_MAX_BYTES) {
            return self
                .record_failed_validation(task_path, &content, size_err.to_string(), now)
                .await;
        }
        if let Err(schema_err) = validate_against_schema(&output, &schema) {
            return self
                .record_failed_validation(task_path, &content, schema_err.to_string(), now)
                .await;
        }

        self.transition_to_done(task_path, &content, session_name, Some(&output), now)
            .await?;
        Ok(CompleteOutcome::Completed {
            output_written: true,
        })
    }

    /// Blocks an `/in_progress/` task.
    pub async fn block_task(
        &self,
        task_path: &Path,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        require_folder(task_path, "in_progress")?;
        require_exists(task_path)?;

        let content = fs::read_to_string(task_path)?;
        let reason_line = reason
            .map(|r| format!("- **Reason**: {r}"))
            .unwrap_or_else(|| "- **Reason**: (none given)".to_string());
        let block_block = format!("{reason_line}\n- **Blocked At**: {}", now.to_rfc3339());
        let updated = append_section(&content, "Block Information", &block_block);

        if let Some(entry) = self.find_tracking_by_path(task_path) {
            self.tracking.remove(&entry.task_id)?;
        }
        let target_path = self.move_task(task_path, &updated, "blocked").await?;

        self.activity
            .append(ActivityEntry::activity(now, "task_blocked", format!("blocked {}", target_path.display())))
            .await?;
        Ok(())
    }

    /// Unblocks a `/blocked/` task back to `/open/`. Retry
    /// history in the task body is preserved untouched.
    pub async fn unblock_task(
        &self,
        task_path: &Path,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        require_folder(task_path, "blocked")?;
        require_exists(task_path)?;

        let content = fs::read_to_string(task_path)?;
        let note_line = note
            .map(|n| format!("- **Note**: {n}"))
            .unwrap_or_else(|| "- **Note**: (none given)".to_string());
        let unblock_block = format!("{note_line}\n- **Unblocked At**: {}", now.to_rfc3339());
        let updated = append_section(&content, "Unblock Information", &unblock_block);
        let target_path = self.move_task(task_path, &updated, "open").await?;

        self.activity
            .append(ActivityEntry::activity(now, "task_unblocked", format!("unblocked {}", target_path.display())))
            .await?;
        Ok(())
    }

    async fn recover_one(
        &self,
        entry: &InProgressTaskEntry,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        if !entry.task_path.exists() {
            self.tracking.remove(&entry.task_id)?;
            return Ok(());
        }
        let content = fs::read_to_string(&entry.task_path)?;
        let stripped = strip_section(&content, "Assignment Information");
        let target_path = self.move_task(&entry.task_path, &stripped, "open").await?;
        self.tracking.remove(&entry.task_id)?;

        self.activity
            .append(ActivityEntry {
                task_id: Some(entry.task_id.clone()),
                session_name: Some(entry.session_name.clone()),
                ..ActivityEntry::activity(now, "task_abandoned", format!("recovered {}", target_path.display()))
            })
            .await?;
        Ok(())
    }

    /// Moves every tracked task whose owner is gone or hasn't heartbeated
    /// within `abandon_threshold_secs` back to `/open/`.
    pub async fn recover_abandoned(
        &self,
        active_sessions: &[String],
        abandon_threshold_secs: u64,
        now: DateTime<Utc>,
    ) -> RecoveryReport {
        let mut report = RecoveryReport::default();

        for entry in self.tracking.list() {
            let stale = now.signed_duration_since(entry.last_heartbeat).num_seconds()
                >= abandon_threshold_secs as i64;
            let owner_gone = !active_sessions.iter().any(|s| s == &entry.session_name);
            if !owner_gone && !stale {
                report.skipped += 1;
                continue;
            }
            match self.recover_one(&entry, now).await {
                Ok(()) => report.recovered += 1,
                Err(e) => report.errors.push(format!("{}: {e}", entry.task_path.display())),
            }
        }

        report
    }
}

/// Counts of task files per status folder within a single milestone (or
/// summed across every milestone in a project).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub open: usize,
    pub in_progress: usize,
    pub done: usize,
    pub blocked: usize,
}

impl TaskCounts {
    pub fn total(&self) -> usize {
        self.open + self.in_progress + self.done + self.blocked
    }

    pub fn percent_done(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.done as f64 / total as f64) * 100.0
        }
    }

    fn add(&mut self, other: TaskCounts) {
        self.open += other.open;
        self.in_progress += other.in_progress;
        self.done += other.done;
        self.blocked += other.blocked;
    }
}

fn count_markdown_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("md"))
                .count()
        })
        .unwrap_or(0)
}

fn count_milestone(milestone_dir: &Path) -> TaskCounts {
    TaskCounts {
        open: count_markdown_files(&milestone_dir.join("open")),
        in_progress: count_markdown_files(&milestone_dir.join("in_progress")),
        done: count_markdown_files(&milestone_dir.join("done")),
        blocked: count_markdown_files(&milestone_dir.join("blocked")),
    }
}

fn tasks_root(project_path: &Path) -> PathBuf {
    project_path.join(".crewly").join("tasks")
}

/// Returns the lexicographically first `/open/*.md` task, scoped to one
/// milestone if given, else the first across all milestones in path order.
pub fn take_next_task(project_path: &Path, task_group: Option<&str>) -> Option<PathBuf> {
    let root = tasks_root(project_path);
    let milestones: Vec<PathBuf> = match task_group {
        Some(group) => vec![root.join(group)],
        None => fs::read_dir(&root)
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect(),
    };

    let mut candidates = Vec::new();
    for milestone in milestones {
        if let Ok(entries) = fs::read_dir(milestone.join("open")) {
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("md") {
                    candidates.push(path);
                }
            }
        }
    }
    candidates.sort();
    candidates.into_iter().next()
}

/// Task counts for one milestone, or summed across every milestone if
/// `task_group` is absent.
pub fn sync_task_status(project_path: &Path, task_group: Option<&str>) -> TaskCounts {
    let root = tasks_root(project_path);
    match task_group {
        Some(group) => count_milestone(&root.join(group)),
        None => {
            let mut total = TaskCounts::default();
            if let Ok(entries) = fs::read_dir(&root) {
                for entry in entries.filter_map(|e| e.ok()).filter(|e| e.path().is_dir()) {
                    total.add(count_milestone(&entry.path()));
                }
            }
            total
        }
    }
}

/// Aggregate task counts across every milestone in a project.
pub fn get_team_progress(project_path: &Path) -> TaskCounts {
    sync_task_status(project_path, None)
}

/// Writes a new task markdown file into `open/` (or `in_progress/` when
/// `start_in_progress` is set) under the given milestone.
pub fn create_task(
    project_path: &Path,
    milestone: &str,
    file_name: &str,
    title: &str,
    target_role: &str,
    estimated_delay_minutes: u64,
    output_schema: Option<&Value>,
    start_in_progress: bool,
) -> Result<PathBuf, LifecycleError> {
    let mut content = format!(
        "# {title}\n\n## Task Information\n- **Target Role**: {target_role}\n- **Estimated Delay**: {estimated_delay_minutes} minutes\n"
    );
    if let Some(schema) = output_schema {
        content.push('\n');
        content.push_str(&render_schema_section(schema));
    }

    let status = if start_in_progress { "in_progress" } else { "open" };
    let dir = tasks_root(project_path).join(milestone).join(status);
    fs::create_dir_all(&dir)?;
    let path = dir.join(file_name);
    fs::write(&path, &content)?;
    Ok(path)
}

/// Reads the `<task>.output.json` sibling written on completion.
pub fn get_task_output(task_path: &Path) -> Result<Value, LifecycleError> {
    let sibling = output_sibling_path(task_path);
    if !sibling.exists() {
        return Err(LifecycleError::TaskNotFound(sibling));
    }
    let content = fs::read_to_string(&sibling)?;
    serde_json::from_str(&content)
        .map_err(|e| LifecycleError::TaskParse(TaskParseError::MalformedSchema(e.to_string())))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

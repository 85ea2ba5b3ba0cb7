// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The task lifecycle engine (component E), the message scheduler
//! (component F), and the check scheduler (component G): the three
//! coordinating cores the controller surface (component H) sits on top of.

pub mod checks;
pub mod error;
pub mod lifecycle;
pub mod paths;
pub mod scheduler;
pub mod task;
mod target;

pub use checks::{
    ActivityMonitor, ActivityStatus, AdaptiveConfig, CheckScheduler, CheckSchedulerError,
    CheckStats, CheckType, ContinuationEvent, ContinuationHandler, DefaultCheckinIntervals,
    ScheduledCheckView,
};
pub use error::LifecycleError;
pub use lifecycle::{
    create_task, get_task_output, get_team_progress, sync_task_status, take_next_task,
    AssignOutcome, CompleteOutcome, RecoveryReport, TaskCounts, TaskLifecycle,
};
pub use paths::{in_status, project_segment_from_task_path, status_folder, PathExtractionError};
pub use scheduler::{
    MessageScheduler, OrphanCleanupReport, SchedulerError, ORCHESTRATOR_SESSION_NAME,
};
pub use task::{RetryInfo, TaskHeader, TaskParseError};

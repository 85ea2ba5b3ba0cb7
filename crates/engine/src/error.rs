// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the task lifecycle engine (component E): validation
//! errors and conflict-state are client errors the controller surfaces
//! without retrying; I/O and store errors are 500-class failures.

use crate::paths::PathExtractionError;
use crate::task::TaskParseError;
use crewly_storage::{ActivityError, StoreError, TrackingError};
use crewly_validator::SizeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("task {0} is not in the /open/ folder")]
    NotOpen(PathBuf),
    #[error("task is in /{current_folder}/, not /{expected_folder}/")]
    Conflict {
        current_folder: String,
        expected_folder: String,
    },
    #[error("cannot determine project from task path")]
    UnknownPath(#[from] PathExtractionError),
    #[error("unknown project for path segment {0}")]
    UnknownProject(String),
    #[error("unknown session: {0}")]
    UnknownSession(String),
    #[error("task file not found: {0}")]
    TaskNotFound(PathBuf),
    #[error("task path is too shallow to determine a milestone folder: {0}")]
    MalformedTaskPath(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("tracking error: {0}")]
    Tracking(#[from] TrackingError),
    #[error("activity log error: {0}")]
    Activity(#[from] ActivityError),
    #[error("task markdown error: {0}")]
    TaskParse(#[from] TaskParseError),
    #[error("output is too large: {0}")]
    Size(#[from] SizeError),
}

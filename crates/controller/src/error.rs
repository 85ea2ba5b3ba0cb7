// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request-boundary errors: validation failures and not-found lookups are
//! the two taxonomy kinds the controller surface rejects outright rather
//! than folding into a `{success: false, suggestion}` response. Everything
//! else the engine can report — wrong folder, missing schema output, an
//! unresolved delivery target — is a normal task-state outcome, not an
//! error.

use crewly_engine::{CheckSchedulerError, LifecycleError, SchedulerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    /// Missing or malformed required field (400-class).
    #[error("validation failed: {0}")]
    Validation(String),
    /// Task, project, session, or output file absent (404-class).
    #[error("not found: {0}")]
    NotFound(String),
    /// Everything else the engine reports is a 500-class failure: the
    /// request was well-formed but the underlying store or filesystem
    /// operation itself failed.
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("check scheduler error: {0}")]
    Checks(#[from] CheckSchedulerError),
}

impl ControllerError {
    /// The HTTP-style status class (400/404/500), for a transport layer
    /// that wants to map onto real status codes.
    pub fn status_class(&self) -> u16 {
        match self {
            ControllerError::Validation(_) => 400,
            ControllerError::NotFound(_) => 404,
            ControllerError::Lifecycle(_) | ControllerError::Scheduler(_) | ControllerError::Checks(_) => 500,
        }
    }
}

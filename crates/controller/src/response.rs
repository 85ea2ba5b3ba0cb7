// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The structured `{success, …}` envelope every controller operation
//! returns: validation failures are rejected before a response is even
//! built (the caller gets a `ControllerError`), while non-transitional
//! failures — wrong folder, missing file — come back as `success: false`
//! with a `suggestion` instead of an error, so an agent's retry loop stays
//! idempotent.

use serde::Serialize;
use serde_json::Value;

/// A successful or gracefully-failed outcome from a controller operation.
/// Distinct from [`crate::ControllerError`], which is reserved for
/// validation and not-found failures treated as request-boundary errors
/// rather than task-state outcomes.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Response {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Response {
    pub fn ok(data: impl Serialize) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            suggestion: None,
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            suggestion: None,
        }
    }

    pub fn failed(suggestion: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            suggestion: Some(suggestion.into()),
        }
    }

    /// Attaches `data` to an already-built response, for `failed()` outcomes
    /// that still carry a structured detail (e.g. a retry count) alongside
    /// the suggestion text.
    pub fn tagged(mut self, data: impl Serialize) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }
}

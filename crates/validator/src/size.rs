// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Size validation: every delivered payload is checked against a byte cap
//! before it is written to a session or a task folder.

use thiserror::Error;

#[derive(Debug, Error)]
#[error("payload is {actual} bytes, over the {limit} byte limit")]
pub struct SizeError {
    pub actual: usize,
    pub limit: usize,
}

/// Default cap on a single delivered message or task output document.
pub const DEFAULT_MAX_BYTES: usize = 1024 * 1024;

pub fn validate_size(content: &str, limit: usize) -> Result<(), SizeError> {
    let actual = content.len();
    if actual > limit {
        return Err(SizeError { actual, limit });
    }
    Ok(())
}

#[cfg(test)]
#[path = "size_tests.rs"]
mod tests;

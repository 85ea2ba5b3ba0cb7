// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op session adapter for when session delivery is disabled.

use super::{SessionAdapter, SessionError};
use async_trait::async_trait;
use crewly_core::RuntimeType;

/// Session adapter that does nothing. Used in minimal/dry-run deployments.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpSessionAdapter;

impl NoOpSessionAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionAdapter for NoOpSessionAdapter {
    async fn session_exists(&self, _session_name: &str) -> Result<bool, SessionError> {
        Ok(false)
    }

    async fn send(&self, _session_name: &str, _text: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn send_payload_then_enter(
        &self,
        _session_name: &str,
        _payload: &str,
        _runtime: RuntimeType,
    ) -> Result<(), SessionError> {
        Ok(())
    }

    async fn snapshot(&self, _session_name: &str, _lines: u32) -> Result<String, SessionError> {
        Ok(String::new())
    }

    async fn is_prompt_idle(
        &self,
        _session_name: &str,
        _runtime: RuntimeType,
    ) -> Result<bool, SessionError> {
        Ok(false)
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;

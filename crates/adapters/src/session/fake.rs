// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake session adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{snapshot_looks_idle, SessionAdapter, SessionError};
use async_trait::async_trait;
use crewly_core::RuntimeType;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded session call
#[derive(Debug, Clone)]
pub enum SessionCall {
    Send {
        session_name: String,
        text: String,
    },
    SendPayloadThenEnter {
        session_name: String,
        payload: String,
        runtime: RuntimeType,
    },
    Snapshot {
        session_name: String,
        lines: u32,
    },
    IsPromptIdle {
        session_name: String,
        runtime: RuntimeType,
    },
}

/// Fake session state
#[derive(Debug, Clone)]
pub struct FakeSession {
    pub exists: bool,
    pub output: Vec<String>,
    /// Overrides the marker-based idle heuristic when set.
    pub idle_override: Option<bool>,
    /// Whether `send_payload_then_enter` echoes the payload into `output`.
    /// Disable to simulate a send that never reaches the pane.
    pub echoes_payload: bool,
}

impl Default for FakeSession {
    fn default() -> Self {
        Self {
            exists: false,
            output: Vec::new(),
            idle_override: None,
            echoes_payload: true,
        }
    }
}

#[derive(Default)]
struct FakeSessionState {
    sessions: HashMap<String, FakeSession>,
    calls: Vec<SessionCall>,
}

/// Fake session adapter for testing
#[derive(Clone, Default)]
pub struct FakeSessionAdapter {
    inner: Arc<Mutex<FakeSessionState>>,
}

impl FakeSessionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        self.inner.lock().calls.clone()
    }

    pub fn get_session(&self, name: &str) -> Option<FakeSession> {
        self.inner.lock().sessions.get(name).cloned()
    }

    /// Register a session so `session_exists`/`snapshot` see it.
    pub fn add_session(&self, name: &str) {
        self.inner
            .lock()
            .sessions
            .insert(name.to_string(), FakeSession { exists: true, ..Default::default() });
    }

    pub fn set_output(&self, name: &str, output: Vec<String>) {
        if let Some(session) = self.inner.lock().sessions.get_mut(name) {
            session.output = output;
        }
    }

    pub fn set_idle(&self, name: &str, idle: bool) {
        if let Some(session) = self.inner.lock().sessions.get_mut(name) {
            session.idle_override = Some(idle);
        }
    }

    pub fn remove_session(&self, name: &str) {
        self.inner.lock().sessions.remove(name);
    }

    pub fn set_echoes_payload(&self, name: &str, echoes: bool) {
        if let Some(session) = self.inner.lock().sessions.get_mut(name) {
            session.echoes_payload = echoes;
        }
    }
}

#[async_trait]
impl SessionAdapter for FakeSessionAdapter {
    async fn session_exists(&self, session_name: &str) -> Result<bool, SessionError> {
        Ok(self
            .inner
            .lock()
            .sessions
            .get(session_name)
            .map(|s| s.exists)
            .unwrap_or(false))
    }

    async fn send(&self, session_name: &str, text: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::Send {
            session_name: session_name.to_string(),
            text: text.to_string(),
        });

        let session = inner
            .sessions
            .get_mut(session_name)
            .ok_or_else(|| SessionError::NotFound(session_name.to_string()))?;
        session.output.push(text.to_string());
        Ok(())
    }

    async fn send_payload_then_enter(
        &self,
        session_name: &str,
        payload: &str,
        runtime: RuntimeType,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::SendPayloadThenEnter {
            session_name: session_name.to_string(),
            payload: payload.to_string(),
            runtime,
        });

        let session = inner
            .sessions
            .get_mut(session_name)
            .ok_or_else(|| SessionError::NotFound(session_name.to_string()))?;
        if session.echoes_payload {
            session.output.push(payload.to_string());
        }
        Ok(())
    }

    async fn snapshot(&self, session_name: &str, lines: u32) -> Result<String, SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::Snapshot {
            session_name: session_name.to_string(),
            lines,
        });

        let session = inner
            .sessions
            .get(session_name)
            .ok_or_else(|| SessionError::NotFound(session_name.to_string()))?;
        let start = session.output.len().saturating_sub(lines as usize);
        Ok(session.output[start..].join("\n"))
    }

    async fn is_prompt_idle(
        &self,
        session_name: &str,
        runtime: RuntimeType,
    ) -> Result<bool, SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::IsPromptIdle {
            session_name: session_name.to_string(),
            runtime,
        });

        let session = inner
            .sessions
            .get(session_name)
            .ok_or_else(|| SessionError::NotFound(session_name.to_string()))?;
        if let Some(idle) = session.idle_override {
            return Ok(idle);
        }
        let joined = session.output.join("\n");
        Ok(snapshot_looks_idle(&joined, runtime))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;

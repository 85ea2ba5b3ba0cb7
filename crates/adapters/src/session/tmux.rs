// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux-backed session adapter.

use super::{snapshot_looks_idle, SessionAdapter, SessionError};
use async_trait::async_trait;
use crewly_core::RuntimeType;
use tokio::process::Command;
use tokio::time::{sleep, Duration};

/// Tmux-based session adapter
#[derive(Clone, Default)]
pub struct TmuxAdapter;

impl TmuxAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionAdapter for TmuxAdapter {
    async fn session_exists(&self, session_name: &str) -> Result<bool, SessionError> {
        let output = Command::new("tmux")
            .args(["has-session", "-t", session_name])
            .output()
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;

        Ok(output.status.success())
    }

    async fn send(&self, session_name: &str, text: &str) -> Result<(), SessionError> {
        // -l = literal mode (no key name interpretation)
        // -- = end of options (handles text starting with -)
        let output = Command::new("tmux")
            .args(["send-keys", "-t", session_name, "-l", "--", text])
            .output()
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(SessionError::NotFound(session_name.to_string()));
        }
        Ok(())
    }

    async fn send_payload_then_enter(
        &self,
        session_name: &str,
        payload: &str,
        runtime: RuntimeType,
    ) -> Result<(), SessionError> {
        self.send(session_name, payload).await?;
        sleep(Duration::from_millis(runtime.enter_delay_ms())).await;

        let output = Command::new("tmux")
            .args(["send-keys", "-t", session_name, "Enter"])
            .output()
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(SessionError::NotFound(session_name.to_string()));
        }
        Ok(())
    }

    async fn snapshot(&self, session_name: &str, lines: u32) -> Result<String, SessionError> {
        let output = Command::new("tmux")
            .args([
                "capture-pane",
                "-t",
                session_name,
                "-p",
                "-S",
                &format!("-{lines}"),
            ])
            .output()
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(SessionError::NotFound(session_name.to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn is_prompt_idle(
        &self,
        session_name: &str,
        runtime: RuntimeType,
    ) -> Result<bool, SessionError> {
        let snapshot = self.snapshot(session_name, 20).await?;
        Ok(snapshot_looks_idle(&snapshot, runtime))
    }
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;

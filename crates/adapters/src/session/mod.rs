// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session backend port (component B): the narrow surface the rest of the
//! daemon uses to talk to a fleet member's terminal session, regardless of
//! which runtime (claude-code, gemini-cli, codex-cli) drives it.

mod noop;
mod tmux;

pub use noop::NoOpSessionAdapter;
pub use tmux::TmuxAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSession, FakeSessionAdapter, SessionCall};

use async_trait::async_trait;
use crewly_core::RuntimeType;
use thiserror::Error;

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Adapter for a fleet member's backing terminal session (tmux, etc.).
///
/// The daemon never spawns sessions itself — members are attached to
/// pre-existing sessions by name — so the entire contract is: check a
/// session is there, write to it, and read back what it said.
#[async_trait]
pub trait SessionAdapter: Clone + Send + Sync + 'static {
    /// Whether a session with this name currently exists.
    async fn session_exists(&self, session_name: &str) -> Result<bool, SessionError>;

    /// Send literal text to the session without submitting it.
    async fn send(&self, session_name: &str, text: &str) -> Result<(), SessionError>;

    /// Send a literal payload, wait the runtime's enter delay, then submit
    /// it with Enter. The delay exists because chat-style CLIs drop input
    /// that arrives before they've finished rendering the prompt.
    async fn send_payload_then_enter(
        &self,
        session_name: &str,
        payload: &str,
        runtime: RuntimeType,
    ) -> Result<(), SessionError>;

    /// Capture the most recent `lines` of the session's terminal output.
    async fn snapshot(&self, session_name: &str, lines: u32) -> Result<String, SessionError>;

    /// Whether the session's prompt looks idle (ready for new input) rather
    /// than mid-response, based on the runtime's idle prompt markers.
    async fn is_prompt_idle(
        &self,
        session_name: &str,
        runtime: RuntimeType,
    ) -> Result<bool, SessionError>;
}

/// Markers that indicate a runtime's prompt is idle, checked against the
/// trailing non-blank line of a captured snapshot.
pub fn idle_prompt_markers(runtime: RuntimeType) -> &'static [&'static str] {
    match runtime {
        RuntimeType::ClaudeCode => &["│ >", "No, and tell Claude what to do differently"],
        RuntimeType::GeminiCli => &["Type your message"],
        RuntimeType::CodexCli => &["send", "▌"],
    }
}

/// Checks a captured snapshot's trailing non-blank line against `runtime`'s
/// idle prompt markers. Shared by every [`SessionAdapter`] implementation so
/// the idle heuristic lives in one place.
pub fn snapshot_looks_idle(snapshot: &str, runtime: RuntimeType) -> bool {
    let Some(last_line) = snapshot.lines().rev().find(|l| !l.trim().is_empty()) else {
        return false;
    };
    idle_prompt_markers(runtime)
        .iter()
        .any(|marker| last_line.contains(marker))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The interactive CLI flavor driving an agent session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Runtime type: the interactive CLI flavor driving a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeType {
    ClaudeCode,
    GeminiCli,
    CodexCli,
}

impl RuntimeType {
    /// Default runtime assumed when a session's runtime cannot be resolved.
    pub const DEFAULT: RuntimeType = RuntimeType::ClaudeCode;

    /// Inter-write delay between the payload and the Enter keystroke, per
    /// runtime.
    pub fn enter_delay_ms(self) -> u64 {
        match self {
            RuntimeType::ClaudeCode => 120,
            RuntimeType::GeminiCli => 150,
            RuntimeType::CodexCli => 150,
        }
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuntimeType::ClaudeCode => "claude-code",
            RuntimeType::GeminiCli => "gemini-cli",
            RuntimeType::CodexCli => "codex-cli",
        })
    }
}

impl FromStr for RuntimeType {
    type Err = RuntimeTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude-code" => Ok(RuntimeType::ClaudeCode),
            "gemini-cli" => Ok(RuntimeType::GeminiCli),
            "codex-cli" => Ok(RuntimeType::CodexCli),
            other => Err(RuntimeTypeParseError(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown runtime type: {0}")]
pub struct RuntimeTypeParseError(String);

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn round_trips_through_display_and_from_str() {
    for rt in [
        RuntimeType::ClaudeCode,
        RuntimeType::GeminiCli,
        RuntimeType::CodexCli,
    ] {
        let s = rt.to_string();
        assert_eq!(RuntimeType::from_str(&s).unwrap(), rt);
    }
}

#[test]
fn unknown_runtime_is_an_error() {
    assert!(RuntimeType::from_str("bash-cli").is_err());
}

#[test]
fn serializes_kebab_case() {
    let json = serde_json::to_string(&RuntimeType::GeminiCli).unwrap();
    assert_eq!(json, "\"gemini-cli\"");
}

#[test]
fn default_is_claude_code() {
    assert_eq!(RuntimeType::DEFAULT, RuntimeType::ClaudeCode);
}

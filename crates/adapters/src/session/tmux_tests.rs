// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;
use tokio::process::Command as TokioCommand;

/// Random prefix for this test run to avoid conflicts with parallel test runs.
static TEST_PREFIX: LazyLock<String> = LazyLock::new(|| {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    format!("t{:04x}", nanos & 0xFFFF)
});

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique_name(suffix: &str) -> String {
    let id = SESSION_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", *TEST_PREFIX, suffix, id)
}

fn tmux_available() -> bool {
    std::process::Command::new("tmux")
        .arg("-V")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

macro_rules! fail_if_no_tmux {
    () => {
        if !tmux_available() {
            panic!("tmux is required but not available");
        }
    };
}

async fn spawn_raw(name: &str, cmd: &str) {
    let _ = TokioCommand::new("tmux")
        .args(["new-session", "-d", "-s", name, "-c", "/tmp", cmd])
        .output()
        .await;
}

async fn kill_raw(name: &str) {
    let _ = TokioCommand::new("tmux")
        .args(["kill-session", "-t", name])
        .output()
        .await;
}

// All tmux tests are serialized because some tests modify PATH which affects all others.

#[tokio::test]
#[serial(tmux)]
async fn session_exists_is_true_for_live_session() {
    fail_if_no_tmux!();
    let name = unique_name("exists");
    spawn_raw(&name, "sleep 60").await;

    let adapter = TmuxAdapter::new();
    assert!(adapter.session_exists(&name).await.unwrap());

    kill_raw(&name).await;
}

#[tokio::test]
#[serial(tmux)]
async fn session_exists_is_false_for_unknown_session() {
    fail_if_no_tmux!();
    let adapter = TmuxAdapter::new();
    assert!(!adapter.session_exists("nonexistent-session-xyz").await.unwrap());
}

#[tokio::test]
#[serial(tmux)]
async fn send_delivers_text_without_submitting() {
    fail_if_no_tmux!();
    let name = unique_name("send");
    spawn_raw(&name, "cat").await;
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    let adapter = TmuxAdapter::new();
    adapter.send(&name, "hello").await.unwrap();
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    // cat hasn't seen Enter yet, so "hello" sits on the input line, unechoed.
    let snapshot = adapter.snapshot(&name, 10).await.unwrap();
    assert!(snapshot.contains("hello"));

    kill_raw(&name).await;
}

#[tokio::test]
#[serial(tmux)]
async fn send_to_nonexistent_session_returns_not_found() {
    fail_if_no_tmux!();
    let adapter = TmuxAdapter::new();
    let result = adapter.send("nonexistent-session-xyz", "test").await;
    assert!(matches!(result, Err(SessionError::NotFound(_))));
}

#[tokio::test]
#[serial(tmux)]
async fn send_payload_then_enter_submits_after_delay() {
    fail_if_no_tmux!();
    let name = unique_name("enter");
    spawn_raw(&name, "cat").await;
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    let adapter = TmuxAdapter::new();
    adapter
        .send_payload_then_enter(&name, "echoed-line", RuntimeType::ClaudeCode)
        .await
        .unwrap();
    tokio::time::sleep(tokio::time::Duration::from_millis(150)).await;

    let snapshot = adapter.snapshot(&name, 10).await.unwrap();
    assert!(snapshot.contains("echoed-line"));

    kill_raw(&name).await;
}

#[tokio::test]
#[serial(tmux)]
async fn snapshot_returns_pane_content() {
    fail_if_no_tmux!();
    let name = unique_name("snapshot");
    spawn_raw(&name, "echo 'capture-test-output' && sleep 60").await;
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let adapter = TmuxAdapter::new();
    let snapshot = adapter.snapshot(&name, 10).await.unwrap();
    assert!(snapshot.contains("capture-test-output"));

    kill_raw(&name).await;
}

#[tokio::test]
#[serial(tmux)]
async fn snapshot_nonexistent_session_returns_not_found() {
    fail_if_no_tmux!();
    let adapter = TmuxAdapter::new();
    let result = adapter.snapshot("nonexistent-session-xyz", 10).await;
    assert!(matches!(result, Err(SessionError::NotFound(_))));
}

#[tokio::test]
#[serial(tmux)]
async fn is_prompt_idle_detects_idle_marker() {
    fail_if_no_tmux!();
    let name = unique_name("idle");
    spawn_raw(&name, "printf '│ > '; sleep 60").await;
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let adapter = TmuxAdapter::new();
    assert!(adapter
        .is_prompt_idle(&name, RuntimeType::ClaudeCode)
        .await
        .unwrap());

    kill_raw(&name).await;
}

#[test]
fn tmux_adapter_is_zero_sized() {
    let adapter = TmuxAdapter;
    assert!(std::mem::size_of_val(&adapter) == 0);
}

// Tests below modify PATH to simulate tmux being unavailable.

#[tokio::test]
#[serial(tmux)]
async fn session_exists_fails_when_tmux_unavailable() {
    use std::env;

    let original_path = env::var("PATH").unwrap_or_default();
    env::set_var("PATH", "/nonexistent");

    let adapter = TmuxAdapter::new();
    let result = adapter.session_exists("any-session").await;

    env::set_var("PATH", &original_path);

    assert!(matches!(result, Err(SessionError::CommandFailed(_))));
}

#[tokio::test]
#[serial(tmux)]
async fn send_fails_when_tmux_unavailable() {
    use std::env;

    let original_path = env::var("PATH").unwrap_or_default();
    env::set_var("PATH", "/nonexistent");

    let adapter = TmuxAdapter::new();
    let result = adapter.send("any-session", "test").await;

    env::set_var("PATH", &original_path);

    assert!(matches!(result, Err(SessionError::CommandFailed(_))));
}

#[tokio::test]
#[serial(tmux)]
async fn snapshot_fails_when_tmux_unavailable() {
    use std::env;

    let original_path = env::var("PATH").unwrap_or_default();
    env::set_var("PATH", "/nonexistent");

    let adapter = TmuxAdapter::new();
    let result = adapter.snapshot("any-session", 10).await;

    env::set_var("PATH", &original_path);

    assert!(matches!(result, Err(SessionError::CommandFailed(_))));
}

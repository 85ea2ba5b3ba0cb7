// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The preflight/write/verify/retry state machine a single delivery attempt
//! walks through.

use crewly_adapters::{SessionAdapter, SessionError};
use crewly_core::RuntimeType;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("session backend error: {0}")]
    Session(#[from] SessionError),
    #[error("session {0} does not exist")]
    SessionMissing(String),
    #[error("gave up after {attempts} attempts: payload was never observed in the pane")]
    VerificationFailed { attempts: u32 },
}

/// How a retried attempt re-submits, escalating from the cheapest fix to
/// the most thorough one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResendStrategy {
    FullPayload,
    EnterOnly,
}

fn resend_strategy_for_attempt(attempt: u32) -> ResendStrategy {
    // Attempt 1 always sends the full payload. The first retry after it
    // escalates with an Enter-only resend (cheap: maybe the payload landed
    // and only the submit was swallowed); the retry after that resends the
    // whole payload again, repeating the pattern for any further attempts.
    if attempt <= 1 || (attempt - 2) % 2 == 1 {
        ResendStrategy::FullPayload
    } else {
        ResendStrategy::EnterOnly
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeliveryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub idle_poll_attempts: u32,
    pub idle_poll_interval: Duration,
    /// Progressive delays probed between write and giving up verification
    /// for a single attempt.
    pub verify_schedule: [Duration; 4],
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
            idle_poll_attempts: 15,
            idle_poll_interval: Duration::from_millis(200),
            verify_schedule: [
                Duration::from_millis(200),
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub attempts: u32,
    /// Set when the session never reached an idle prompt before the write
    /// went out anyway.
    pub prompt_busy_at_send: bool,
}

/// Delivers `payload` to `session_name`: preflight idle check, two-phase
/// write, progressive verification, and escalating retry up to
/// `policy.max_attempts` total attempts.
pub async fn deliver<A: SessionAdapter>(
    adapter: &A,
    session_name: &str,
    payload: &str,
    runtime: RuntimeType,
    policy: &DeliveryPolicy,
) -> Result<DeliveryOutcome, DeliveryError> {
    if !adapter.session_exists(session_name).await? {
        return Err(DeliveryError::SessionMissing(session_name.to_string()));
    }

    let verify_needle = payload.lines().next().unwrap_or(payload);
    let idle = wait_for_idle(adapter, session_name, runtime, policy).await?;
    let prompt_busy_at_send = !idle;
    if prompt_busy_at_send {
        warn!(session_name, "sending while prompt is still busy; proceeding anyway");
    }

    let mut attempts = 0u32;
    loop {
        attempts += 1;

        match resend_strategy_for_attempt(attempts) {
            ResendStrategy::FullPayload => {
                adapter.send_payload_then_enter(session_name, payload, runtime).await?;
            }
            ResendStrategy::EnterOnly => {
                adapter.send_payload_then_enter(session_name, "", runtime).await?;
            }
        }

        if verify(adapter, session_name, verify_needle, policy).await? {
            debug!(session_name, attempts, "delivery verified");
            return Ok(DeliveryOutcome { attempts, prompt_busy_at_send });
        }

        warn!(session_name, attempts, "payload not observed after send");
        if attempts >= policy.max_attempts {
            return Err(DeliveryError::VerificationFailed { attempts });
        }
        tokio::time::sleep(policy.retry_delay).await;
    }
}

/// Snapshots the pane after each delay in the progressive schedule, giving
/// a slow-to-render runtime more time before a single attempt is declared
/// unverified.
async fn verify<A: SessionAdapter>(
    adapter: &A,
    session_name: &str,
    needle: &str,
    policy: &DeliveryPolicy,
) -> Result<bool, DeliveryError> {
    verify_with_schedule(adapter, session_name, needle, &policy.verify_schedule).await
}

async fn verify_with_schedule<A: SessionAdapter>(
    adapter: &A,
    session_name: &str,
    needle: &str,
    schedule: &[Duration],
) -> Result<bool, DeliveryError> {
    for delay in schedule {
        tokio::time::sleep(*delay).await;
        let snapshot = adapter.snapshot(session_name, 20).await?;
        if snapshot.contains(needle) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Writes `payload` once and runs the progressive verification schedule,
/// with no retry loop around it. Used by the background stuck-message
/// scanner, which re-attempts steps 2-3 exactly once per scan rather than
/// running the full escalating retry a fresh delivery gets.
pub async fn write_and_verify<A: SessionAdapter>(
    adapter: &A,
    session_name: &str,
    payload: &str,
    runtime: RuntimeType,
    verify_schedule: &[Duration],
) -> Result<bool, DeliveryError> {
    adapter.send_payload_then_enter(session_name, payload, runtime).await?;
    let needle = payload.lines().next().unwrap_or(payload);
    verify_with_schedule(adapter, session_name, needle, verify_schedule).await
}

/// Probes for an idle prompt up to `policy.idle_poll_attempts` times. Never
/// fails the delivery on its own — a caller that never goes idle still gets
/// written to anyway.
async fn wait_for_idle<A: SessionAdapter>(
    adapter: &A,
    session_name: &str,
    runtime: RuntimeType,
    policy: &DeliveryPolicy,
) -> Result<bool, DeliveryError> {
    for _ in 0..policy.idle_poll_attempts {
        if adapter.is_prompt_idle(session_name, runtime).await? {
            return Ok(true);
        }
        tokio::time::sleep(policy.idle_poll_interval).await;
    }
    Ok(false)
}

#[cfg(test)]
#[path = "deliver_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracks in-flight deliveries and surfaces the ones that have gone stale,
//! so the caller can retry them. Keeps a bounded set of recently
//! acknowledged payload hashes so a delivery confirmed just before a
//! restart isn't retried again once the scanner comes back up.

use crate::deliver::write_and_verify;
use crewly_adapters::SessionAdapter;
use crewly_core::RuntimeType;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::{info, warn};

const MAX_ACKNOWLEDGED_HISTORY: usize = 500;

#[derive(Debug, Clone)]
pub struct PendingDelivery {
    pub session_name: String,
    pub payload: String,
    pub runtime: RuntimeType,
    pub attempts: u32,
    pub last_attempt_epoch_ms: u64,
}

fn payload_hash(id: &str, payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(b"\0");
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

struct State {
    pending: HashMap<String, PendingDelivery>,
    acknowledged: VecDeque<String>,
}

/// Bookkeeping for messages and checks awaiting delivery confirmation.
pub struct StuckScanner {
    state: Mutex<State>,
}

impl Default for StuckScanner {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                pending: HashMap::new(),
                acknowledged: VecDeque::new(),
            }),
        }
    }
}

impl StuckScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a delivery attempt for `id`. Idempotent if `id` was already
    /// acknowledged in this process's recent history — the scanner won't
    /// resurrect a message a restart raced with its own ack.
    pub fn track(
        &self,
        id: &str,
        session_name: &str,
        payload: &str,
        runtime: RuntimeType,
        now_epoch_ms: u64,
    ) {
        let mut state = self.state.lock();
        if state.acknowledged.contains(&payload_hash(id, payload)) {
            return;
        }
        state
            .pending
            .entry(id.to_string())
            .and_modify(|p| {
                p.attempts += 1;
                p.last_attempt_epoch_ms = now_epoch_ms;
            })
            .or_insert(PendingDelivery {
                session_name: session_name.to_string(),
                payload: payload.to_string(),
                runtime,
                attempts: 1,
                last_attempt_epoch_ms: now_epoch_ms,
            });
    }

    /// Marks `id` as delivered: removes it from the pending set and records
    /// its payload hash so a late retry signal doesn't re-track it.
    pub fn acknowledge(&self, id: &str) {
        let mut state = self.state.lock();
        if let Some(pending) = state.pending.remove(id) {
            let hash = payload_hash(id, &pending.payload);
            state.acknowledged.push_back(hash);
            if state.acknowledged.len() > MAX_ACKNOWLEDGED_HISTORY {
                state.acknowledged.pop_front();
            }
        }
    }

    /// Ids whose last attempt is older than `threshold_ms`, oldest first.
    pub fn stale(&self, now_epoch_ms: u64, threshold_ms: u64) -> Vec<String> {
        let state = self.state.lock();
        let mut stale: Vec<_> = state
            .pending
            .iter()
            .filter(|(_, p)| now_epoch_ms.saturating_sub(p.last_attempt_epoch_ms) >= threshold_ms)
            .map(|(id, p)| (id.clone(), p.last_attempt_epoch_ms))
            .collect();
        stale.sort_by_key(|(_, last)| *last);
        stale.into_iter().map(|(id, _)| id).collect()
    }

    pub fn get(&self, id: &str) -> Option<PendingDelivery> {
        self.state.lock().pending.get(id).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// For every pending delivery stale by `threshold_ms`, whose session is
    /// alive and idle, re-attempts the write-then-verify steps exactly once.
    /// Returns the ids that were newly acknowledged by this pass.
    pub async fn rescan_once<A: SessionAdapter>(
        &self,
        adapter: &A,
        now_epoch_ms: u64,
        threshold_ms: u64,
        verify_schedule: &[Duration],
    ) -> Vec<String> {
        let mut recovered = Vec::new();
        for id in self.stale(now_epoch_ms, threshold_ms) {
            let Some(pending) = self.get(&id) else {
                continue;
            };
            match adapter.session_exists(&pending.session_name).await {
                Ok(true) => {}
                _ => continue,
            }
            match adapter.is_prompt_idle(&pending.session_name, pending.runtime).await {
                Ok(true) => {}
                _ => continue,
            }

            match write_and_verify(adapter, &pending.session_name, &pending.payload, pending.runtime, verify_schedule).await {
                Ok(true) => {
                    info!(id = %id, session_name = %pending.session_name, "stuck message recovered by rescan");
                    self.acknowledge(&id);
                    recovered.push(id);
                }
                Ok(false) => {
                    warn!(id = %id, session_name = %pending.session_name, "stuck message rescan still unverified");
                    self.track(&id, &pending.session_name, &pending.payload, pending.runtime, now_epoch_ms);
                }
                Err(e) => {
                    warn!(id = %id, error = %e, "stuck message rescan failed to write");
                }
            }
        }
        recovered
    }
}

#[cfg(test)]
#[path = "stuck_tests.rs"]
mod tests;

//! Process-wide health snapshot consulted by `/readyz` and `/health` (§4.6, §6).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use serde::Serialize;

/// The supervisor's coarse lifecycle state; `/readyz` reflects this before any
/// per-worker detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Starting,
    Ready,
    Draining,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerHealth {
    pub last_poll_unix_ms: u64,
    pub last_error: Option<String>,
}

/// Shared, lock-protected health state updated by workers and read by the HTTP
/// surface. Cloning a handle is cheap (`Arc` internally); the lock is held only
/// for the duration of a read or a single field update, never across an RPC.
#[derive(Clone)]
pub struct HealthSnapshot {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    state: HealthState,
    workers: HashMap<String, WorkerHealth>,
}

impl HealthSnapshot {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                state: HealthState::Starting,
                workers: HashMap::new(),
            })),
        }
    }

    pub fn set_state(&self, state: HealthState) {
        if let Ok(mut inner) = self.inner.write() {
            inner.state = state;
        }
    }

    pub fn state(&self) -> HealthState {
        self.inner
            .read()
            .map(|inner| inner.state)
            .unwrap_or(HealthState::Starting)
    }

    /// Called by a worker at the top of each poll iteration.
    pub fn record_poll(&self, worker_key: &str) {
        if let Ok(mut inner) = self.inner.write() {
            let now_ms = now_unix_ms();
            inner
                .workers
                .entry(worker_key.to_string())
                .and_modify(|w| w.last_poll_unix_ms = now_ms)
                .or_insert(WorkerHealth {
                    last_poll_unix_ms: now_ms,
                    last_error: None,
                });
        }
    }

    pub fn record_error(&self, worker_key: &str, error: String) {
        if let Ok(mut inner) = self.inner.write() {
            let now_ms = now_unix_ms();
            inner
                .workers
                .entry(worker_key.to_string())
                .and_modify(|w| w.last_error = Some(error.clone()))
                .or_insert(WorkerHealth {
                    last_poll_unix_ms: now_ms,
                    last_error: Some(error),
                });
        }
    }

    pub fn detail(&self) -> HealthDetail {
        let inner = self.inner.read();
        match inner {
            Ok(inner) => HealthDetail {
                state: inner.state,
                workers: inner.workers.clone(),
            },
            Err(_) => HealthDetail {
                state: HealthState::Starting,
                workers: HashMap::new(),
            },
        }
    }
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthDetail {
    pub state: HealthState,
    pub workers: HashMap<String, WorkerHealth>,
}

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

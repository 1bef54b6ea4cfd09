//! # Tracker of running workers.
//!
//! Fed by the supervisor's bus listener. Uses event sequence numbers so a late
//! `WorkerStarting` cannot resurrect a worker that already stopped.
//!
//! ## Rules
//! - `WorkerStarting` marks a worker alive; `WorkerStopped` / `WorkerFailed`
//!   mark it stopped.
//! - Other events carrying the worker name only advance its `last_seq`.
//! - Events with `seq <= last_seq` are ignored.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone, Copy)]
struct WorkerState {
    last_seq: u64,
    alive: bool,
}

#[derive(Default)]
pub struct AliveTracker {
    state: RwLock<HashMap<String, WorkerState>>,
}

impl AliveTracker {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Applies `ev`; returns true if it changed the alive state.
    pub async fn update(&self, ev: &Event) -> bool {
        if ev.is_subscriber_event() {
            return false;
        }
        let Some(name) = ev.worker.as_deref() else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(name.to_string()).or_insert(WorkerState {
            last_seq: 0,
            alive: false,
        });
        if ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;

        let alive = match ev.kind {
            EventKind::WorkerStarting => true,
            EventKind::WorkerStopped | EventKind::WorkerFailed => false,
            _ => return false,
        };
        let changed = entry.alive != alive;
        entry.alive = alive;
        changed
    }

    /// Sorted names of the workers currently alive.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .iter()
            .filter(|(_, s)| s.alive)
            .map(|(name, _)| name.clone())
            .collect();
        alive.sort_unstable();
        alive
    }

    pub async fn is_alive(&self, name: &str) -> bool {
        self.state
            .read()
            .await
            .get(name)
            .is_some_and(|s| s.alive)
    }
}

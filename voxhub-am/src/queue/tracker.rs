//! Completion tracker
//!
//! Lets callers block until a specific queue item has finished playing,
//! with bounded memory: completion cells are pruned a grace period after
//! the item completes, and a short-lived log of completed ids keeps late
//! waiters answerable after the cell is gone.

use crate::error::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellState {
    Pending,
    Done,
    Cancelled,
}

struct CompletionCell {
    state: Mutex<CellState>,
    notify: Notify,
}

impl CompletionCell {
    fn new(state: CellState) -> Self {
        Self {
            state: Mutex::new(state),
            notify: Notify::new(),
        }
    }

    fn settle(&self, state: CellState) {
        let mut current = self.state.lock().unwrap();
        if *current == CellState::Pending {
            *current = state;
            drop(current);
            self.notify.notify_waiters();
        }
    }

    async fn wait_settled(&self) -> CellState {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let state = *self.state.lock().unwrap();
                if state != CellState::Pending {
                    return state;
                }
            }
            notified.await;
        }
    }
}

struct TrackerInner {
    cells: HashMap<Uuid, Arc<CompletionCell>>,
    /// Completion log, time-ordered; drives both pruning thresholds
    completed: VecDeque<(Uuid, Instant)>,
}

/// Per-item completion signals with expiry-swept bounded memory
pub struct CompletionTracker {
    inner: Mutex<TrackerInner>,
    /// Cells live this long past completion
    grace: Duration,
    /// Completed ids stay recognizable this long past completion
    retention: Duration,
}

impl CompletionTracker {
    pub fn new(grace: Duration, retention: Duration) -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                cells: HashMap::new(),
                completed: VecDeque::new(),
            }),
            grace,
            retention: retention.max(grace),
        }
    }

    /// Register an item the moment it is reserved, before any wait can race
    /// it. Registering an id that already completed leaves the completed
    /// record authoritative.
    pub fn register(&self, id: Uuid) {
        let mut inner = self.inner.lock().unwrap();
        self.sweep(&mut inner, Instant::now());
        if inner.completed.iter().any(|(cid, _)| *cid == id) {
            return;
        }
        inner
            .cells
            .entry(id)
            .or_insert_with(|| Arc::new(CompletionCell::new(CellState::Pending)));
    }

    /// Signal completion, waking all waiters.
    ///
    /// Safe to call for an id that was never registered (the completed log
    /// still answers late waiters).
    pub fn complete(&self, id: Uuid) {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        self.sweep(&mut inner, now);
        if let Some(cell) = inner.cells.get(&id) {
            cell.settle(CellState::Done);
        }
        inner.completed.push_back((id, now));
        debug!(item_id = %id, "Completion signalled");
    }

    /// Release waiters of a cancelled item with `completed = false` and
    /// forget the id.
    pub fn cancel(&self, id: Uuid) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(cell) = inner.cells.remove(&id) {
            cell.settle(CellState::Cancelled);
        }
    }

    /// Block until the item completes or the timeout elapses.
    ///
    /// Timeout is an outcome, not an error: the item keeps its place and the
    /// call may be re-issued. An id whose cell was pruned but whose
    /// completion is still on record reports `completed = true`.
    pub async fn wait(&self, id: Uuid, timeout: Duration) -> Result<bool> {
        let cell = {
            let mut inner = self.inner.lock().unwrap();
            self.sweep(&mut inner, Instant::now());
            match inner.cells.get(&id) {
                Some(cell) => Arc::clone(cell),
                None => {
                    return if inner.completed.iter().any(|(cid, _)| *cid == id) {
                        Ok(true)
                    } else {
                        Err(Error::NotFound(format!("item {}", id)))
                    };
                }
            }
        };

        match tokio::time::timeout(timeout, cell.wait_settled()).await {
            Ok(CellState::Done) => Ok(true),
            Ok(_) => Ok(false),
            Err(_) => Ok(false),
        }
    }

    /// Drop cells past the grace period and log entries past retention.
    /// Lazy: runs at the head of every tracker operation.
    fn sweep(&self, inner: &mut TrackerInner, now: Instant) {
        while let Some((id, at)) = inner.completed.front().copied() {
            if now.duration_since(at) > self.retention {
                inner.completed.pop_front();
                inner.cells.remove(&id);
            } else {
                break;
            }
        }
        for (id, at) in inner.completed.iter() {
            if now.duration_since(*at) > self.grace {
                inner.cells.remove(id);
            } else {
                break;
            }
        }
    }
}

//! Reservation queue
//!
//! The ordered playback queue with a two-phase reserve→fill lifecycle.
//! Sessions reserve a slot *before* generating audio, then fill it when the
//! payload is ready; dispatch strictly follows reservation order within a
//! priority class, so content that takes longer to produce never loses its
//! place.
//!
//! All mutation funnels through one short-lived `std::sync::Mutex`; the lock
//! is never held across an await. `next_ready` is the only operation that
//! suspends, and it suspends only the dispatcher.

use crate::error::{Error, Result};
use crate::queue::announce;
use crate::queue::item::{AudioClip, ItemState, OwnerId, QueueItem};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;
use voxhub_common::api::Priority;

/// How long completed/cancelled ids stay recognizable for precise errors
/// on late fill/cancel calls.
const TERMINAL_ID_RETENTION: Duration = Duration::from_secs(60);

/// Result of a successful reserve or enqueue
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: Uuid,
    /// 1-based position in dispatch order at reservation time
    pub position: usize,
    pub should_announce: bool,
}

/// A filled item handed to the dispatcher, now in state `Playing`
#[derive(Debug, Clone)]
pub struct ActiveItem {
    pub id: Uuid,
    pub owner: OwnerId,
    pub display_name: String,
    pub priority: Priority,
    pub clip: AudioClip,
}

/// Outcome of `next_ready`
#[derive(Debug)]
pub enum NextItem {
    /// Head of the queue is filled; it has been marked `Playing`
    Ready(ActiveItem),
    /// An unfilled reservation sat at the head past its TTL and was
    /// auto-cancelled; the caller should release its completion waiters
    Expired(Uuid),
    /// The queue was closed for shutdown
    Closed,
}

/// Read-only queue counters for /status
#[derive(Debug, Clone)]
pub struct QueueSnapshot {
    /// Items waiting to play (reserved or filled, excluding playing)
    pub queue_length: usize,
    /// Reserved items still awaiting their payload
    pub pending_reservations: usize,
    pub total_enqueued: u64,
    pub total_played: u64,
    /// Rough wait estimate from the filled clips ahead in the queue
    pub estimated_wait_ms: u64,
}

struct Inner {
    items: Vec<QueueItem>,
    next_seq: u64,
    closed: bool,
    total_enqueued: u64,
    total_played: u64,
    /// Recently completed/cancelled ids, for precise late-call errors
    recent_terminal: VecDeque<(Uuid, ItemState, Instant)>,
}

impl Inner {
    fn find(&self, id: Uuid) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    fn pending_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_pending()).count()
    }

    /// Index of the pending item that plays next, by dispatch key
    fn head_index(&self) -> Option<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, i)| i.is_pending())
            .min_by_key(|(_, i)| i.dispatch_key())
            .map(|(idx, _)| idx)
    }

    /// 1-based dispatch position a new item with `key` would get
    fn position_for(&self, key: (u8, u64)) -> usize {
        self.items
            .iter()
            .filter(|i| {
                i.state == ItemState::Playing || (i.is_pending() && i.dispatch_key() < key)
            })
            .count()
            + 1
    }

    fn record_terminal(&mut self, id: Uuid, state: ItemState, now: Instant) {
        while let Some((_, _, at)) = self.recent_terminal.front().copied() {
            if now.duration_since(at) > TERMINAL_ID_RETENTION {
                self.recent_terminal.pop_front();
            } else {
                break;
            }
        }
        self.recent_terminal.push_back((id, state, now));
    }

    fn terminal_state(&self, id: Uuid) -> Option<ItemState> {
        self.recent_terminal
            .iter()
            .rev()
            .find(|(tid, _, _)| *tid == id)
            .map(|(_, state, _)| *state)
    }
}

/// Ordered playback queue with reserve→fill lifecycle and a priority lane
pub struct ReservationQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    max_pending: usize,
    reservation_ttl: Duration,
}

impl ReservationQueue {
    pub fn new(max_pending: usize, reservation_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: Vec::new(),
                next_seq: 0,
                closed: false,
                total_enqueued: 0,
                total_played: 0,
                recent_terminal: VecDeque::new(),
            }),
            notify: Notify::new(),
            max_pending,
            reservation_ttl,
        }
    }

    /// Reserve a queue slot before the audio exists.
    ///
    /// The announcement decision is made here, against the queue as it
    /// stands, and frozen on the item.
    pub fn reserve(
        &self,
        owner: OwnerId,
        display_name: String,
        priority: Priority,
    ) -> Result<Reservation> {
        let reservation = self.insert(owner, display_name, priority, None)?;
        debug!(item_id = %reservation.id, position = reservation.position, "Reserved queue slot");
        Ok(reservation)
    }

    /// Reserve and fill in one atomic step, for callers that already have
    /// their audio.
    pub fn enqueue(
        &self,
        owner: OwnerId,
        display_name: String,
        priority: Priority,
        clip: AudioClip,
    ) -> Result<Reservation> {
        let reservation = self.insert(owner, display_name, priority, Some(clip))?;
        debug!(item_id = %reservation.id, position = reservation.position, "Enqueued filled item");
        Ok(reservation)
    }

    fn insert(
        &self,
        owner: OwnerId,
        display_name: String,
        priority: Priority,
        clip: Option<AudioClip>,
    ) -> Result<Reservation> {
        let mut inner = self.inner.lock().unwrap();

        if inner.closed {
            return Err(Error::ShuttingDown);
        }
        if inner.pending_count() >= self.max_pending {
            return Err(Error::ResourceExhausted(format!(
                "queue is full ({} pending items)",
                self.max_pending
            )));
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let key = (priority.rank(), seq);

        let should_announce = announce::decide(&owner, key, &inner.items);
        let position = inner.position_for(key);
        let now = Instant::now();
        let filled = clip.is_some();

        let item = QueueItem {
            id: Uuid::new_v4(),
            owner,
            display_name,
            priority,
            seq,
            state: if filled {
                ItemState::Filled
            } else {
                ItemState::Reserved
            },
            clip,
            reserved_at: now,
            filled_at: filled.then_some(now),
            should_announce,
        };
        let id = item.id;

        inner.items.push(item);
        inner.total_enqueued += 1;
        drop(inner);

        // Wake the dispatcher: the head (or its TTL deadline) may have changed
        self.notify.notify_waiters();

        Ok(Reservation {
            id,
            position,
            should_announce,
        })
    }

    /// Attach the audio payload to a reserved slot.
    pub fn fill(&self, id: Uuid, clip: AudioClip) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();

        let Some(idx) = inner.find(id) else {
            return match inner.terminal_state(id) {
                Some(state) => Err(Error::InvalidState(format!("item {} is {}", id, state))),
                None => Err(Error::NotFound(format!("item {}", id))),
            };
        };

        let item = &mut inner.items[idx];
        match item.state {
            ItemState::Reserved => {
                item.clip = Some(clip);
                item.state = ItemState::Filled;
                item.filled_at = Some(Instant::now());
                drop(inner);
                self.notify.notify_waiters();
                Ok(())
            }
            state => Err(Error::InvalidState(format!("item {} is {}", id, state))),
        }
    }

    /// Remove a not-yet-playing item.
    pub fn cancel(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();

        let Some(idx) = inner.find(id) else {
            return match inner.terminal_state(id) {
                Some(ItemState::Completed) => {
                    Err(Error::AlreadyStarted(format!("item {} already played", id)))
                }
                Some(state) => Err(Error::InvalidState(format!("item {} is {}", id, state))),
                None => Err(Error::NotFound(format!("item {}", id))),
            };
        };

        match inner.items[idx].state {
            ItemState::Reserved | ItemState::Filled => {
                inner.items.remove(idx);
                inner.record_terminal(id, ItemState::Cancelled, Instant::now());
                drop(inner);
                self.notify.notify_waiters();
                info!(item_id = %id, "Cancelled queue item");
                Ok(())
            }
            _ => Err(Error::AlreadyStarted(format!(
                "item {} playback already began",
                id
            ))),
        }
    }

    /// Cancel every pending item; the in-flight clip keeps playing.
    ///
    /// With `owner` set, only that owner's items are removed. Returns the
    /// cancelled ids so the caller can release their completion waiters.
    pub fn clear_pending(&self, owner: Option<&OwnerId>) -> Vec<Uuid> {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();

        let mut cancelled = Vec::new();
        inner.items.retain(|item| {
            let drop_it =
                item.is_pending() && owner.map_or(true, |o| item.owner == *o);
            if drop_it {
                cancelled.push(item.id);
            }
            !drop_it
        });
        for id in &cancelled {
            inner.record_terminal(*id, ItemState::Cancelled, now);
        }
        drop(inner);

        if !cancelled.is_empty() {
            self.notify.notify_waiters();
            info!(count = cancelled.len(), "Cleared pending queue items");
        }
        cancelled
    }

    /// Wait for the head of the queue to become playable.
    ///
    /// This is the only suspension point in the queue. It resolves once the
    /// head item of the priority-ordered queue is filled (marking it
    /// `Playing`), when an unfilled head outlives its TTL, or when the queue
    /// is closed. Fill completion order never reorders dispatch.
    pub async fn next_ready(&self) -> NextItem {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            enum Step {
                Ready(ActiveItem),
                Expired(Uuid),
                Closed,
                Wait(Option<Instant>),
            }

            let step = {
                let mut inner = self.inner.lock().unwrap();
                if inner.closed {
                    Step::Closed
                } else {
                    match inner.head_index() {
                        None => Step::Wait(None),
                        Some(idx) => {
                            let deadline = inner.items[idx].reserved_at + self.reservation_ttl;
                            match inner.items[idx].state {
                                ItemState::Filled => {
                                    let item = &mut inner.items[idx];
                                    item.state = ItemState::Playing;
                                    // clip is present in every Filled item
                                    let clip = item.clip.clone().expect("filled item has clip");
                                    Step::Ready(ActiveItem {
                                        id: item.id,
                                        owner: item.owner.clone(),
                                        display_name: item.display_name.clone(),
                                        priority: item.priority,
                                        clip,
                                    })
                                }
                                ItemState::Reserved if Instant::now() >= deadline => {
                                    let id = inner.items[idx].id;
                                    inner.items.remove(idx);
                                    inner.record_terminal(
                                        id,
                                        ItemState::Cancelled,
                                        Instant::now(),
                                    );
                                    Step::Expired(id)
                                }
                                _ => Step::Wait(Some(deadline)),
                            }
                        }
                    }
                }
            };

            match step {
                Step::Ready(item) => {
                    debug!(item_id = %item.id, owner = %item.owner, "Dispatching queue item");
                    return NextItem::Ready(item);
                }
                Step::Expired(id) => {
                    warn!(item_id = %id, "Reservation expired unfilled, auto-cancelling");
                    return NextItem::Expired(id);
                }
                Step::Closed => return NextItem::Closed,
                Step::Wait(deadline) => match deadline {
                    Some(deadline) => {
                        tokio::select! {
                            _ = &mut notified => {}
                            _ = tokio::time::sleep_until(deadline) => {}
                        }
                    }
                    None => notified.await,
                },
            }
        }
    }

    /// Mark the playing item completed and drop it from the queue.
    ///
    /// Returns false when the item is gone already (e.g. racing a stop at
    /// shutdown), which is harmless.
    pub fn mark_completed(&self, id: Uuid) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let Some(idx) = inner.find(id) else {
            return false;
        };
        if inner.items[idx].state != ItemState::Playing {
            return false;
        }
        inner.items.remove(idx);
        inner.total_played += 1;
        inner.record_terminal(id, ItemState::Completed, Instant::now());
        drop(inner);
        self.notify.notify_waiters();
        true
    }

    /// Refuse new reservations and wake the dispatcher for shutdown.
    pub fn close(&self) {
        self.inner.lock().unwrap().closed = true;
        self.notify.notify_waiters();
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let inner = self.inner.lock().unwrap();
        let estimated_wait_ms = inner
            .items
            .iter()
            .filter(|i| i.is_pending())
            .filter_map(|i| i.clip.as_ref())
            .map(|c| c.duration().as_millis() as u64)
            .sum();

        QueueSnapshot {
            queue_length: inner.pending_count(),
            pending_reservations: inner
                .items
                .iter()
                .filter(|i| i.state == ItemState::Reserved)
                .count(),
            total_enqueued: inner.total_enqueued,
            total_played: inner.total_played,
            estimated_wait_ms,
        }
    }
}

//! Queue item model
//!
//! An item moves through `Reserved → Filled → Playing → Completed`;
//! `Cancelled` is terminal and only reachable before `Playing`. The
//! reservation queue is the sole owner of these records.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;
use voxhub_common::api::Priority;

/// Identity of a submitting session.
///
/// Distinguishes concurrently running instances of the same logical project;
/// the human-readable display name is carried separately and never used for
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decoded audio payload: 16-bit mono samples plus their rate.
///
/// Samples sit behind an `Arc` so handing a clip to the player never copies
/// the buffer.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Arc<[i16]>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Item lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Reserved,
    Filled,
    Playing,
    Completed,
    Cancelled,
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemState::Reserved => "reserved",
            ItemState::Filled => "filled",
            ItemState::Playing => "playing",
            ItemState::Completed => "completed",
            ItemState::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// One slot in the reservation queue
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: Uuid,
    pub owner: OwnerId,
    pub display_name: String,
    pub priority: Priority,
    /// Monotonic reservation counter; fixes FIFO order within a class
    pub seq: u64,
    pub state: ItemState,
    /// Absent until the item is filled
    pub clip: Option<AudioClip>,
    pub reserved_at: Instant,
    pub filled_at: Option<Instant>,
    /// Decided once at reservation time, immutable afterward
    pub should_announce: bool,
}

impl QueueItem {
    /// Dispatch ordering key: high priority first, then reservation order.
    pub fn dispatch_key(&self) -> (u8, u64) {
        (self.priority.rank(), self.seq)
    }

    /// Still waiting to play (reserved or filled)
    pub fn is_pending(&self) -> bool {
        matches!(self.state, ItemState::Reserved | ItemState::Filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_duration() {
        let clip = AudioClip::new(vec![0; 24_000], 24_000);
        assert_eq!(clip.duration(), Duration::from_secs(1));

        let empty = AudioClip::new(vec![], 24_000);
        assert_eq!(empty.duration(), Duration::ZERO);
    }

    #[test]
    fn test_dispatch_key_orders_high_before_normal() {
        let mk = |priority, seq| QueueItem {
            id: Uuid::new_v4(),
            owner: OwnerId::new("a"),
            display_name: String::new(),
            priority,
            seq,
            state: ItemState::Reserved,
            clip: None,
            reserved_at: Instant::now(),
            filled_at: None,
            should_announce: false,
        };

        // A high item reserved later still dispatches first
        let normal = mk(Priority::Normal, 1);
        let high = mk(Priority::High, 2);
        assert!(high.dispatch_key() < normal.dispatch_key());

        // Within a class, reservation order wins
        let first = mk(Priority::Normal, 3);
        let second = mk(Priority::Normal, 4);
        assert!(first.dispatch_key() < second.dispatch_key());
    }
}

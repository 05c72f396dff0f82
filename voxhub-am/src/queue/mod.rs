//! Playback queue coordination
//!
//! The reservation queue and its supporting policies: announcement
//! decisions, chime rate limiting, and completion tracking.

pub mod announce;
pub mod chime;
pub mod item;
pub mod reservation;
pub mod tracker;

pub use chime::{ChimeDecision, ChimeLimiter};
pub use item::{AudioClip, ItemState, OwnerId, QueueItem};
pub use reservation::{ActiveItem, NextItem, QueueSnapshot, Reservation, ReservationQueue};
pub use tracker::CompletionTracker;

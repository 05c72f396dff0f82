//! Event types for the VoxHub event stream
//!
//! Broadcast by the daemon and surfaced to clients over SSE.

use crate::api::Priority;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Daemon event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A queue item started playing
    PlaybackStarted {
        item_id: Uuid,
        owner_id: String,
        display_name: String,
        priority: Priority,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A queue item finished playing
    PlaybackCompleted {
        item_id: Uuid,
        /// false when the clip was stopped or the device failed mid-clip
        finished: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue contents changed (reserve, fill, cancel, clear)
    QueueChanged {
        queue_length: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Pause state changed
    PausedChanged {
        paused: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl Event {
    /// Event type name used as the SSE `event:` field
    pub fn type_str(&self) -> &'static str {
        match self {
            Event::PlaybackStarted { .. } => "PlaybackStarted",
            Event::PlaybackCompleted { .. } => "PlaybackCompleted",
            Event::QueueChanged { .. } => "QueueChanged",
            Event::PausedChanged { .. } => "PausedChanged",
        }
    }
}

//! Shared daemon state
//!
//! Thread-safe state shared between the dispatcher and the HTTP surface:
//! the currently playing item summary, the event broadcaster, and uptime.

use std::time::Instant;
use tokio::sync::{broadcast, RwLock};
use voxhub_common::api::PlayingItemInfo;
use voxhub_common::events::Event;

/// Shared state accessible by all components
pub struct SharedState {
    /// Currently playing item (None when the device is idle)
    current: RwLock<Option<PlayingItemInfo>>,

    /// Event broadcaster for SSE listeners
    event_tx: broadcast::Sender<Event>,

    started_at: Instant,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            current: RwLock::new(None),
            event_tx,
            started_at: Instant::now(),
        }
    }

    /// Broadcast an event to all SSE listeners; no receivers is fine.
    pub fn broadcast_event(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    pub async fn current_item(&self) -> Option<PlayingItemInfo> {
        self.current.read().await.clone()
    }

    pub async fn set_current_item(&self, item: Option<PlayingItemInfo>) {
        *self.current.write().await = item;
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use voxhub_common::api::Priority;

    #[tokio::test]
    async fn test_current_item_round_trip() {
        let state = SharedState::new();
        assert!(state.current_item().await.is_none());

        let info = PlayingItemInfo {
            item_id: Uuid::new_v4(),
            owner_id: "proj:1".to_string(),
            display_name: "proj".to_string(),
            priority: Priority::Normal,
        };
        state.set_current_item(Some(info.clone())).await;
        assert_eq!(state.current_item().await.unwrap().item_id, info.item_id);

        state.set_current_item(None).await;
        assert!(state.current_item().await.is_none());
    }

    #[tokio::test]
    async fn test_events_reach_subscribers() {
        let state = SharedState::new();
        let mut rx = state.subscribe_events();

        state.broadcast_event(Event::PausedChanged {
            paused: true,
            timestamp: chrono::Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.type_str(), "PausedChanged");
    }
}

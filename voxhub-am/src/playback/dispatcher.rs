//! Playback dispatcher
//!
//! The single control loop that pulls the next ready item from the
//! reservation queue, hands it to the audio sink, and advances on
//! completion. It is the only writer of the `Playing` and `Completed`
//! transitions, which keeps cross-item locking down to the queue's own
//! mutation lock.

use crate::playback::AudioSink;
use crate::queue::{ActiveItem, CompletionTracker, NextItem, ReservationQueue};
use crate::state::SharedState;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};
use voxhub_common::api::PlayingItemInfo;
use voxhub_common::events::Event;

pub struct Dispatcher {
    queue: Arc<ReservationQueue>,
    tracker: Arc<CompletionTracker>,
    sink: Arc<dyn AudioSink>,
    state: Arc<SharedState>,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<ReservationQueue>,
        tracker: Arc<CompletionTracker>,
        sink: Arc<dyn AudioSink>,
        state: Arc<SharedState>,
    ) -> Self {
        Self {
            queue,
            tracker,
            sink,
            state,
        }
    }

    /// Run until the queue closes or the shutdown signal fires.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Dispatch loop started");

        loop {
            let next = tokio::select! {
                _ = shutdown.changed() => break,
                next = self.queue.next_ready() => next,
            };

            match next {
                NextItem::Ready(item) => self.play_item(item).await,
                NextItem::Expired(id) => {
                    // Unfilled reservation timed out; release its waiters
                    self.tracker.cancel(id);
                    self.state.broadcast_event(Event::QueueChanged {
                        queue_length: self.queue.snapshot().queue_length,
                        timestamp: chrono::Utc::now(),
                    });
                }
                NextItem::Closed => break,
            }
        }

        info!("Dispatch loop stopped");
    }

    async fn play_item(&self, item: ActiveItem) {
        info!(
            item_id = %item.id,
            owner = %item.owner,
            priority = %item.priority,
            duration_ms = item.clip.duration().as_millis() as u64,
            "Playing queue item"
        );

        self.state
            .set_current_item(Some(PlayingItemInfo {
                item_id: item.id,
                owner_id: item.owner.to_string(),
                display_name: item.display_name.clone(),
                priority: item.priority,
            }))
            .await;
        self.state.broadcast_event(Event::PlaybackStarted {
            item_id: item.id,
            owner_id: item.owner.to_string(),
            display_name: item.display_name.clone(),
            priority: item.priority,
            timestamp: chrono::Utc::now(),
        });

        let finished = match self.sink.play(item.clip.clone()).await {
            Ok(outcome) => {
                debug!(
                    item_id = %item.id,
                    finished = outcome.finished,
                    played_ms = outcome.played.as_millis() as u64,
                    "Playback ended"
                );
                outcome.finished
            }
            Err(e) => {
                // Device errors stay here: the item still completes so the
                // queue is never wedged by one failing clip.
                error!(item_id = %item.id, "Playback failed: {}", e);
                false
            }
        };

        self.queue.mark_completed(item.id);
        self.tracker.complete(item.id);
        self.state.set_current_item(None).await;
        self.state.broadcast_event(Event::PlaybackCompleted {
            item_id: item.id,
            finished,
            timestamp: chrono::Utc::now(),
        });
    }
}

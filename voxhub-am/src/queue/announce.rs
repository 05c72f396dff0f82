//! Cross-session announcement policy
//!
//! A clip gets an announcement prefix when audio from a *different* session
//! is currently audible or queued ahead of it, so listeners can tell whose
//! output they are hearing. A session's own back-to-back messages never
//! trigger one. The decision is made once, at reservation time, and frozen
//! on the item.

use crate::queue::item::{ItemState, OwnerId, QueueItem};

/// Decide whether a new reservation for `owner` needs an announcement.
///
/// `candidate_key` is the dispatch key the new item will receive; anything
/// currently playing, or pending with a smaller key, plays before it.
pub fn decide(owner: &OwnerId, candidate_key: (u8, u64), items: &[QueueItem]) -> bool {
    items
        .iter()
        .filter(|item| {
            item.state == ItemState::Playing
                || (item.is_pending() && item.dispatch_key() < candidate_key)
        })
        .any(|item| item.owner != *owner)
}

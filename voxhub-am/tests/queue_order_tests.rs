//! Queue ordering properties
//!
//! Exercises the reservation queue directly: dispatch order under variable
//! fill latency, the priority lane, announcement decisions, and the
//! reservation TTL.

mod support;

use std::sync::Arc;
use std::time::Duration;
use support::clip_ms;
use voxhub_am::queue::{NextItem, OwnerId, ReservationQueue};
use voxhub_common::api::Priority;

fn queue() -> Arc<ReservationQueue> {
    Arc::new(ReservationQueue::new(64, Duration::from_secs(30)))
}

async fn next_id(q: &ReservationQueue) -> uuid::Uuid {
    match q.next_ready().await {
        NextItem::Ready(item) => {
            let id = item.id;
            q.mark_completed(id);
            id
        }
        other => panic!("expected ready item, got {:?}", other),
    }
}

/// Reserve A then B; fill B immediately and A only after five times as
/// long. A must still play first: fill latency never reorders dispatch.
#[tokio::test(start_paused = true)]
async fn test_slow_fill_keeps_its_place() {
    let q = queue();
    let a = q
        .reserve(OwnerId::new("a"), "a".into(), Priority::Normal)
        .unwrap();
    let b = q
        .reserve(OwnerId::new("b"), "b".into(), Priority::Normal)
        .unwrap();

    q.fill(b.id, clip_ms(50)).unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    q.fill(a.id, clip_ms(50)).unwrap();

    assert_eq!(next_id(&q).await, a.id);
    assert_eq!(next_id(&q).await, b.id);
}

/// Concurrent sessions reserving and filling in arbitrary interleavings
/// still play back in reservation order within the class.
#[tokio::test(start_paused = true)]
async fn test_concurrent_owners_fifo() {
    let q = queue();

    let mut reserved = Vec::new();
    for i in 0..10 {
        let owner = format!("owner-{}", i % 3);
        let r = q
            .reserve(OwnerId::new(owner.clone()), owner, Priority::Normal)
            .unwrap();
        reserved.push(r.id);
    }

    // Fill in reverse order, staggered, from separate tasks
    let mut fillers = Vec::new();
    for (i, id) in reserved.iter().rev().enumerate() {
        let q = Arc::clone(&q);
        let id = *id;
        fillers.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10 * i as u64)).await;
            q.fill(id, clip_ms(10)).unwrap();
        }));
    }

    let mut played = Vec::new();
    for _ in 0..reserved.len() {
        played.push(next_id(&q).await);
    }
    for f in fillers {
        f.await.unwrap();
    }

    assert_eq!(played, reserved);
}

/// A high item reserved after several normal ones dispatches ahead of all
/// of them, but high items keep FIFO order among themselves.
#[tokio::test]
async fn test_priority_lane_order() {
    let q = queue();
    let n1 = q
        .reserve(OwnerId::new("a"), "a".into(), Priority::Normal)
        .unwrap();
    let n2 = q
        .reserve(OwnerId::new("a"), "a".into(), Priority::Normal)
        .unwrap();
    let h1 = q
        .reserve(OwnerId::new("b"), "b".into(), Priority::High)
        .unwrap();
    let h2 = q
        .reserve(OwnerId::new("b"), "b".into(), Priority::High)
        .unwrap();

    for r in [&n1, &n2, &h1, &h2] {
        q.fill(r.id, clip_ms(10)).unwrap();
    }

    assert_eq!(next_id(&q).await, h1.id);
    assert_eq!(next_id(&q).await, h2.id);
    assert_eq!(next_id(&q).await, n1.id);
    assert_eq!(next_id(&q).await, n2.id);
}

/// Announcement decisions at reservation time: own audio never triggers
/// one, foreign audio playing or queued ahead does.
#[tokio::test]
async fn test_announcement_against_playing_item() {
    let q = queue();

    // Owner x's clip reaches the device
    let first = q
        .reserve(OwnerId::new("x"), "x".into(), Priority::Normal)
        .unwrap();
    q.fill(first.id, clip_ms(100)).unwrap();
    let NextItem::Ready(active) = q.next_ready().await else {
        panic!("expected ready item");
    };

    // x reserving behind its own playing audio: no announcement
    let own = q
        .reserve(OwnerId::new("x"), "x".into(), Priority::Normal)
        .unwrap();
    assert!(!own.should_announce);

    // y reserving while x's audio plays: announcement
    let foreign = q
        .reserve(OwnerId::new("y"), "y".into(), Priority::Normal)
        .unwrap();
    assert!(foreign.should_announce);

    // x reserving again with y queued ahead: announcement
    let behind_foreign = q
        .reserve(OwnerId::new("x"), "x".into(), Priority::Normal)
        .unwrap();
    assert!(behind_foreign.should_announce);

    q.mark_completed(active.id);
}

/// An unfilled reservation at the head expires after the TTL instead of
/// blocking the queue forever.
#[tokio::test(start_paused = true)]
async fn test_reservation_ttl_frees_the_queue() {
    let q = Arc::new(ReservationQueue::new(64, Duration::from_secs(30)));
    let abandoned = q
        .reserve(OwnerId::new("gone"), "gone".into(), Priority::Normal)
        .unwrap();
    let live = q
        .reserve(OwnerId::new("here"), "here".into(), Priority::Normal)
        .unwrap();
    q.fill(live.id, clip_ms(10)).unwrap();

    tokio::time::advance(Duration::from_secs(31)).await;

    match q.next_ready().await {
        NextItem::Expired(id) => assert_eq!(id, abandoned.id),
        other => panic!("expected expiry, got {:?}", other),
    }
    assert_eq!(next_id(&q).await, live.id);
}

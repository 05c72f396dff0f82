//! Shared test support: a timing-faithful fake audio sink and harness
//! builders for exercising the coordination paths without audio hardware.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use voxhub_am::config::Config;
use voxhub_am::error::Result;
use voxhub_am::playback::{AudioSink, Dispatcher, PlayOutcome};
use voxhub_am::queue::{AudioClip, ChimeLimiter, CompletionTracker, ReservationQueue};
use voxhub_am::state::SharedState;

/// Fake sink that "plays" a clip for its real duration, honouring the
/// sticky pause flag and stop requests, and records the maximum number of
/// clips ever active at once.
pub struct FakeSink {
    paused: AtomicBool,
    stop_flag: Mutex<Option<Arc<AtomicBool>>>,
    active: AtomicUsize,
    pub max_concurrent: AtomicUsize,
}

impl FakeSink {
    pub fn new() -> Self {
        Self {
            paused: AtomicBool::new(false),
            stop_flag: Mutex::new(None),
            active: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AudioSink for FakeSink {
    async fn play(&self, clip: AudioClip) -> Result<PlayOutcome> {
        let stop = Arc::new(AtomicBool::new(false));
        *self.stop_flag.lock().unwrap() = Some(Arc::clone(&stop));

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now_active, Ordering::SeqCst);

        let total = clip.duration();
        let tick = Duration::from_millis(5);
        let mut played = Duration::ZERO;
        let finished = loop {
            if stop.load(Ordering::SeqCst) {
                break false;
            }
            if played >= total {
                break true;
            }
            if !self.paused.load(Ordering::SeqCst) {
                played += tick;
            }
            tokio::time::sleep(tick).await;
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        *self.stop_flag.lock().unwrap() = None;

        Ok(PlayOutcome { finished, played })
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn stop(&self) -> bool {
        match self.stop_flag.lock().unwrap().as_ref() {
            Some(stop) => {
                stop.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn is_playing(&self) -> bool {
        self.active.load(Ordering::SeqCst) > 0
    }
}

/// A clip of the given duration at 24kHz
pub fn clip_ms(ms: u64) -> AudioClip {
    AudioClip::new(vec![0; (24 * ms) as usize], 24_000)
}

/// Everything the coordination tests need, wired the way main() wires it
pub struct Harness {
    pub queue: Arc<ReservationQueue>,
    pub tracker: Arc<CompletionTracker>,
    pub sink: Arc<FakeSink>,
    pub chime: Arc<ChimeLimiter>,
    pub state: Arc<SharedState>,
    pub config: Arc<Config>,
    pub shutdown: watch::Sender<bool>,
}

pub fn start_harness() -> Harness {
    let config = Arc::new(Config::default());
    let queue = Arc::new(ReservationQueue::new(
        config.queue.max_pending,
        config.reservation_ttl(),
    ));
    let tracker = Arc::new(CompletionTracker::new(
        config.tracker_grace(),
        config.completed_retention(),
    ));
    let chime = Arc::new(ChimeLimiter::new(config.chime_cooldown()));
    let sink = Arc::new(FakeSink::new());
    let state = Arc::new(SharedState::new());

    let (shutdown, shutdown_rx) = watch::channel(false);
    let dispatcher = Dispatcher::new(
        Arc::clone(&queue),
        Arc::clone(&tracker),
        Arc::clone(&sink) as Arc<dyn AudioSink>,
        Arc::clone(&state),
    );
    tokio::spawn(dispatcher.run(shutdown_rx));

    Harness {
        queue,
        tracker,
        sink,
        chime,
        state,
        config,
        shutdown,
    }
}

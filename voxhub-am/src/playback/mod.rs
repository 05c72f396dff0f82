//! Playback pipeline
//!
//! The `AudioSink` port decouples the dispatcher from the output device so
//! the coordination logic can be exercised without audio hardware. The real
//! implementation is [`player::CpalPlayer`].

pub mod cursor;
pub mod dispatcher;
pub mod player;
pub mod resample;

use crate::error::Result;
use crate::queue::AudioClip;
use async_trait::async_trait;
use std::time::Duration;

pub use dispatcher::Dispatcher;
pub use player::CpalPlayer;

/// How a playback attempt ended
#[derive(Debug, Clone, Copy)]
pub struct PlayOutcome {
    /// true when the clip ran to its natural end; false on stop or device
    /// failure
    pub finished: bool,
    /// Wall-clock time the clip occupied the device
    pub played: Duration,
}

/// Output-device port.
///
/// `play` blocks until the clip ends (or is stopped) and is only ever called
/// by the dispatcher, one clip at a time. The pause flag is sticky: pausing
/// while idle makes the *next* clip start silent until resumed.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, clip: AudioClip) -> Result<PlayOutcome>;

    /// Set the paused flag, whether or not a clip is active.
    fn pause(&self);

    /// Clear the paused flag, whether or not a clip is active.
    fn resume(&self);

    /// Stop the in-flight clip, discarding its remaining samples.
    /// Returns false when nothing was playing.
    fn stop(&self) -> bool;

    fn is_paused(&self) -> bool;

    fn is_playing(&self) -> bool;
}

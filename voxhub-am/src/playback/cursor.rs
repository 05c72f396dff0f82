//! Clip cursor
//!
//! Feeds device buffers from a prepared sample vector. The device callback
//! pulls; the cursor never blocks. While the paused flag is set it emits
//! silence without consuming samples, so a pause raised before the stream
//! even started simply holds the clip at its first sample.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Streaming,
    Finished,
}

/// Pull-model sample source for one clip, mono fan-out to N channels
pub struct ClipCursor {
    samples: Vec<f32>,
    pos: usize,
    paused: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl ClipCursor {
    pub fn new(samples: Vec<f32>, paused: Arc<AtomicBool>, stop: Arc<AtomicBool>) -> Self {
        Self {
            samples,
            pos: 0,
            paused,
            stop,
        }
    }

    /// Fill an interleaved output buffer. Returns `Finished` once the clip
    /// is exhausted or stopped; later calls keep emitting silence.
    pub fn fill(&mut self, out: &mut [f32], channels: usize) -> CursorState {
        if self.stop.load(Ordering::SeqCst) {
            out.fill(0.0);
            return CursorState::Finished;
        }

        if self.paused.load(Ordering::SeqCst) {
            out.fill(0.0);
            return CursorState::Streaming;
        }

        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            let sample = self.samples.get(self.pos).copied().unwrap_or(0.0);
            if self.pos < self.samples.len() {
                self.pos += 1;
            }
            for slot in frame.iter_mut() {
                *slot = sample;
            }
        }

        if self.pos >= self.samples.len() {
            CursorState::Finished
        } else {
            CursorState::Streaming
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> (Arc<AtomicBool>, Arc<AtomicBool>) {
        (
            Arc::new(AtomicBool::new(false)),
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[test]
    fn test_fills_and_finishes() {
        let (paused, stop) = flags();
        let mut cursor = ClipCursor::new(vec![0.5; 6], paused, stop);

        let mut buf = [0.0f32; 4];
        assert_eq!(cursor.fill(&mut buf, 1), CursorState::Streaming);
        assert_eq!(buf, [0.5; 4]);

        assert_eq!(cursor.fill(&mut buf, 1), CursorState::Finished);
        // Last two real samples, then padding silence
        assert_eq!(buf, [0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_mono_fan_out_to_stereo() {
        let (paused, stop) = flags();
        let mut cursor = ClipCursor::new(vec![0.1, 0.2], paused, stop);

        let mut buf = [0.0f32; 4];
        assert_eq!(cursor.fill(&mut buf, 2), CursorState::Finished);
        assert_eq!(buf, [0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_pause_emits_silence_without_consuming() {
        let (paused, stop) = flags();
        let mut cursor = ClipCursor::new(vec![0.5; 8], Arc::clone(&paused), stop);

        paused.store(true, Ordering::SeqCst);
        let mut buf = [1.0f32; 4];
        assert_eq!(cursor.fill(&mut buf, 1), CursorState::Streaming);
        assert_eq!(buf, [0.0; 4]);
        assert_eq!(cursor.position(), 0);

        // Resume picks up from the very first sample
        paused.store(false, Ordering::SeqCst);
        cursor.fill(&mut buf, 1);
        assert_eq!(buf, [0.5; 4]);
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_pause_set_before_first_fill_holds_clip() {
        let (paused, stop) = flags();
        paused.store(true, Ordering::SeqCst);
        let mut cursor = ClipCursor::new(vec![0.5; 4], paused, stop);

        let mut buf = [1.0f32; 4];
        for _ in 0..3 {
            assert_eq!(cursor.fill(&mut buf, 1), CursorState::Streaming);
            assert_eq!(buf, [0.0; 4]);
        }
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_stop_finishes_immediately() {
        let (paused, stop) = flags();
        let mut cursor = ClipCursor::new(vec![0.5; 100], paused, Arc::clone(&stop));

        let mut buf = [0.0f32; 4];
        cursor.fill(&mut buf, 1);

        stop.store(true, Ordering::SeqCst);
        assert_eq!(cursor.fill(&mut buf, 1), CursorState::Finished);
        assert_eq!(buf, [0.0; 4]);
    }

    #[test]
    fn test_empty_clip_finishes_at_once() {
        let (paused, stop) = flags();
        let mut cursor = ClipCursor::new(vec![], paused, stop);
        let mut buf = [1.0f32; 2];
        assert_eq!(cursor.fill(&mut buf, 1), CursorState::Finished);
        assert_eq!(buf, [0.0; 2]);
    }
}

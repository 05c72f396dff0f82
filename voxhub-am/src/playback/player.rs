//! Audio output using cpal
//!
//! Plays one clip at a time on the system output device. Each clip gets its
//! own stream, created and driven entirely on a blocking thread; the stream
//! handle lives on that thread until the completion gate has fired, so the
//! device resources stay pinned for the whole asynchronous playback and are
//! never released early.

use crate::error::{Error, Result};
use crate::playback::cursor::{ClipCursor, CursorState};
use crate::playback::{resample, AudioSink, PlayOutcome};
use crate::queue::AudioClip;
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Idempotent completion signal shared between the audio callback, the
/// driving thread, and `stop()`. Fires exactly once per clip.
struct CompletionGate {
    done: Mutex<bool>,
    cv: Condvar,
}

impl CompletionGate {
    fn new() -> Self {
        Self {
            done: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    fn signal(&self) {
        let mut done = self.done.lock().unwrap();
        if !*done {
            *done = true;
            self.cv.notify_all();
        }
    }

    /// Wait up to `timeout`; true once the gate has fired.
    fn wait_for(&self, timeout: Duration) -> bool {
        let done = self.done.lock().unwrap();
        if *done {
            return true;
        }
        let (done, _) = self.cv.wait_timeout(done, timeout).unwrap();
        *done
    }
}

#[derive(Clone)]
struct ActiveHandle {
    stop: Arc<AtomicBool>,
    gate: Arc<CompletionGate>,
}

/// cpal-backed implementation of the [`AudioSink`] port
pub struct CpalPlayer {
    /// Sticky pause flag, set/cleared unconditionally so a pause raised
    /// before a clip starts still takes effect
    paused: Arc<AtomicBool>,
    active: Mutex<Option<ActiveHandle>>,
    device_name: Option<String>,
}

impl CpalPlayer {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            paused: Arc::new(AtomicBool::new(false)),
            active: Mutex::new(None),
            device_name,
        }
    }
}

#[async_trait]
impl AudioSink for CpalPlayer {
    async fn play(&self, clip: AudioClip) -> Result<PlayOutcome> {
        let handle = ActiveHandle {
            stop: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(CompletionGate::new()),
        };

        {
            let mut active = self.active.lock().unwrap();
            if active.is_some() {
                return Err(Error::InvalidState(
                    "player already has an active clip".to_string(),
                ));
            }
            *active = Some(handle.clone());
        }

        let paused = Arc::clone(&self.paused);
        let device_name = self.device_name.clone();
        let result = tokio::task::spawn_blocking(move || {
            run_clip(clip, device_name, paused, handle.stop, handle.gate)
        })
        .await;

        self.active.lock().unwrap().take();

        match result {
            Ok(outcome) => outcome,
            Err(e) => Err(Error::Internal(format!("playback task failed: {}", e))),
        }
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        debug!("Paused state set");
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        debug!("Paused state cleared");
    }

    fn stop(&self) -> bool {
        let handle = self.active.lock().unwrap().clone();
        match handle {
            Some(handle) => {
                handle.stop.store(true, Ordering::SeqCst);
                handle.gate.signal();
                info!("Stopping current playback");
                true
            }
            None => false,
        }
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn is_playing(&self) -> bool {
        self.active.lock().unwrap().is_some()
    }
}

/// Open the device, stream the clip, and block until it completes.
///
/// Runs on a blocking thread; the `Stream` never leaves it.
fn run_clip(
    clip: AudioClip,
    device_name: Option<String>,
    paused: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    gate: Arc<CompletionGate>,
) -> Result<PlayOutcome> {
    let device = open_device(device_name)?;

    let supported = device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("failed to get device config: {}", e)))?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.config();
    let out_rate = config.sample_rate.0;
    let channels = config.channels as usize;

    debug!(
        "Audio config: sample_rate={}, channels={}, format={:?}",
        out_rate, channels, sample_format
    );

    // i16 -> f32 once, then one-shot conversion to the device rate
    let mono: Vec<f32> = clip.samples.iter().map(|&s| s as f32 / 32_768.0).collect();
    let samples = resample::to_rate(&mono, clip.sample_rate, out_rate)?;
    let expected = Duration::from_secs_f64(samples.len() as f64 / out_rate as f64);

    let cursor = ClipCursor::new(samples, paused.clone(), Arc::clone(&stop));
    let error_flag = Arc::new(AtomicBool::new(false));

    let stream = build_stream(
        &device,
        &config,
        sample_format,
        cursor,
        channels,
        Arc::clone(&gate),
        Arc::clone(&error_flag),
    )?;

    stream
        .play()
        .map_err(|e| Error::AudioOutput(format!("failed to start stream: {}", e)))?;

    // Drive to completion. Paused time never counts against the progress
    // deadline; a stream that makes no progress while unpaused is abandoned
    // so one broken device cannot wedge the queue.
    let start = std::time::Instant::now();
    let mut active_wait = Duration::ZERO;
    let max_active = expected + Duration::from_secs(5);
    let signalled = loop {
        if gate.wait_for(Duration::from_millis(100)) {
            break true;
        }
        if stop.load(Ordering::SeqCst) {
            break false;
        }
        if paused.load(Ordering::SeqCst) {
            continue;
        }
        active_wait += Duration::from_millis(100);
        if active_wait > max_active {
            error!("Audio stream made no progress, abandoning clip");
            error_flag.store(true, Ordering::SeqCst);
            break false;
        }
    };

    // The stream handle was pinned on this thread for the whole playback;
    // only now may it go.
    drop(stream);
    gate.signal();

    let finished =
        signalled && !stop.load(Ordering::SeqCst) && !error_flag.load(Ordering::SeqCst);
    Ok(PlayOutcome {
        finished,
        played: start.elapsed(),
    })
}

fn open_device(device_name: Option<String>) -> Result<Device> {
    let host = cpal::default_host();
    match device_name {
        Some(name) => {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("failed to enumerate devices: {}", e)))?;
            match devices.find(|d| d.name().ok().as_deref() == Some(name.as_str())) {
                Some(device) => Ok(device),
                None => {
                    warn!("Audio device '{}' not found, falling back to default", name);
                    host.default_output_device().ok_or_else(|| {
                        Error::AudioOutput(format!(
                            "device '{}' not found and no default device available",
                            name
                        ))
                    })
                }
            }
        }
        None => host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("no default output device".to_string())),
    }
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    mut cursor: ClipCursor,
    channels: usize,
    gate: Arc<CompletionGate>,
    error_flag: Arc<AtomicBool>,
) -> Result<Stream> {
    let err_gate = Arc::clone(&gate);
    let err_fn = move |err| {
        error!("Audio stream error: {}", err);
        error_flag.store(true, Ordering::SeqCst);
        err_gate.signal();
    };

    let stream = match sample_format {
        SampleFormat::F32 => device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if cursor.fill(data, channels) == CursorState::Finished {
                        gate.signal();
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("failed to build stream: {}", e)))?,
        SampleFormat::I16 => {
            let mut scratch: Vec<f32> = Vec::new();
            device
                .build_output_stream(
                    config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        scratch.resize(data.len(), 0.0);
                        let state = cursor.fill(&mut scratch, channels);
                        for (dst, src) in data.iter_mut().zip(scratch.iter()) {
                            *dst = (src.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                        }
                        if state == CursorState::Finished {
                            gate.signal();
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| Error::AudioOutput(format!("failed to build stream: {}", e)))?
        }
        other => {
            return Err(Error::AudioOutput(format!(
                "unsupported sample format: {:?}",
                other
            )))
        }
    };

    Ok(stream)
}

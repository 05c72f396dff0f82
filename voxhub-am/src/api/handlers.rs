//! HTTP request handlers
//!
//! Handlers only forward requests to the queue, tracker, player, and chime
//! limiter; none of them mutate coordination state directly.

use crate::api::{error_response, AppContext};
use crate::error::Result;
use crate::queue::{AudioClip, OwnerId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;
use voxhub_common::api::{
    decode_pcm16, CancelResponse, ChimeResponse, ClearRequest, ClearResponse, ErrorBody,
    FillRequest, FillResponse, HealthResponse, PauseResponse, ReserveRequest, ReserveResponse,
    SpeakRequest, SpeakResponse, StatusResponse, StopResponse, WaitResponse,
};
use voxhub_common::events::Event;

type ApiError = (StatusCode, Json<ErrorBody>);

/// GET /health - liveness check
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "voxhub-am".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: ctx.state.uptime_seconds(),
    })
}

/// GET /status - read-only snapshot of player and queue
pub async fn status(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    let snapshot = ctx.queue.snapshot();
    let current = ctx.state.current_item().await;

    Json(StatusResponse {
        playing: current.is_some(),
        paused: ctx.sink.is_paused(),
        current,
        queue_length: snapshot.queue_length,
        pending_reservations: snapshot.pending_reservations,
        total_enqueued: snapshot.total_enqueued,
        total_played: snapshot.total_played,
        estimated_wait_ms: snapshot.estimated_wait_ms,
    })
}

/// POST /reserve - reserve a queue slot before the audio exists
///
/// Call before starting synthesis so the slot keeps its place no matter how
/// long generation takes.
pub async fn reserve(
    State(ctx): State<AppContext>,
    Json(req): Json<ReserveRequest>,
) -> std::result::Result<Json<ReserveResponse>, ApiError> {
    let reservation = ctx
        .queue
        .reserve(OwnerId::new(req.owner_id), req.display_name, req.priority)
        .map_err(error_response)?;

    ctx.tracker.register(reservation.id);
    broadcast_queue_changed(&ctx);

    info!(
        item_id = %reservation.id,
        position = reservation.position,
        should_announce = reservation.should_announce,
        "Reserved queue slot"
    );

    Ok(Json(ReserveResponse {
        item_id: reservation.id,
        position: reservation.position,
        should_announce: reservation.should_announce,
    }))
}

/// POST /fill/:item_id - attach audio to a reserved slot
pub async fn fill(
    State(ctx): State<AppContext>,
    Path(item_id): Path<Uuid>,
    Json(req): Json<FillRequest>,
) -> std::result::Result<Json<FillResponse>, ApiError> {
    let clip = decode_clip(&req.audio_data, req.sample_rate).map_err(error_response)?;

    if let Err(e) = ctx.queue.fill(item_id, clip) {
        warn!(item_id = %item_id, "Fill failed: {}", e);
        return Err(error_response(e));
    }
    broadcast_queue_changed(&ctx);

    info!(item_id = %item_id, "Filled queue slot");
    Ok(Json(FillResponse {
        filled: true,
        item_id,
    }))
}

/// POST /speak - reserve and fill atomically
pub async fn speak(
    State(ctx): State<AppContext>,
    Json(req): Json<SpeakRequest>,
) -> std::result::Result<Json<SpeakResponse>, ApiError> {
    let clip = decode_clip(&req.audio_data, req.sample_rate).map_err(error_response)?;

    let reservation = ctx
        .queue
        .enqueue(
            OwnerId::new(req.owner_id),
            req.display_name,
            req.priority,
            clip,
        )
        .map_err(error_response)?;

    ctx.tracker.register(reservation.id);
    broadcast_queue_changed(&ctx);

    info!(
        item_id = %reservation.id,
        position = reservation.position,
        "Queued audio for playback"
    );

    Ok(Json(SpeakResponse {
        item_id: reservation.id,
        position: reservation.position,
    }))
}

#[derive(Debug, Deserialize)]
pub struct WaitParams {
    /// Timeout in seconds; daemon default applies when absent
    timeout: Option<f64>,
}

/// POST /wait/:item_id - block until the item finishes playing
///
/// Expiry is a defined outcome (`completed = false`), not an error; the
/// item keeps playing and the call may be re-issued.
pub async fn wait(
    State(ctx): State<AppContext>,
    Path(item_id): Path<Uuid>,
    Query(params): Query<WaitParams>,
) -> std::result::Result<Json<WaitResponse>, ApiError> {
    let timeout = params
        .timeout
        .map(|t| Duration::from_secs_f64(t.max(0.0)))
        .unwrap_or_else(|| ctx.config.wait_timeout());

    let completed = ctx
        .tracker
        .wait(item_id, timeout)
        .await
        .map_err(error_response)?;

    if !completed {
        warn!(item_id = %item_id, "Timeout waiting for item");
    }
    Ok(Json(WaitResponse { completed, item_id }))
}

/// POST /cancel/:item_id - release a not-yet-playing reservation
pub async fn cancel(
    State(ctx): State<AppContext>,
    Path(item_id): Path<Uuid>,
) -> std::result::Result<Json<CancelResponse>, ApiError> {
    ctx.queue.cancel(item_id).map_err(error_response)?;
    ctx.tracker.cancel(item_id);
    broadcast_queue_changed(&ctx);

    Ok(Json(CancelResponse {
        cancelled: true,
        item_id,
    }))
}

/// POST /pause - pause playback (sticky, applies to future clips too)
pub async fn pause(State(ctx): State<AppContext>) -> Json<PauseResponse> {
    ctx.sink.pause();
    ctx.state.broadcast_event(Event::PausedChanged {
        paused: true,
        timestamp: chrono::Utc::now(),
    });
    Json(PauseResponse { paused: true })
}

/// POST /resume - clear the paused flag
pub async fn resume(State(ctx): State<AppContext>) -> Json<PauseResponse> {
    ctx.sink.resume();
    ctx.state.broadcast_event(Event::PausedChanged {
        paused: false,
        timestamp: chrono::Utc::now(),
    });
    Json(PauseResponse { paused: false })
}

/// POST /clear - cancel pending items; current playback is unaffected
pub async fn clear(
    State(ctx): State<AppContext>,
    body: Option<Json<ClearRequest>>,
) -> Json<ClearResponse> {
    let owner = body
        .and_then(|Json(req)| req.owner_id)
        .map(OwnerId::new);

    let cancelled = ctx.queue.clear_pending(owner.as_ref());
    for id in &cancelled {
        ctx.tracker.cancel(*id);
    }
    broadcast_queue_changed(&ctx);

    info!(cleared = cancelled.len(), "Cleared pending queue");
    Json(ClearResponse {
        cleared: cancelled.len(),
    })
}

/// POST /stop - stop the clip currently on the device
pub async fn stop(State(ctx): State<AppContext>) -> Json<StopResponse> {
    let stopped = ctx.sink.stop();
    Json(StopResponse { stopped })
}

/// POST /chime-allowed - check and record the shared chime cooldown
///
/// An allowed result starts a new window; callers must only play the chime
/// when `allowed` is true.
pub async fn chime_allowed(State(ctx): State<AppContext>) -> Json<ChimeResponse> {
    let decision = ctx.chime.check();
    Json(ChimeResponse {
        allowed: decision.allowed,
        seconds_remaining: decision.seconds_remaining,
    })
}

fn decode_clip(audio_data: &str, sample_rate: u32) -> Result<AudioClip> {
    if sample_rate == 0 {
        return Err(voxhub_common::Error::InvalidInput(
            "sample_rate must be positive".to_string(),
        )
        .into());
    }
    let samples = decode_pcm16(audio_data)?;
    Ok(AudioClip::new(samples, sample_rate))
}

fn broadcast_queue_changed(ctx: &AppContext) {
    ctx.state.broadcast_event(Event::QueueChanged {
        queue_length: ctx.queue.snapshot().queue_length,
        timestamp: chrono::Utc::now(),
    });
}

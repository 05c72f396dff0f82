//! HTTP control surface for the audio manager
//!
//! External sessions drive the daemon through this API: reserving queue
//! slots, filling them with synthesized audio, waiting for completion, and
//! controlling the player.

pub mod handlers;
pub mod sse;

use crate::config::Config;
use crate::error::Error;
use crate::playback::AudioSink;
use crate::queue::{ChimeLimiter, CompletionTracker, ReservationQueue};
use crate::state::SharedState;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use voxhub_common::api::ErrorBody;

/// Application context shared across handlers
#[derive(Clone)]
pub struct AppContext {
    pub queue: Arc<ReservationQueue>,
    pub tracker: Arc<CompletionTracker>,
    pub sink: Arc<dyn AudioSink>,
    pub chime: Arc<ChimeLimiter>,
    pub state: Arc<SharedState>,
    pub config: Arc<Config>,
}

/// Create the API router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/reserve", post(handlers::reserve))
        .route("/fill/:item_id", post(handlers::fill))
        .route("/speak", post(handlers::speak))
        .route("/wait/:item_id", post(handlers::wait))
        .route("/cancel/:item_id", post(handlers::cancel))
        .route("/pause", post(handlers::pause))
        .route("/resume", post(handlers::resume))
        .route("/clear", post(handlers::clear))
        .route("/stop", post(handlers::stop))
        .route("/chime-allowed", post(handlers::chime_allowed))
        .route("/events", get(sse::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Map a daemon error onto an HTTP status and JSON body
pub(crate) fn error_response(err: Error) -> (StatusCode, Json<ErrorBody>) {
    let status = match &err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidState(_) | Error::AlreadyStarted(_) => StatusCode::CONFLICT,
        Error::ResourceExhausted(_) => StatusCode::TOO_MANY_REQUESTS,
        Error::Payload(_) => StatusCode::BAD_REQUEST,
        Error::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

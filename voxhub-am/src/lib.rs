//! # VoxHub Audio Manager (voxhub-am)
//!
//! Local daemon that serializes playback of short speech and chime clips
//! submitted by concurrently running client sessions.
//!
//! **Purpose:** exactly one clip on the output device at a time, played in
//! reservation order even when synthesis latency varies wildly between
//! sessions, with a priority lane for alert chimes.
//!
//! **Architecture:** a reservation queue with a two-phase reserve→fill
//! lifecycle, a single dispatch loop feeding a cpal output stream, and an
//! axum HTTP control surface.

pub mod api;
pub mod config;
pub mod error;
pub mod playback;
pub mod queue;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;

//! Error types for voxhub-am
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Playback-device errors are never surfaced to API callers;
//! the dispatcher logs them and completes the item best-effort.

use thiserror::Error;

/// Main error type for the voxhub-am daemon
#[derive(Error, Debug)]
pub enum Error {
    /// Unknown item id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation applied to an item in the wrong lifecycle stage
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Cancel requested after playback already began
    #[error("Already started: {0}")]
    AlreadyStarted(String),

    /// Queue or tracker at its configured bound
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Daemon is shutting down; no new reservations accepted
    #[error("Shutting down")]
    ShuttingDown,

    /// Surfaced by an external collaborator (synthesis backend); never
    /// generated by the daemon itself
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Wire payload errors
    #[error(transparent)]
    Payload(#[from] voxhub_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the voxhub-am Error
pub type Result<T> = std::result::Result<T, Error>;

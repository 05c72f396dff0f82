//! Common error types shared by the daemon and client crates

use thiserror::Error;

/// Common result type for VoxHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can arise outside any one service, mostly while
/// encoding or decoding wire payloads.
#[derive(Error, Debug)]
pub enum Error {
    /// Audio payload could not be decoded
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

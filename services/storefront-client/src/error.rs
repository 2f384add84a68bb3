//! Service-specific error types

use thiserror::Error;

/// Why an API call produced no usable response.
///
/// Non-2xx responses are not errors here; they are returned to the caller
/// with their status and body so the CLI can print them.
#[derive(Error, Debug)]
pub enum Error {
    #[error("request blocked: {0}")]
    Gate(#[from] refresh_gate::GateError),

    #[error("invalid request path {path}: {reason}")]
    Path { path: String, reason: String },

    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for session and auth endpoint operations

/// Errors from session storage and auth endpoint calls.
///
/// Cloneable so a single refresh failure can be handed to every request
/// that was waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("session parse error: {0}")]
    SessionParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

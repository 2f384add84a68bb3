//! Errors returned to callers whose request was not sent

/// Why the gate refused to dispatch a request.
///
/// Every variant except `InvalidHeader` and `RefreshAbandoned` has already
/// ended the session by the time the caller sees it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GateError {
    #[error("no credential for a protected request")]
    NoCredential,

    #[error("token expired and no refresh token is stored")]
    ExpiredAccessNoRefresh,

    #[error("refresh token expired")]
    ExpiredRefresh,

    #[error("token refresh failed: {0}")]
    RefreshFailed(#[source] session_auth::Error),

    #[error("token refresh was abandoned before it settled")]
    RefreshAbandoned,

    #[error("token is not a valid header value")]
    InvalidHeader,
}

impl GateError {
    /// Label for the login redirect counter.
    pub fn reason(&self) -> &'static str {
        match self {
            GateError::NoCredential => "no_credential",
            GateError::ExpiredAccessNoRefresh => "expired_no_refresh",
            GateError::ExpiredRefresh => "expired_refresh",
            GateError::RefreshFailed(_) => "refresh_failed",
            GateError::RefreshAbandoned => "refresh_abandoned",
            GateError::InvalidHeader => "invalid_header",
        }
    }
}

pub type Result<T> = std::result::Result<T, GateError>;

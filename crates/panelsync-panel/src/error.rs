//! Panel client error types.

use panelsync_core::errors;

/// Panel client error.
///
/// Every variant is scoped to a single call: callers decide whether it
/// poisons a server, an inbound or nothing at all.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// Credentials rejected (login failed or session refused after re-login).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Call exceeded its timeout.
    #[error("request timed out")]
    Timeout,

    /// Inbound or client absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Client already exists on the inbound.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Panel returned data that does not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Panel answered `success: false` for some other reason.
    #[error("rejected by panel: {0}")]
    Rejected(String),
}

impl PanelError {
    /// Create a transport error from any error type.
    #[inline]
    pub fn transport<E: std::fmt::Display>(err: E) -> Self {
        Self::Transport(err.to_string())
    }

    /// Create a decode error from any error type.
    #[inline]
    pub fn decode<E: std::fmt::Display>(err: E) -> Self {
        Self::Decode(err.to_string())
    }

    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => errors::ERROR_AUTH,
            Self::Transport(_) => errors::ERROR_TRANSPORT,
            Self::Timeout => errors::ERROR_TIMEOUT,
            Self::NotFound(_) => errors::ERROR_NOT_FOUND,
            Self::Conflict(_) => errors::ERROR_CONFLICT,
            Self::Decode(_) => errors::ERROR_DECODE,
            Self::Rejected(_) => errors::ERROR_REJECTED,
        }
    }
}

impl From<reqwest::Error> for PanelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::decode(err)
        } else {
            Self::transport(err)
        }
    }
}

//! Platform error type.

use thiserror::Error;

/// Errors raised by chat platform backends.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("bot token is empty")]
    MissingToken,

    #[cfg(feature = "discord")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "discord")]
    #[error("websocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("{method} {path} failed (HTTP {status}): {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[error("{path} still rate limited after {attempts} attempts")]
    RateLimited { path: String, attempts: u32 },

    #[error("unexpected payload from {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("gateway: {0}")]
    Gateway(String),
}

impl PlatformError {
    /// Whether this is an HTTP 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::Status { status: 404, .. })
    }

    pub(crate) fn decode(path: &str, reason: impl Into<String>) -> Self {
        PlatformError::Decode {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

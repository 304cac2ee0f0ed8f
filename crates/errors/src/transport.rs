//! Transport-level error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum TransportError {
    #[error("resource does not exist: {path}")]
    NotFound { path: String },

    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("not authorized to access {url}")]
    Unauthorized { url: String },

    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },

    #[error("transfer failed: {0}")]
    TransferFailed(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Whether the remote resource is absent (as opposed to unreachable)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the connection that produced this error must not be reused
    #[must_use]
    pub fn is_connection_broken(&self) -> bool {
        matches!(self, Self::ConnectionLost(_) | Self::Timeout { .. })
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl UserFacingError for TransportError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } | Self::ConnectionRefused(_) | Self::ConnectionLost(_) => {
                Some("Check the repository URL and your network connection, then retry.")
            }
            Self::Unauthorized { .. } => Some("Check the credentials configured for this repository."),
            Self::UnsupportedProtocol { .. } => {
                Some("Use a repository URL with a supported scheme (file, http or https).")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::ConnectionRefused(_)
                | Self::ConnectionLost(_)
                | Self::HttpError { status: 500..=599, .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotFound { .. } => "transport.not_found",
            Self::Timeout { .. } => "transport.timeout",
            Self::ConnectionRefused(_) => "transport.connection_refused",
            Self::ConnectionLost(_) => "transport.connection_lost",
            Self::Unauthorized { .. } => "transport.unauthorized",
            Self::HttpError { .. } => "transport.http_error",
            Self::InvalidUrl(_) => "transport.invalid_url",
            Self::UnsupportedProtocol { .. } => "transport.unsupported_protocol",
            Self::TransferFailed(_) => "transport.transfer_failed",
            Self::Io(_) => "transport.io",
        };
        Some(code)
    }
}

#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for repofetch
//!
//! Per-item failures (`FetchError`) never escape a worker on their own; they
//! are collected into a `MultiTransferError` by the repository reader. The
//! top-level `Error` covers everything a public API call can fail with.
//! All error types implement Clone for easier handling.

use std::borrow::Cow;

use thiserror::Error;

pub mod checksum;
pub mod config;
pub mod fetch;
pub mod transport;

// Re-export all error types at the root
pub use checksum::ChecksumError;
pub use config::ConfigError;
pub use fetch::{FetchError, Interruption, MultiTransferError, TransferFailure};
pub use transport::TransportError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    #[error(transparent)]
    MultiTransfer(#[from] MultiTransferError),

    /// The reader was closed before the call; no I/O was attempted
    #[error("reader closed")]
    Closed,

    #[error("no repository reader available for {repository}: {reason}")]
    NoReader { repository: String, reason: String },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("checksum error: {0}")]
    Checksum(#[from] ChecksumError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {message}")]
    Io {
        #[cfg_attr(feature = "serde", serde(with = "io_kind_as_str"))]
        kind: std::io::ErrorKind,
        message: String,
        #[cfg_attr(feature = "serde", serde(with = "opt_path_buf"))]
        path: Option<std::path::PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// Per-item failures when this is a batch failure
    #[must_use]
    pub fn failures(&self) -> &[FetchError] {
        match self {
            Self::MultiTransfer(err) => err.failures(),
            _ => &[],
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

/// Result type alias for repofetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for analytics / structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Transport(err) => err.user_message(),
            Error::Config(err) => err.user_message(),
            Error::Io { message, .. } => Cow::Owned(message.clone()),
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::MultiTransfer(err) => err.failures().first().and_then(FetchError::user_hint),
            Error::Transport(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            Error::Closed => Some("Create a new reader; a closed reader accepts no work."),
            Error::NoReader { .. } => {
                Some("Use a repository URL with a scheme the transport supports.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::MultiTransfer(err) => err.failures().iter().all(FetchError::is_retryable),
            Error::Transport(err) => err.is_retryable(),
            Error::Io { .. } => true,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::MultiTransfer(_) => Some("error.multi_transfer"),
            Error::Closed => Some("error.closed"),
            Error::NoReader { .. } => Some("error.no_reader"),
            Error::Transport(err) => err.user_code(),
            Error::Checksum(_) => Some("error.checksum"),
            Error::Config(err) => err.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}

// Serde helper modules for optional path and io::ErrorKind as string
#[cfg(feature = "serde")]
mod io_kind_as_str {
    use serde::{Deserialize, Deserializer, Serializer};
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S>(kind: &std::io::ErrorKind, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&format!("{kind:?}"))
    }
    pub fn deserialize<'de, D>(deserializer: D) -> Result<std::io::ErrorKind, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        // Best effort mapping; default to Other
        Ok(match s.as_str() {
            "NotFound" => std::io::ErrorKind::NotFound,
            "PermissionDenied" => std::io::ErrorKind::PermissionDenied,
            "ConnectionRefused" => std::io::ErrorKind::ConnectionRefused,
            "ConnectionReset" => std::io::ErrorKind::ConnectionReset,
            "ConnectionAborted" => std::io::ErrorKind::ConnectionAborted,
            "NotConnected" => std::io::ErrorKind::NotConnected,
            "AddrInUse" => std::io::ErrorKind::AddrInUse,
            "AddrNotAvailable" => std::io::ErrorKind::AddrNotAvailable,
            "BrokenPipe" => std::io::ErrorKind::BrokenPipe,
            "AlreadyExists" => std::io::ErrorKind::AlreadyExists,
            "WouldBlock" => std::io::ErrorKind::WouldBlock,
            "InvalidInput" => std::io::ErrorKind::InvalidInput,
            "InvalidData" => std::io::ErrorKind::InvalidData,
            "TimedOut" => std::io::ErrorKind::TimedOut,
            "WriteZero" => std::io::ErrorKind::WriteZero,
            "Interrupted" => std::io::ErrorKind::Interrupted,
            "Unsupported" => std::io::ErrorKind::Unsupported,
            "UnexpectedEof" => std::io::ErrorKind::UnexpectedEof,
            _ => std::io::ErrorKind::Other,
        })
    }
}

#[cfg(feature = "serde")]
mod opt_path_buf {
    use serde::{Deserialize, Deserializer, Serializer};
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(path: &Option<std::path::PathBuf>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match path {
            Some(pb) => s.serialize_some(&pb.display().to_string()),
            None => s.serialize_none(),
        }
    }
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<std::path::PathBuf>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;
        Ok(opt.map(std::path::PathBuf::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found(resource: &str) -> FetchError {
        FetchError::NotFound {
            resource: resource.to_string(),
            repository: "central (https://repo.example.org/maven2)".to_string(),
        }
    }

    #[test]
    fn test_multi_transfer_display_single() {
        let err = MultiTransferError::new(vec![not_found("artifact org.example:lib:1.0")], 3);
        assert_eq!(
            err.to_string(),
            "1 of 3 transfers failed: artifact org.example:lib:1.0 could not be found in central (https://repo.example.org/maven2)"
        );
    }

    #[test]
    fn test_multi_transfer_display_many() {
        let err = MultiTransferError::new(
            vec![not_found("artifact a:a:1"), not_found("artifact b:b:1")],
            2,
        );
        assert!(err.to_string().starts_with("2 of 2 transfers failed: artifact a:a:1"));
        assert!(err.to_string().ends_with("(and 1 more)"));
    }

    #[test]
    fn test_interruption_is_transfer_error() {
        let err = FetchError::Transfer {
            resource: "metadata org.example/maven-metadata.xml".to_string(),
            repository: "central".to_string(),
            failure: TransferFailure::Interrupted(Interruption::Closed),
        };
        assert!(err.is_transfer_error());
        assert_eq!(err.interruption(), Some(Interruption::Closed));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_user_codes() {
        assert_eq!(Error::Closed.user_code(), Some("error.closed"));
        let multi: Error = MultiTransferError::new(vec![not_found("x")], 1).into();
        assert_eq!(multi.user_code(), Some("error.multi_transfer"));
        assert!(!multi.is_retryable());
        assert_eq!(multi.failures().len(), 1);
    }
}

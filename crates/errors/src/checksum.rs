//! Checksum verification error types

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChecksumError {
    #[error("checksum validation failed, {algorithm} expected {expected} but is {actual}")]
    Mismatch {
        algorithm: String,
        expected: String,
        actual: String,
    },

    #[error("checksum validation failed, no checksums available from the repository")]
    Unavailable,

    #[error("could not fetch {algorithm} checksum: {message}")]
    Fetch { algorithm: String, message: String },

    #[error("could not read {algorithm} checksum: {message}")]
    Unreadable { algorithm: String, message: String },
}

impl ChecksumError {
    /// Whether the repository published no checksum at all
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

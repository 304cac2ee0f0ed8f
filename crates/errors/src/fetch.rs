//! Per-item and per-batch fetch error types

use std::borrow::Cow;
use std::fmt;

use crate::{ChecksumError, TransportError, UserFacingError};
use thiserror::Error;

/// Why a batch stopped waiting for its outstanding items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Interruption {
    /// The reader was closed while the batch was in flight
    Closed,
    /// The configured batch timeout elapsed
    TimedOut { after_ms: u64 },
    /// The batch was cancelled by its caller
    Cancelled,
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "reader closed"),
            Self::TimedOut { after_ms } => write!(f, "timed out after {after_ms}ms"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Failure cause for items that were neither missing nor corrupt
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferFailure {
    #[error("could not connect: {0}")]
    Connect(TransportError),

    #[error("{0}")]
    Transport(TransportError),

    #[error("could not move download into place: {0}")]
    Finalize(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("interrupted: {0}")]
    Interrupted(Interruption),

    #[error("task aborted: {0}")]
    Aborted(String),
}

/// Terminal failure of a single requested resource
///
/// `resource` is the display form of the resource key, so artifact and
/// metadata failures read differently without a separate error hierarchy.
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FetchError {
    #[error("{resource} could not be found in {repository}")]
    NotFound {
        resource: String,
        repository: String,
    },

    #[error("could not transfer {resource} from {repository}: {failure}")]
    Transfer {
        resource: String,
        repository: String,
        failure: TransferFailure,
    },

    #[error("checksum failure for {resource} from {repository}: {source}")]
    Checksum {
        resource: String,
        repository: String,
        source: ChecksumError,
    },
}

impl FetchError {
    /// Display form of the resource this failure belongs to
    #[must_use]
    pub fn resource(&self) -> &str {
        match self {
            Self::NotFound { resource, .. }
            | Self::Transfer { resource, .. }
            | Self::Checksum { resource, .. } => resource,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_checksum_failure(&self) -> bool {
        matches!(self, Self::Checksum { .. })
    }

    #[must_use]
    pub fn is_transfer_error(&self) -> bool {
        matches!(self, Self::Transfer { .. })
    }

    /// The interruption that resolved this item, if any
    #[must_use]
    pub fn interruption(&self) -> Option<Interruption> {
        match self {
            Self::Transfer {
                failure: TransferFailure::Interrupted(reason),
                ..
            } => Some(*reason),
            _ => None,
        }
    }
}

impl UserFacingError for FetchError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => Some("Check the coordinates and that the repository hosts them."),
            Self::Checksum { .. } => {
                Some("The repository served corrupt data; retry later or relax the checksum policy.")
            }
            Self::Transfer {
                failure: TransferFailure::Connect(err) | TransferFailure::Transport(err),
                ..
            } => err.user_hint(),
            Self::Transfer { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::NotFound { .. } => false,
            Self::Checksum { .. } => true,
            Self::Transfer { failure, .. } => match failure {
                TransferFailure::Connect(err) | TransferFailure::Transport(err) => {
                    err.is_retryable()
                }
                TransferFailure::Interrupted(_) | TransferFailure::Io(_) => true,
                TransferFailure::Finalize(_) | TransferFailure::Aborted(_) => false,
            },
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::NotFound { .. } => "fetch.not_found",
            Self::Transfer { .. } => "fetch.transfer",
            Self::Checksum { .. } => "fetch.checksum",
        })
    }
}

/// Aggregate of every failed item in a batch
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("{} of {total} transfers failed{}", .failures.len(), summary(.failures))]
pub struct MultiTransferError {
    failures: Vec<FetchError>,
    total: usize,
}

fn summary(failures: &[FetchError]) -> String {
    match failures.first() {
        Some(first) if failures.len() == 1 => format!(": {first}"),
        Some(first) => format!(": {first} (and {} more)", failures.len() - 1),
        None => String::new(),
    }
}

impl MultiTransferError {
    /// Build from the failed items of a batch of `total` requests
    #[must_use]
    pub fn new(failures: Vec<FetchError>, total: usize) -> Self {
        Self { failures, total }
    }

    #[must_use]
    pub fn failures(&self) -> &[FetchError] {
        &self.failures
    }

    #[must_use]
    pub fn into_failures(self) -> Vec<FetchError> {
        self.failures
    }

    /// Number of requests in the batch, failed or not
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Failure recorded for the given resource, if any
    #[must_use]
    pub fn failure_for(&self, resource: &str) -> Option<&FetchError> {
        self.failures.iter().find(|f| f.resource() == resource)
    }
}

use chrono::{DateTime, Utc};
use repofetch_errors::{FetchError, UserFacingError};
use repofetch_types::ResourceKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::Level;
use uuid::Uuid;

/// Lifecycle stage of a single transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferEventKind {
    Initiated,
    Corrupted,
    Succeeded,
    Failed,
}

impl TransferEventKind {
    /// Whether this is the last event emitted for a resource
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for TransferEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Initiated => "initiated",
            Self::Corrupted => "corrupted",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// The remote resource a transfer event refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResource {
    pub key: ResourceKey,
    pub repository_url: String,
    /// Path relative to the repository base URL
    pub path: String,
}

impl TransferResource {
    pub fn new(key: ResourceKey, repository_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            key,
            repository_url: repository_url.into(),
            path: path.into(),
        }
    }

    /// Absolute location of the resource
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.repository_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

/// Structured failure information attached to failed or corrupted transfers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub retryable: bool,
}

impl FailureContext {
    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self {
            code: error.user_code().map(Into::into),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(Into::into),
            retryable: error.is_retryable(),
        }
    }
}

/// A lifecycle event for one requested resource
///
/// Events are plain values; the reader hands each one to the configured
/// listener and keeps no reference to it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: TransferEventKind,
    pub resource: TransferResource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FetchError>,
}

impl TransferEvent {
    fn new(kind: TransferEventKind, resource: TransferResource, error: Option<FetchError>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            resource,
            error,
        }
    }

    #[must_use]
    pub fn initiated(resource: TransferResource) -> Self {
        Self::new(TransferEventKind::Initiated, resource, None)
    }

    /// A verification failure that did not end the transfer
    #[must_use]
    pub fn corrupted(resource: TransferResource, error: FetchError) -> Self {
        Self::new(TransferEventKind::Corrupted, resource, Some(error))
    }

    #[must_use]
    pub fn succeeded(resource: TransferResource) -> Self {
        Self::new(TransferEventKind::Succeeded, resource, None)
    }

    #[must_use]
    pub fn failed(resource: TransferResource, error: FetchError) -> Self {
        Self::new(TransferEventKind::Failed, resource, Some(error))
    }

    #[must_use]
    pub fn key(&self) -> &ResourceKey {
        &self.resource.key
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }

    /// User-facing failure details, if this event carries an error
    #[must_use]
    pub fn failure(&self) -> Option<FailureContext> {
        self.error.as_ref().map(FailureContext::from_error)
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> Level {
        match self.kind {
            TransferEventKind::Failed => Level::ERROR,
            TransferEventKind::Corrupted => Level::WARN,
            TransferEventKind::Succeeded => Level::INFO,
            TransferEventKind::Initiated => Level::DEBUG,
        }
    }
}

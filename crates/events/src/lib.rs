#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Transfer events for repofetch
//!
//! The reader reports the lifecycle of every requested resource (initiated,
//! corrupted, succeeded, failed) to a `TransferListener`. Listeners are
//! injected by the caller and must return quickly: they are invoked inline on
//! the worker that produced the event.

mod transfer;

pub use transfer::{FailureContext, TransferEvent, TransferEventKind, TransferResource};

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

/// Type alias for the channel-backed transfer listener
pub type EventSender = UnboundedSender<TransferEvent>;

/// Type alias for the receiving end of a transfer event channel
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<TransferEvent>;

/// Create a new transfer event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Observer of transfer lifecycle events
pub trait TransferListener: Send + Sync {
    fn on_event(&self, event: TransferEvent);
}

/// Implementation of `TransferListener` for the raw `EventSender`
/// This allows `EventSender` to be used directly where a listener is expected
impl TransferListener for EventSender {
    fn on_event(&self, event: TransferEvent) {
        // Ignore send errors - if receiver is dropped, we just continue
        let _ = self.send(event);
    }
}

impl<T: TransferListener + ?Sized> TransferListener for Arc<T> {
    fn on_event(&self, event: TransferEvent) {
        (**self).on_event(event);
    }
}

/// Listener that writes every event to the tracing infrastructure
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl TransferListener for TracingListener {
    fn on_event(&self, event: TransferEvent) {
        let resource = event.resource.key.as_str();
        let url = event.resource.url();
        let failure = event.failure();
        match event.kind {
            TransferEventKind::Initiated => {
                debug!(target: "repofetch::events::transfer", resource, %url, "Transfer initiated");
            }
            TransferEventKind::Succeeded => {
                info!(target: "repofetch::events::transfer", resource, %url, "Transfer succeeded");
            }
            TransferEventKind::Corrupted => {
                warn!(
                    target: "repofetch::events::transfer",
                    resource,
                    %url,
                    detail = failure.as_ref().map(|f| f.message.as_str()),
                    "Transfer corrupted"
                );
            }
            TransferEventKind::Failed => {
                error!(
                    target: "repofetch::events::transfer",
                    resource,
                    %url,
                    code = failure.as_ref().and_then(|f| f.code.as_deref()),
                    detail = failure.as_ref().map(|f| f.message.as_str()),
                    retryable = failure.as_ref().is_some_and(|f| f.retryable),
                    "Transfer failed"
                );
            }
        }
    }
}

//! Per-batch result slots and the completion barrier

use repofetch_errors::{FetchError, Interruption, MultiTransferError, TransferFailure};
use repofetch_events::{TransferEvent, TransferListener, TransferResource};
use repofetch_types::ResourceKey;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::{trace, warn};

/// Outcome of one requested resource
#[derive(Debug, Clone)]
pub struct BatchEntry {
    key: ResourceKey,
    destination: PathBuf,
    outcome: Result<(), FetchError>,
}

impl BatchEntry {
    #[must_use]
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Where the resource was (or would have been) written
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    #[must_use]
    pub fn outcome(&self) -> Result<(), &FetchError> {
        self.outcome.as_ref().map(|()| ())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Outcome of every request in a batch, in submission order
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    entries: Vec<BatchEntry>,
}

impl BatchResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries.iter()
    }

    /// Entry for a resource key
    #[must_use]
    pub fn get(&self, key: &ResourceKey) -> Option<&BatchEntry> {
        self.entries.iter().find(|entry| &entry.key == key)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchError> {
        self.entries.iter().filter_map(|entry| entry.outcome.as_ref().err())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.entries.iter().all(BatchEntry::is_success)
    }

    /// Fail with every per-item error if any item failed
    ///
    /// # Errors
    ///
    /// Returns a `MultiTransferError` carrying one error per failed item.
    pub fn into_result(self) -> Result<Self, MultiTransferError> {
        if self.is_success() {
            return Ok(self);
        }
        let total = self.entries.len();
        let failures = self
            .entries
            .into_iter()
            .filter_map(|entry| entry.outcome.err())
            .collect();
        Err(MultiTransferError::new(failures, total))
    }
}

/// Identity of one slot, fixed when the batch is created
pub(crate) struct SlotInfo {
    pub(crate) key: ResourceKey,
    pub(crate) destination: PathBuf,
    pub(crate) resource: TransferResource,
    /// Display form used in error messages
    pub(crate) label: String,
}

struct Slot {
    info: SlotInfo,
    outcome: Option<Result<(), FetchError>>,
}

struct SlotTable {
    interruption: Option<Interruption>,
    slots: Vec<Slot>,
}

/// Shared state of one in-flight batch
///
/// Each slot is written at most once: either by its task through a
/// [`Completion`], or by [`interrupt`](Self::interrupt). Whoever writes the
/// slot emits the terminal event, so every request gets exactly one. Nothing
/// is emitted for a slot once it is written.
pub(crate) struct BatchState {
    table: Mutex<SlotTable>,
    outstanding: AtomicUsize,
    done: Notify,
    repository: String,
    listener: Option<Arc<dyn TransferListener>>,
}

impl BatchState {
    pub(crate) fn new(
        slots: Vec<SlotInfo>,
        repository: String,
        listener: Option<Arc<dyn TransferListener>>,
    ) -> Arc<Self> {
        let outstanding = AtomicUsize::new(slots.len());
        Arc::new(Self {
            table: Mutex::new(SlotTable {
                interruption: None,
                slots: slots
                    .into_iter()
                    .map(|info| Slot { info, outcome: None })
                    .collect(),
            }),
            outstanding,
            done: Notify::new(),
            repository,
            listener,
        })
    }

    fn lock(&self) -> MutexGuard<'_, SlotTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand an event to the listener; a panicking listener loses the event only
    fn deliver(&self, event: TransferEvent) {
        let Some(listener) = &self.listener else {
            return;
        };
        let kind = event.kind;
        let key = event.resource.key.clone();
        if panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event))).is_err() {
            warn!(resource = %key, %kind, "transfer listener panicked, event dropped");
        }
    }

    /// Emit a non-terminal event for a slot that is still open
    ///
    /// The table stays locked while the listener runs, so an interrupt cannot
    /// slip its terminal event in ahead of this one.
    pub(crate) fn emit_progress(&self, index: usize, event: TransferEvent) {
        let table = self.lock();
        let open = table.interruption.is_none()
            && table.slots.get(index).is_some_and(|slot| slot.outcome.is_none());
        if open {
            self.deliver(event);
        } else {
            trace!(resource = %event.resource.key, kind = %event.kind, "dropping event of a resolved item");
        }
        drop(table);
    }

    /// Guard that must be resolved by the task filling slot `index`
    pub(crate) fn completion(self: &Arc<Self>, index: usize) -> Completion {
        Completion {
            state: Arc::clone(self),
            index,
            recorded: false,
        }
    }

    pub(crate) fn interruption(&self) -> Option<Interruption> {
        self.lock().interruption
    }

    fn failure(&self, label: &str, failure: TransferFailure) -> FetchError {
        FetchError::Transfer {
            resource: label.to_string(),
            repository: self.repository.clone(),
            failure,
        }
    }

    fn record(&self, index: usize, outcome: Result<(), FetchError>) {
        let _countdown = Countdown(self);
        let event = {
            let mut table = self.lock();
            let interrupted = table.interruption.is_some();
            match table.slots.get_mut(index) {
                Some(slot) if !interrupted && slot.outcome.is_none() => {
                    let resource = slot.info.resource.clone();
                    let event = match &outcome {
                        Ok(()) => TransferEvent::succeeded(resource),
                        Err(e) => TransferEvent::failed(resource, e.clone()),
                    };
                    slot.outcome = Some(outcome);
                    Some(event)
                }
                // Late result of an interrupted batch
                _ => None,
            }
        };

        if let Some(event) = event {
            self.deliver(event);
        }
    }

    fn record_abort(&self, index: usize) {
        let label = self
            .lock()
            .slots
            .get(index)
            .map(|slot| slot.info.label.clone())
            .unwrap_or_default();
        let error = self.failure(
            &label,
            TransferFailure::Aborted("fetch task ended without a result".to_string()),
        );
        self.record(index, Err(error));
    }

    /// Resolve every unfinished slot as interrupted
    ///
    /// Results reported afterwards are discarded.
    pub(crate) fn interrupt(&self, reason: Interruption) {
        let events: Vec<TransferEvent> = {
            let mut table = self.lock();
            if table.interruption.is_some() {
                return;
            }
            table.interruption = Some(reason);
            let mut events = Vec::new();
            for slot in table.slots.iter_mut().filter(|s| s.outcome.is_none()) {
                let error = self.failure(&slot.info.label, TransferFailure::Interrupted(reason));
                events.push(TransferEvent::failed(slot.info.resource.clone(), error.clone()));
                slot.outcome = Some(Err(error));
            }
            events
        };

        for event in events {
            self.deliver(event);
        }
    }

    /// Wait until every task has reported
    pub(crate) async fn wait_all(&self) {
        loop {
            let notified = self.done.notified();
            if self.outstanding.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Collect the slots in submission order
    pub(crate) fn into_result(&self) -> BatchResult {
        let mut table = self.lock();
        let entries = std::mem::take(&mut table.slots)
            .into_iter()
            .map(|slot| {
                let outcome = slot.outcome.unwrap_or_else(|| {
                    Err(self.failure(
                        &slot.info.label,
                        TransferFailure::Aborted("no result recorded".to_string()),
                    ))
                });
                BatchEntry {
                    key: slot.info.key,
                    destination: slot.info.destination,
                    outcome,
                }
            })
            .collect();
        BatchResult { entries }
    }
}

/// Counts a task off the barrier however `record` exits
struct Countdown<'a>(&'a BatchState);

impl Drop for Countdown<'_> {
    fn drop(&mut self) {
        if self.0.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.done.notify_one();
        }
    }
}

/// RAII completion guard for one fetch task
///
/// Dropping the guard without calling [`finish`](Self::finish) (a panic, or
/// the task being cancelled) records the item as aborted, so the batch
/// barrier always counts down.
pub(crate) struct Completion {
    state: Arc<BatchState>,
    index: usize,
    recorded: bool,
}

impl Completion {
    pub(crate) fn finish(mut self, outcome: Result<(), FetchError>) {
        self.recorded = true;
        self.state.record(self.index, outcome);
    }

    pub(crate) fn interruption(&self) -> Option<Interruption> {
        self.state.interruption()
    }

    /// Report progress; dropped once the item has its terminal outcome
    pub(crate) fn emit(&self, event: TransferEvent) {
        self.state.emit_progress(self.index, event);
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if !self.recorded {
            self.state.record_abort(self.index);
        }
    }
}

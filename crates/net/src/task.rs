//! One resource fetch: connect, transfer, verify, move into place

use crate::batch::{Completion, SlotInfo};
use crate::fs_util::{finalize, sibling, TempFile};
use crate::layout::RepositoryLayout;
use crate::pool::ConnectionPool;
use crate::transport::{Connection, Endpoint};
use crate::verify::ChecksumVerifier;
use repofetch_errors::{ChecksumError, FetchError, Interruption, TransferFailure, TransportError};
use repofetch_events::{TransferEvent, TransferResource};
use repofetch_hash::DigestSet;
use repofetch_types::{ChecksumPolicy, ResourceRequest};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Transfers per resource before a checksum failure is final
const MAX_ATTEMPTS: u32 = 2;

/// Collaborators shared by every task of one reader
pub(crate) struct TaskContext {
    pub(crate) endpoint: Endpoint,
    pub(crate) pool: Arc<ConnectionPool>,
    pub(crate) verifier: ChecksumVerifier,
}

pub(crate) struct FetchTask {
    ctx: Arc<TaskContext>,
    request: ResourceRequest,
    remote_path: String,
    resource: TransferResource,
    label: String,
}

impl FetchTask {
    pub(crate) fn new(
        ctx: Arc<TaskContext>,
        request: ResourceRequest,
        layout: &dyn RepositoryLayout,
    ) -> Self {
        let remote_path = request
            .remote_path()
            .map_or_else(|| layout.path(request.resource()), str::to_string);
        let resource = TransferResource::new(
            request.key(),
            ctx.endpoint.repository.url.clone(),
            remote_path.clone(),
        );
        let label = request.resource().to_string();
        Self {
            ctx,
            request,
            remote_path,
            resource,
            label,
        }
    }

    pub(crate) fn slot(&self) -> SlotInfo {
        SlotInfo {
            key: self.request.key(),
            destination: self.request.destination().to_path_buf(),
            resource: self.resource.clone(),
            label: self.label.clone(),
        }
    }

    fn repository(&self) -> String {
        self.ctx.endpoint.repository.to_string()
    }

    pub(crate) fn failure(&self, failure: TransferFailure) -> FetchError {
        FetchError::Transfer {
            resource: self.label.clone(),
            repository: self.repository(),
            failure,
        }
    }

    pub(crate) fn interrupted(&self, reason: Interruption) -> FetchError {
        self.failure(TransferFailure::Interrupted(reason))
    }

    fn transport_failure(&self, err: TransportError) -> FetchError {
        if err.is_not_found() {
            FetchError::NotFound {
                resource: self.label.clone(),
                repository: self.repository(),
            }
        } else {
            self.failure(TransferFailure::Transport(err))
        }
    }

    fn checksum_failure(&self, source: ChecksumError) -> FetchError {
        FetchError::Checksum {
            resource: self.label.clone(),
            repository: self.repository(),
            source,
        }
    }

    /// Run the fetch to its terminal outcome
    ///
    /// Emits `Initiated` and any `Corrupted` events through `completion`,
    /// which drops them once the item is resolved; the terminal event is
    /// left to the caller.
    pub(crate) async fn run(&self, completion: &Completion) -> Result<(), FetchError> {
        completion.emit(TransferEvent::initiated(self.resource.clone()));
        debug!(resource = %self.label, path = %self.remote_path, "fetching");

        let destination = self.request.destination();
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.failure(TransferFailure::Io(e.to_string())))?;
        }
        let download = TempFile::new(sibling(destination, ".tmp"));

        let mut conn = self
            .ctx
            .pool
            .acquire(&self.ctx.endpoint)
            .await
            .map_err(|e| self.failure(TransferFailure::Connect(e)))?;

        let outcome = self.transfer(conn.as_mut(), &download, completion).await;
        if outcome.as_ref().is_err_and(is_connection_broken) {
            self.ctx.pool.discard(conn).await;
        } else {
            self.ctx.pool.release(conn).await;
        }
        outcome?;

        finalize(download.path(), destination)
            .await
            .map_err(|e| self.failure(TransferFailure::Finalize(e.to_string())))?;
        trace!(resource = %self.label, destination = %destination.display(), "fetched");
        Ok(())
    }

    /// Download into `download`, re-fetching once on a checksum failure
    async fn transfer(
        &self,
        conn: &mut dyn Connection,
        download: &TempFile,
        completion: &Completion,
    ) -> Result<(), FetchError> {
        let policy = self.request.checksum_policy();

        for attempt in 1..=MAX_ATTEMPTS {
            conn.get(&self.remote_path, download.path())
                .await
                .map_err(|e| self.transport_failure(e))?;

            if !policy.verifies() {
                return Ok(());
            }

            let digests = DigestSet::hash_file(download.path())
                .await
                .map_err(|e| self.failure(TransferFailure::Io(e.to_string())))?;

            let (error, retryable) = match self
                .ctx
                .verifier
                .verify_all(conn, &self.remote_path, self.request.destination(), &digests)
                .await
            {
                Ok(verification) => match verification.into_error() {
                    None => return Ok(()),
                    Some(error) => {
                        let retryable = !error.is_unavailable();
                        (error, retryable)
                    }
                },
                Err(error) => (error, true),
            };

            let last = !retryable || attempt == MAX_ATTEMPTS;
            let error = self.checksum_failure(error);
            if last && policy == ChecksumPolicy::Fail {
                return Err(error);
            }

            warn!(resource = %self.label, attempt, error = %error, "checksum verification failed");
            completion.emit(TransferEvent::corrupted(self.resource.clone(), error));
            if last {
                // WARN keeps the unverified download
                return Ok(());
            }
        }
        Ok(())
    }
}

fn is_connection_broken(err: &FetchError) -> bool {
    matches!(
        err,
        FetchError::Transfer {
            failure: TransferFailure::Transport(e),
            ..
        } if e.is_connection_broken()
    )
}

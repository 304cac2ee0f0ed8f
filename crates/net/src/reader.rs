//! Batch coordinator for one remote repository

use crate::batch::{BatchResult, BatchState, Completion};
use crate::layout::{Maven2Layout, RepositoryLayout};
use crate::pool::ConnectionPool;
use crate::task::{FetchTask, TaskContext};
use crate::transport::{ConnectOptions, Endpoint, Transport};
use crate::verify::ChecksumVerifier;
use crate::worker::WorkerPool;
use futures::FutureExt;
use repofetch_config::ReaderConfig;
use repofetch_errors::{Error, Interruption};
use repofetch_events::TransferListener;
use repofetch_types::{
    ArtifactRequest, AuthenticationSelector, MetadataRequest, ProxySelector, RemoteRepository,
    ResourceRequest,
};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Optional collaborators of a [`RepositoryReader`]
#[derive(Clone)]
pub struct ReaderContext {
    listener: Option<Arc<dyn TransferListener>>,
    authentication: Option<Arc<dyn AuthenticationSelector>>,
    proxy: Option<Arc<dyn ProxySelector>>,
    layout: Arc<dyn RepositoryLayout>,
}

impl Default for ReaderContext {
    fn default() -> Self {
        Self {
            listener: None,
            authentication: None,
            proxy: None,
            layout: Arc::new(Maven2Layout),
        }
    }
}

impl ReaderContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive transfer events for every fetched resource
    #[must_use]
    pub fn with_listener(mut self, listener: impl TransferListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    #[must_use]
    pub fn with_authentication(mut self, selector: impl AuthenticationSelector + 'static) -> Self {
        self.authentication = Some(Arc::new(selector));
        self
    }

    #[must_use]
    pub fn with_proxy(mut self, selector: impl ProxySelector + 'static) -> Self {
        self.proxy = Some(Arc::new(selector));
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: impl RepositoryLayout + 'static) -> Self {
        self.layout = Arc::new(layout);
        self
    }
}

/// Fetches batches of artifacts and metadata from one remote repository
///
/// Each batch call blocks until every request reached a terminal outcome,
/// or until the batch is interrupted by its timeout, its caller, or
/// [`close`](Self::close). Interrupted items resolve as transfer errors and
/// any result they report later is discarded.
pub struct RepositoryReader {
    repository: RemoteRepository,
    tasks: Arc<TaskContext>,
    listener: Option<Arc<dyn TransferListener>>,
    layout: Arc<dyn RepositoryLayout>,
    workers: WorkerPool,
    batch_timeout: Option<Duration>,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

impl RepositoryReader {
    /// Create a reader for `repository`
    ///
    /// Credentials and proxy are resolved once, here.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the transport does
    /// not support the repository's protocol.
    pub fn new(
        transport: Arc<dyn Transport>,
        repository: RemoteRepository,
        config: &ReaderConfig,
        context: ReaderContext,
    ) -> Result<Self, Error> {
        config.validate()?;

        let protocol = repository.protocol();
        if !transport.supports(&protocol) {
            return Err(Error::NoReader {
                repository: repository.to_string(),
                reason: format!("unsupported protocol \"{protocol}\""),
            });
        }

        let authentication = context
            .authentication
            .as_ref()
            .and_then(|selector| selector.authentication(&repository));
        let proxy = context
            .proxy
            .as_ref()
            .and_then(|selector| selector.proxy(&repository));
        debug!(
            repository = %repository,
            authenticated = authentication.is_some(),
            proxied = proxy.is_some(),
            threads = config.worker_count(),
            "creating repository reader"
        );

        let endpoint = Endpoint {
            repository: repository.clone(),
            authentication,
            proxy,
            options: ConnectOptions::from(config),
        };

        Ok(Self {
            repository,
            tasks: Arc::new(TaskContext {
                endpoint,
                pool: Arc::new(ConnectionPool::new(transport)),
                verifier: ChecksumVerifier::new(config.cache_checksums),
            }),
            listener: context.listener,
            layout: context.layout,
            workers: WorkerPool::new(config.worker_count()),
            batch_timeout: config.batch_timeout_duration(),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        })
    }

    #[must_use]
    pub fn repository(&self) -> &RemoteRepository {
        &self.repository
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Idle connections currently cached for reuse
    #[must_use]
    pub fn idle_connections(&self) -> usize {
        self.tasks.pool.idle_count(&self.repository.id)
    }

    /// Fetch artifacts
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn get_artifacts(
        &self,
        requests: impl IntoIterator<Item = ArtifactRequest>,
    ) -> Result<BatchResult, Error> {
        self.fetch(requests.into_iter().map(ResourceRequest::from))
            .await
    }

    /// Fetch metadata
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn get_metadata(
        &self,
        requests: impl IntoIterator<Item = MetadataRequest>,
    ) -> Result<BatchResult, Error> {
        self.fetch(requests.into_iter().map(ResourceRequest::from))
            .await
    }

    /// Fetch a batch of resources, waiting for every one of them
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] without doing any I/O if the reader is
    /// closed, and [`Error::MultiTransfer`] with one entry per failed
    /// request if any request failed.
    pub async fn fetch(
        &self,
        requests: impl IntoIterator<Item = ResourceRequest>,
    ) -> Result<BatchResult, Error> {
        self.run_batch(requests, None).await
    }

    /// Like [`fetch`](Self::fetch), but `cancel` interrupts the batch
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn fetch_cancellable(
        &self,
        requests: impl IntoIterator<Item = ResourceRequest>,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, Error> {
        self.run_batch(requests, Some(cancel)).await
    }

    async fn run_batch(
        &self,
        requests: impl IntoIterator<Item = ResourceRequest>,
        cancel: Option<&CancellationToken>,
    ) -> Result<BatchResult, Error> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let tasks: Vec<FetchTask> = requests
            .into_iter()
            .map(|request| FetchTask::new(Arc::clone(&self.tasks), request, self.layout.as_ref()))
            .collect();
        if tasks.is_empty() {
            return Ok(BatchResult::default());
        }

        let total = tasks.len();
        info!(repository = %self.repository, requests = total, "fetching batch");

        let state = BatchState::new(
            tasks.iter().map(FetchTask::slot).collect(),
            self.repository.to_string(),
            self.listener.clone(),
        );
        let batch_token = self.shutdown.child_token();
        let caller_token = cancel.cloned().unwrap_or_default();

        if self.workers.is_sequential() {
            let work = run_sequential(tasks, &state);
            tokio::pin!(work);
            if let Some(reason) = self.race(work.as_mut(), &batch_token, &caller_token).await {
                state.interrupt(reason);
            }
            // Dropping an unfinished sequence after the interrupt only discards late results
        } else {
            let mut set = JoinSet::new();
            for (index, task) in tasks.into_iter().enumerate() {
                set.spawn(run_pooled(
                    task,
                    state.completion(index),
                    self.workers.clone(),
                    batch_token.clone(),
                ));
            }

            let work = state.wait_all();
            tokio::pin!(work);
            match self.race(work.as_mut(), &batch_token, &caller_token).await {
                Some(reason) => {
                    state.interrupt(reason);
                    // Queued tasks stop; running ones finish in the background
                    batch_token.cancel();
                    set.detach_all();
                }
                None => {
                    while let Some(joined) = set.join_next().await {
                        if let Err(e) = joined {
                            warn!(error = %e, "fetch task panicked");
                        }
                    }
                }
            }
        }

        let result = state.into_result();
        let failed = result.failures().count();
        if failed == 0 {
            info!(repository = %self.repository, requests = total, "batch complete");
        } else {
            warn!(repository = %self.repository, requests = total, failed, "batch finished with failures");
        }
        result.into_result().map_err(Error::from)
    }

    /// Drive `work` until it completes or the batch is interrupted
    async fn race<F>(
        &self,
        work: Pin<&mut F>,
        batch_token: &CancellationToken,
        caller_token: &CancellationToken,
    ) -> Option<Interruption>
    where
        F: Future<Output = ()>,
    {
        let deadline = async {
            match self.batch_timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            () = work => None,
            () = batch_token.cancelled() => Some(Interruption::Closed),
            () = caller_token.cancelled() => Some(Interruption::Cancelled),
            () = deadline => {
                let after_ms = self
                    .batch_timeout
                    .map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
                Some(Interruption::TimedOut { after_ms })
            }
        }
    }

    /// Close the reader
    ///
    /// In-flight batches resolve their unfinished items as interrupted and
    /// later calls fail with [`Error::Closed`]. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(repository = %self.repository, "closing repository reader");
        self.shutdown.cancel();
        self.workers.close();
        self.tasks.pool.close_all().await;
    }
}

impl Drop for RepositoryReader {
    fn drop(&mut self) {
        // Detached tasks of interrupted batches stop at their next admission check
        self.shutdown.cancel();
        self.workers.close();
    }
}

async fn run_sequential(tasks: Vec<FetchTask>, state: &Arc<BatchState>) {
    for (index, task) in tasks.into_iter().enumerate() {
        let completion = state.completion(index);
        match AssertUnwindSafe(task.run(&completion)).catch_unwind().await {
            Ok(outcome) => completion.finish(outcome),
            // The dropped guard records the item as aborted
            Err(_) => warn!(index, "fetch task panicked"),
        }
    }
}

async fn run_pooled(
    task: FetchTask,
    completion: Completion,
    workers: WorkerPool,
    cancel: CancellationToken,
) {
    let Some(_permit) = workers.acquire(&cancel).await else {
        let reason = completion.interruption().unwrap_or(Interruption::Closed);
        completion.finish(Err(task.interrupted(reason)));
        return;
    };
    let outcome = task.run(&completion).await;
    completion.finish(outcome);
}

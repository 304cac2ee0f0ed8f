//! Reuse cache for open repository connections

use crate::transport::{BoxConnection, Endpoint, Transport};
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use repofetch_errors::TransportError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Idle connections, keyed by repository id
///
/// The pool caches connections; it does not limit how many exist. A
/// connection taken from the pool belongs to the caller until it is handed
/// back through [`release`](Self::release) or [`discard`](Self::discard).
/// No lock is held while connecting or disconnecting.
pub struct ConnectionPool {
    transport: Arc<dyn Transport>,
    idle: DashMap<String, SegQueue<BoxConnection>>,
    closed: AtomicBool,
    opened: AtomicUsize,
}

impl ConnectionPool {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            idle: DashMap::new(),
            closed: AtomicBool::new(false),
            opened: AtomicUsize::new(0),
        }
    }

    /// Take an idle connection for the endpoint's repository, or open one
    ///
    /// # Errors
    ///
    /// Returns the transport error when a new connection cannot be opened.
    pub async fn acquire(&self, endpoint: &Endpoint) -> Result<BoxConnection, TransportError> {
        let repository_id = endpoint.repository.id.as_str();
        if let Some(conn) = self.idle.get(repository_id).and_then(|queue| queue.pop()) {
            trace!(repository = repository_id, "reusing idle connection");
            return Ok(conn);
        }

        let conn = self.transport.connect(endpoint).await?;
        self.opened.fetch_add(1, Ordering::Relaxed);
        debug!(repository = repository_id, "opened new connection");
        Ok(conn)
    }

    /// Hand a healthy connection back for reuse
    ///
    /// After [`close_all`](Self::close_all) the connection is disconnected
    /// instead of being queued.
    pub async fn release(&self, mut conn: BoxConnection) {
        if self.closed.load(Ordering::Acquire) {
            conn.disconnect().await;
            return;
        }

        let repository_id = conn.repository_id().to_string();
        self.idle
            .entry(repository_id.clone())
            .or_default()
            .push(conn);

        // close_all may have drained this queue between the check and the push
        if self.closed.load(Ordering::Acquire) {
            self.drain(&repository_id).await;
        }
    }

    /// Disconnect a connection that must not be reused
    pub async fn discard(&self, mut conn: BoxConnection) {
        debug!(repository = conn.repository_id(), "discarding connection");
        conn.disconnect().await;
    }

    /// Disconnect every idle connection and stop accepting returns
    ///
    /// Connections currently in use are left alone; they are disconnected
    /// when released.
    pub async fn close_all(&self) {
        self.closed.store(true, Ordering::Release);
        let repositories: Vec<String> = self.idle.iter().map(|e| e.key().clone()).collect();
        for repository_id in repositories {
            self.drain(&repository_id).await;
        }
    }

    async fn drain(&self, repository_id: &str) {
        // Pop under the shard guard, disconnect outside it
        loop {
            let next = self.idle.get(repository_id).and_then(|queue| queue.pop());
            let Some(mut conn) = next else { break };
            conn.disconnect().await;
            debug!(repository = repository_id, "closed idle connection");
        }
    }

    /// Number of idle connections for a repository
    #[must_use]
    pub fn idle_count(&self, repository_id: &str) -> usize {
        self.idle.get(repository_id).map_or(0, |queue| queue.len())
    }

    /// Number of connections opened over the pool's lifetime
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

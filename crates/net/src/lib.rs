#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Concurrent resource fetching for repofetch
//!
//! A [`RepositoryReader`] fetches batches of artifacts and metadata from one
//! remote repository. Each request runs through connect, transfer, checksum
//! verification and finalization on a bounded worker pool, reusing
//! connections through a per-repository [`ConnectionPool`]. Progress is
//! reported as [`TransferEvent`](repofetch_events::TransferEvent)s.

mod batch;
mod fs_util;
mod layout;
mod pool;
mod reader;
mod task;
mod transport;
mod verify;
mod worker;

pub use batch::{BatchEntry, BatchResult};
pub use layout::{Maven2Layout, RepositoryLayout};
pub use pool::ConnectionPool;
pub use reader::{ReaderContext, RepositoryReader};
pub use transport::{
    BoxConnection, ConnectOptions, Connection, Endpoint, FileTransport, HttpTransport, Transport,
};
pub use verify::{ChecksumVerifier, Verification};

use std::sync::Arc;

/// Transport for `file`, `http` and `https` repositories
#[derive(Debug, Clone, Default)]
pub struct DefaultTransport {
    file: FileTransport,
    http: HttpTransport,
}

#[async_trait::async_trait]
impl Transport for DefaultTransport {
    fn supports(&self, protocol: &str) -> bool {
        self.file.supports(protocol) || self.http.supports(protocol)
    }

    async fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> Result<BoxConnection, repofetch_errors::TransportError> {
        if self.file.supports(&endpoint.repository.protocol()) {
            self.file.connect(endpoint).await
        } else {
            self.http.connect(endpoint).await
        }
    }
}

/// Reader over the default transports
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the repository URL
/// uses a protocol other than `file`, `http` or `https`.
pub fn open_reader(
    repository: repofetch_types::RemoteRepository,
    config: &repofetch_config::ReaderConfig,
    context: ReaderContext,
) -> Result<RepositoryReader, repofetch_errors::Error> {
    RepositoryReader::new(Arc::new(DefaultTransport::default()), repository, config, context)
}

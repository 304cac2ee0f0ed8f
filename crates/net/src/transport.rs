//! Transport seam between the reader and the wire

mod file;
mod http;

pub use file::FileTransport;
pub use http::HttpTransport;

use repofetch_config::ReaderConfig;
use repofetch_errors::TransportError;
use repofetch_types::{Authentication, Proxy, RemoteRepository};
use std::path::Path;
use std::time::Duration;

/// Settings applied when a connection is opened
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl From<&ReaderConfig> for ConnectOptions {
    fn from(config: &ReaderConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout_duration(),
            request_timeout: config.request_timeout_duration(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Everything needed to open a connection to one repository
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub repository: RemoteRepository,
    pub authentication: Option<Authentication>,
    pub proxy: Option<Proxy>,
    pub options: ConnectOptions,
}

/// An authenticated session with one remote repository
///
/// A connection is only ever used by one fetch at a time, hence `&mut self`.
#[async_trait::async_trait]
pub trait Connection: Send {
    /// Id of the repository this connection is bound to
    fn repository_id(&self) -> &str;

    /// Copy `remote_path` (relative to the repository root) to `destination`
    async fn get(&mut self, remote_path: &str, destination: &Path) -> Result<(), TransportError>;

    /// Close the session; the connection is not used afterwards
    async fn disconnect(&mut self);
}

pub type BoxConnection = Box<dyn Connection>;

/// Opens connections for the protocols it supports
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Whether this transport handles the given (lower-case) URL scheme
    fn supports(&self, protocol: &str) -> bool;

    async fn connect(&self, endpoint: &Endpoint) -> Result<BoxConnection, TransportError>;
}

/// Join a repository base URL and a relative path
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

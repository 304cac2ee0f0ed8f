//! Remote repositories and the credentials used to reach them

use repofetch_errors::{Error, TransportError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// A remote repository, identified by id and base URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
}

impl RemoteRepository {
    /// Create a repository after checking that `url` parses
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Result<Self, Error> {
        let url = url.into();
        Url::parse(&url).map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self { id: id.into(), url })
    }

    /// Lower-cased URL scheme, empty when the URL does not parse
    #[must_use]
    pub fn protocol(&self) -> String {
        Url::parse(&self.url)
            .map(|u| u.scheme().to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Base URL without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}

/// Credentials for a repository or proxy
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    pub username: Option<String>,
    pub password: Option<String>,
    pub private_key: Option<PathBuf>,
    pub passphrase: Option<String>,
}

impl Authentication {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }
}

// Keep secrets out of logs
impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("private_key", &self.private_key)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Proxy through which a repository is reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    /// Proxy protocol, e.g. `http`
    #[serde(rename = "type")]
    pub proxy_type: String,
    pub host: String,
    pub port: u16,
    pub authentication: Option<Authentication>,
}

impl Proxy {
    pub fn http(host: impl Into<String>, port: u16) -> Self {
        Self {
            proxy_type: "http".to_string(),
            host: host.into(),
            port,
            authentication: None,
        }
    }

    /// Proxy URL in `type://host:port` form
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.proxy_type, self.host, self.port)
    }
}

/// Supplies credentials per repository
pub trait AuthenticationSelector: Send + Sync {
    fn authentication(&self, repository: &RemoteRepository) -> Option<Authentication>;
}

/// Supplies a proxy per repository
pub trait ProxySelector: Send + Sync {
    fn proxy(&self, repository: &RemoteRepository) -> Option<Proxy>;
}

/// Selector that hands out the same credentials for every repository
#[derive(Debug, Clone)]
pub struct StaticAuthentication(pub Authentication);

impl AuthenticationSelector for StaticAuthentication {
    fn authentication(&self, _repository: &RemoteRepository) -> Option<Authentication> {
        Some(self.0.clone())
    }
}

/// Selector that routes every repository through the same proxy
#[derive(Debug, Clone)]
pub struct StaticProxy(pub Proxy);

impl ProxySelector for StaticProxy {
    fn proxy(&self, _repository: &RemoteRepository) -> Option<Proxy> {
        Some(self.0.clone())
    }
}

//! HTTP(S) repositories

use super::{join_url, BoxConnection, Connection, Endpoint, Transport};
use futures::StreamExt;
use repofetch_errors::TransportError;
use repofetch_types::Authentication;
use reqwest::{Client, StatusCode};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Transport for `http` and `https` repositories
///
/// Every connection owns its own client, so credentials and proxy settings
/// never leak between repositories.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransport;

#[async_trait::async_trait]
impl Transport for HttpTransport {
    fn supports(&self, protocol: &str) -> bool {
        matches!(protocol, "http" | "https")
    }

    async fn connect(&self, endpoint: &Endpoint) -> Result<BoxConnection, TransportError> {
        let options = &endpoint.options;
        let mut builder = Client::builder()
            .timeout(options.request_timeout)
            .connect_timeout(options.connect_timeout)
            .user_agent(&options.user_agent);

        if let Some(proxy) = &endpoint.proxy {
            let mut reqwest_proxy = reqwest::Proxy::all(proxy.url())
                .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", proxy.url())))?;
            if let Some(Authentication {
                username: Some(user),
                password,
                ..
            }) = &proxy.authentication
            {
                reqwest_proxy =
                    reqwest_proxy.basic_auth(user, password.as_deref().unwrap_or_default());
            }
            builder = builder.proxy(reqwest_proxy);
        } else {
            // Proxies come from the reader's selector only, never the environment
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::ConnectionRefused(e.to_string()))?;

        debug!(repository = %endpoint.repository.id, url = %endpoint.repository.url, "opened http repository");
        Ok(Box::new(HttpConnection {
            repository_id: endpoint.repository.id.clone(),
            base_url: endpoint.repository.base_url().to_string(),
            client,
            credentials: endpoint.authentication.as_ref().and_then(|auth| {
                auth.username
                    .clone()
                    .map(|user| (user, auth.password.clone()))
            }),
        }))
    }
}

struct HttpConnection {
    repository_id: String,
    base_url: String,
    client: Client,
    credentials: Option<(String, Option<String>)>,
}

impl HttpConnection {
    async fn stream_to_file(
        &self,
        url: &str,
        response: reqwest::Response,
        destination: &Path,
    ) -> Result<(), TransportError> {
        let mut file = tokio::fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_reqwest_error(url, &e, true))?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Connection for HttpConnection {
    fn repository_id(&self) -> &str {
        &self.repository_id
    }

    async fn get(&mut self, remote_path: &str, destination: &Path) -> Result<(), TransportError> {
        let url = join_url(&self.base_url, remote_path);
        let mut request = self.client.get(&url);
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_reqwest_error(&url, &e, false))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                return Err(TransportError::NotFound {
                    path: remote_path.to_string(),
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(TransportError::Unauthorized { url })
            }
            status => {
                return Err(TransportError::HttpError {
                    status: status.as_u16(),
                    message: status.to_string(),
                })
            }
        }

        self.stream_to_file(&url, response, destination).await
    }

    async fn disconnect(&mut self) {
        debug!(repository = %self.repository_id, "closing http connection");
    }
}

/// Convert a reqwest failure; a failure mid-body leaves the connection unusable
fn map_reqwest_error(url: &str, error: &reqwest::Error, in_body: bool) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        TransportError::ConnectionRefused(error.to_string())
    } else if in_body {
        TransportError::ConnectionLost(error.to_string())
    } else {
        TransportError::TransferFailed(error.to_string())
    }
}

//! `file://` repositories on the local filesystem

use super::{BoxConnection, Connection, Endpoint, Transport};
use repofetch_errors::TransportError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use url::Url;

/// Transport for repositories laid out in a local directory
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransport;

#[async_trait::async_trait]
impl Transport for FileTransport {
    fn supports(&self, protocol: &str) -> bool {
        protocol == "file"
    }

    async fn connect(&self, endpoint: &Endpoint) -> Result<BoxConnection, TransportError> {
        let url = Url::parse(&endpoint.repository.url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", endpoint.repository.url)))?;
        let base = url
            .to_file_path()
            .map_err(|()| TransportError::InvalidUrl(endpoint.repository.url.clone()))?;

        let metadata = fs::metadata(&base).await.map_err(|e| {
            TransportError::ConnectionRefused(format!("{}: {e}", base.display()))
        })?;
        if !metadata.is_dir() {
            return Err(TransportError::ConnectionRefused(format!(
                "{} is not a directory",
                base.display()
            )));
        }

        debug!(repository = %endpoint.repository.id, base = %base.display(), "opened file repository");
        Ok(Box::new(FileConnection {
            repository_id: endpoint.repository.id.clone(),
            base,
        }))
    }
}

struct FileConnection {
    repository_id: String,
    base: PathBuf,
}

impl FileConnection {
    fn path_for(&self, remote_path: &str) -> PathBuf {
        self.base.join(remote_path.trim_start_matches('/'))
    }
}

#[async_trait::async_trait]
impl Connection for FileConnection {
    fn repository_id(&self) -> &str {
        &self.repository_id
    }

    async fn get(&mut self, remote_path: &str, destination: &Path) -> Result<(), TransportError> {
        let source = self.path_for(remote_path);
        match fs::metadata(&source).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(TransportError::NotFound {
                    path: remote_path.to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransportError::NotFound {
                    path: remote_path.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }

        fs::copy(&source, destination).await?;
        Ok(())
    }

    async fn disconnect(&mut self) {}
}

//! Temporary download files and moving them into place

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::trace;

/// RAII guard for a temporary download file - removes it on drop
///
/// Covers every exit path of a fetch, including errors, panics and
/// cancellation of the owning task.
pub(crate) struct TempFile {
    path: PathBuf,
}

impl TempFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => trace!(path = %self.path.display(), "removed temporary file"),
            // Nothing was written, or the file was renamed into place
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => trace!(path = %self.path.display(), error = %e, "could not remove temporary file"),
        }
    }
}

/// `path` with `suffix` appended to its file name
pub(crate) fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Move `from` to `to`, copying when a rename is not possible
///
/// The copy fallback covers temporary and final paths on different
/// filesystems; the source is left for its guard to remove.
pub(crate) async fn finalize(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).await?;
    }
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            trace!(from = %from.display(), to = %to.display(), error = %rename_err, "rename failed, copying");
            fs::copy(from, to).await.map(|_| ())
        }
    }
}

//! Verification of downloads against published checksum files

use crate::fs_util::{finalize, sibling, TempFile};
use crate::transport::Connection;
use repofetch_errors::ChecksumError;
use repofetch_hash::{checksum_matches, parse_checksum, ChecksumAlgorithm, DigestSet};
use std::path::Path;
use tracing::{debug, trace};

/// Outcome of checking a download against the repository's checksums
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// A published checksum matched the download
    Matched,
    /// Checksums were published but none matched
    Mismatch {
        algorithm: ChecksumAlgorithm,
        expected: String,
        actual: String,
    },
    /// The repository publishes no checksum for the resource
    Unavailable,
}

impl Verification {
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched)
    }

    /// The checksum failure this outcome represents, if any
    #[must_use]
    pub fn into_error(self) -> Option<ChecksumError> {
        match self {
            Self::Matched => None,
            Self::Mismatch {
                algorithm,
                expected,
                actual,
            } => Some(ChecksumError::Mismatch {
                algorithm: algorithm.name().to_string(),
                expected,
                actual,
            }),
            Self::Unavailable => Some(ChecksumError::Unavailable),
        }
    }
}

/// Fetches checksum files and compares them against observed digests
#[derive(Debug, Clone, Copy)]
pub struct ChecksumVerifier {
    cache_checksums: bool,
}

impl ChecksumVerifier {
    /// `cache_checksums` keeps a matching checksum file next to the destination
    #[must_use]
    pub fn new(cache_checksums: bool) -> Self {
        Self { cache_checksums }
    }

    /// Check `digests` against the strong checksum, falling back to the weak one
    ///
    /// A mismatch is reported as a value so the caller can decide whether to
    /// retry; only a failure to fetch or read a checksum file is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a checksum file exists but cannot be transferred or read.
    pub async fn verify_all(
        &self,
        conn: &mut dyn Connection,
        remote_path: &str,
        destination: &Path,
        digests: &DigestSet,
    ) -> Result<Verification, ChecksumError> {
        let mut first_mismatch = None;
        for algorithm in ChecksumAlgorithm::ALL {
            match self
                .verify(conn, remote_path, destination, algorithm, digests.get(algorithm))
                .await?
            {
                Some(Verification::Matched) => return Ok(Verification::Matched),
                Some(mismatch) => {
                    first_mismatch.get_or_insert(mismatch);
                }
                None => trace!(%algorithm, remote_path, "no checksum published"),
            }
        }
        Ok(first_mismatch.unwrap_or(Verification::Unavailable))
    }

    /// Check one algorithm; `None` when the repository has no such checksum file
    ///
    /// # Errors
    ///
    /// Returns an error if the checksum file cannot be transferred or read.
    pub async fn verify(
        &self,
        conn: &mut dyn Connection,
        remote_path: &str,
        destination: &Path,
        algorithm: ChecksumAlgorithm,
        actual: &str,
    ) -> Result<Option<Verification>, ChecksumError> {
        let ext = algorithm.extension();
        let tmp = TempFile::new(sibling(destination, &format!("{ext}.tmp")));

        match conn.get(&format!("{remote_path}{ext}"), tmp.path()).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => {
                return Err(ChecksumError::Fetch {
                    algorithm: algorithm.name().to_string(),
                    message: e.to_string(),
                })
            }
        }

        let contents = tokio::fs::read_to_string(tmp.path())
            .await
            .map_err(|e| ChecksumError::Unreadable {
                algorithm: algorithm.name().to_string(),
                message: e.to_string(),
            })?;
        let expected = parse_checksum(&contents).ok_or_else(|| ChecksumError::Unreadable {
            algorithm: algorithm.name().to_string(),
            message: "no checksum found in file".to_string(),
        })?;

        if !checksum_matches(&expected, actual) {
            debug!(%algorithm, remote_path, %expected, actual, "checksum mismatch");
            return Ok(Some(Verification::Mismatch {
                algorithm,
                expected,
                actual: actual.to_string(),
            }));
        }

        if self.cache_checksums {
            // Keeping the checksum file is a convenience; it never fails the fetch
            if let Err(e) = finalize(tmp.path(), &sibling(destination, ext)).await {
                debug!(%algorithm, error = %e, "could not cache checksum file");
            }
        }
        Ok(Some(Verification::Matched))
    }
}

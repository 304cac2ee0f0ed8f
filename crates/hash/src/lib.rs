#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Repository checksums for repofetch
//!
//! Downloads are verified against the SHA-1 and MD5 checksum files a
//! repository publishes next to each resource. SHA-1 is the strong digest and
//! is always tried first; MD5 is the fallback.

mod checksum_file;

pub use checksum_file::parse_checksum;

use md5::Md5;
use repofetch_errors::Error;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Size of chunks for streaming hash computation
const CHUNK_SIZE: usize = 64 * 1024; // 64KB

/// Digest algorithms a repository publishes checksum files for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Sha1,
    Md5,
}

impl ChecksumAlgorithm {
    /// Verification order, strongest first
    pub const ALL: [Self; 2] = [Self::Sha1, Self::Md5];

    /// Conventional algorithm name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Md5 => "MD5",
        }
    }

    /// Suffix of the checksum file, including the dot
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Sha1 => ".sha1",
            Self::Md5 => ".md5",
        }
    }

    /// Length of the hex encoded digest
    #[must_use]
    pub fn hex_len(self) -> usize {
        match self {
            Self::Sha1 => 40,
            Self::Md5 => 32,
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lower-case hex digests of one file for every supported algorithm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestSet {
    sha1: String,
    md5: String,
}

#[derive(Default)]
struct DigestState {
    sha1: Sha1,
    md5: Md5,
}

impl DigestState {
    fn update(&mut self, data: &[u8]) {
        self.sha1.update(data);
        self.md5.update(data);
    }

    fn finish(self) -> DigestSet {
        DigestSet {
            sha1: hex::encode(self.sha1.finalize()),
            md5: hex::encode(self.md5.finalize()),
        }
    }
}

impl DigestSet {
    /// Compute digests of a byte slice
    #[must_use]
    pub fn from_data(data: &[u8]) -> Self {
        let mut state = DigestState::default();
        state.update(data);
        state.finish()
    }

    /// Compute digests of a file in a single streaming pass
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or read.
    pub async fn hash_file(path: &Path) -> Result<Self, Error> {
        let mut file = File::open(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;

        let mut state = DigestState::default();
        let mut buffer = vec![0; CHUNK_SIZE];

        loop {
            let n = file
                .read(&mut buffer)
                .await
                .map_err(|e| Error::io_with_path(&e, path))?;
            if n == 0 {
                break;
            }
            state.update(&buffer[..n]);
        }

        Ok(state.finish())
    }

    /// Hex digest for the given algorithm
    #[must_use]
    pub fn get(&self, algorithm: ChecksumAlgorithm) -> &str {
        match algorithm {
            ChecksumAlgorithm::Sha1 => &self.sha1,
            ChecksumAlgorithm::Md5 => &self.md5,
        }
    }
}

/// Compare a published checksum against an observed digest, ignoring case
#[must_use]
pub fn checksum_matches(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

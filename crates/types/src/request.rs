//! Fetch requests and checksum policy

use crate::resource::{Artifact, Metadata, Resource, ResourceKey};
use repofetch_errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How a downloaded resource is checked against the repository's checksums
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    /// Skip verification; no checksum resource is requested
    Ignore,
    /// Verify, retry once, accept anyway on persistent mismatch
    #[default]
    Warn,
    /// Verify, retry once, fail on persistent mismatch
    Fail,
}

impl ChecksumPolicy {
    #[must_use]
    pub fn verifies(self) -> bool {
        !matches!(self, Self::Ignore)
    }
}

impl fmt::Display for ChecksumPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => write!(f, "ignore"),
            Self::Warn => write!(f, "warn"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for ChecksumPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            _ => Err(ConfigError::InvalidValue {
                field: "checksum_policy".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// One resource to fetch, immutable once submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    resource: Resource,
    destination: PathBuf,
    checksum_policy: ChecksumPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remote_path: Option<String>,
}

impl ResourceRequest {
    pub fn new(resource: impl Into<Resource>, destination: impl Into<PathBuf>) -> Self {
        Self {
            resource: resource.into(),
            destination: destination.into(),
            checksum_policy: ChecksumPolicy::default(),
            remote_path: None,
        }
    }

    pub fn artifact(artifact: Artifact, destination: impl Into<PathBuf>) -> Self {
        Self::new(artifact, destination)
    }

    pub fn metadata(metadata: Metadata, destination: impl Into<PathBuf>) -> Self {
        Self::new(metadata, destination)
    }

    #[must_use]
    pub fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum_policy = policy;
        self
    }

    /// Fetch from `path` instead of the layout-computed location
    #[must_use]
    pub fn with_remote_path(mut self, path: impl Into<String>) -> Self {
        self.remote_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    #[must_use]
    pub fn key(&self) -> ResourceKey {
        self.resource.key()
    }

    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    #[must_use]
    pub fn checksum_policy(&self) -> ChecksumPolicy {
        self.checksum_policy
    }

    /// Explicit remote path, if one was set
    #[must_use]
    pub fn remote_path(&self) -> Option<&str> {
        self.remote_path.as_deref()
    }
}

/// Typed request for an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    pub artifact: Artifact,
    pub destination: PathBuf,
    pub checksum_policy: ChecksumPolicy,
}

impl ArtifactRequest {
    pub fn new(artifact: Artifact, destination: impl Into<PathBuf>) -> Self {
        Self {
            artifact,
            destination: destination.into(),
            checksum_policy: ChecksumPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum_policy = policy;
        self
    }
}

impl From<ArtifactRequest> for ResourceRequest {
    fn from(req: ArtifactRequest) -> Self {
        Self::artifact(req.artifact, req.destination).with_checksum_policy(req.checksum_policy)
    }
}

/// Typed request for repository metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRequest {
    pub metadata: Metadata,
    pub destination: PathBuf,
    pub checksum_policy: ChecksumPolicy,
}

impl MetadataRequest {
    pub fn new(metadata: Metadata, destination: impl Into<PathBuf>) -> Self {
        Self {
            metadata,
            destination: destination.into(),
            checksum_policy: ChecksumPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum_policy = policy;
        self
    }
}

impl From<MetadataRequest> for ResourceRequest {
    fn from(req: MetadataRequest) -> Self {
        Self::metadata(req.metadata, req.destination).with_checksum_policy(req.checksum_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parse() {
        assert_eq!("FAIL".parse::<ChecksumPolicy>().unwrap(), ChecksumPolicy::Fail);
        assert_eq!(" warn ".parse::<ChecksumPolicy>().unwrap(), ChecksumPolicy::Warn);
        assert!("strict".parse::<ChecksumPolicy>().is_err());
        assert!(!ChecksumPolicy::Ignore.verifies());
    }

    #[test]
    fn test_typed_requests_convert() {
        let req: ResourceRequest = ArtifactRequest::new(Artifact::new("g", "a", "1"), "/tmp/a.jar")
            .with_checksum_policy(ChecksumPolicy::Fail)
            .into();
        assert!(req.resource().is_artifact());
        assert_eq!(req.checksum_policy(), ChecksumPolicy::Fail);
        assert_eq!(req.remote_path(), None);

        let req: ResourceRequest =
            MetadataRequest::new(Metadata::group("g"), "/tmp/maven-metadata.xml").into();
        assert!(req.resource().is_metadata());
        assert_eq!(req.checksum_policy(), ChecksumPolicy::Warn);
    }
}

//! Artifact and metadata identities

use repofetch_errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default file name of repository metadata
pub const DEFAULT_METADATA_KIND: &str = "maven-metadata.xml";

/// A versioned artifact, `group:artifact[:extension[:classifier]]:version`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub classifier: String,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    "jar".to_string()
}

impl Artifact {
    /// Create an artifact with the default `jar` extension and no classifier
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: String::new(),
            extension: default_extension(),
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = classifier.into();
        self
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

impl FromStr for Artifact {
    type Err = ConfigError;

    /// Parse `group:artifact:version`, `group:artifact:extension:version` or
    /// `group:artifact:extension:classifier:version`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid_coordinates(s));
        }
        match parts.as_slice() {
            [g, a, v] => Ok(Self::new(*g, *a, *v)),
            [g, a, e, v] => Ok(Self::new(*g, *a, *v).with_extension(*e)),
            [g, a, e, c, v] => Ok(Self::new(*g, *a, *v)
                .with_extension(*e)
                .with_classifier(*c)),
            _ => Err(invalid_coordinates(s)),
        }
    }
}

fn invalid_coordinates(s: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: "coordinates".to_string(),
        value: s.to_string(),
    }
}

/// Repository metadata at group, artifact or version level
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata {
    pub group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// File name of the metadata document
    pub kind: String,
}

impl Metadata {
    /// Group-level metadata
    pub fn group(group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: None,
            version: None,
            kind: DEFAULT_METADATA_KIND.to_string(),
        }
    }

    /// Artifact-level metadata (the version listing)
    pub fn artifact(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            artifact_id: Some(artifact_id.into()),
            ..Self::group(group_id)
        }
    }

    /// Version-level metadata (snapshot resolution)
    pub fn version(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            version: Some(version.into()),
            ..Self::artifact(group_id, artifact_id)
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.group_id)?;
        if let Some(artifact_id) = &self.artifact_id {
            write!(f, ":{artifact_id}")?;
        }
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        write!(f, "/{}", self.kind)
    }
}

/// Anything the reader can fetch
///
/// Artifacts and metadata travel through the same fetch machinery; they only
/// differ in how their path is laid out and how failures are worded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resource {
    Artifact(Artifact),
    Metadata(Metadata),
}

impl Resource {
    /// Stable key identifying this resource within a batch
    #[must_use]
    pub fn key(&self) -> ResourceKey {
        ResourceKey(self.to_string())
    }

    #[must_use]
    pub fn is_artifact(&self) -> bool {
        matches!(self, Self::Artifact(_))
    }

    #[must_use]
    pub fn is_metadata(&self) -> bool {
        matches!(self, Self::Metadata(_))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Artifact(artifact) => write!(f, "artifact {artifact}"),
            Self::Metadata(metadata) => write!(f, "metadata {metadata}"),
        }
    }
}

impl From<Artifact> for Resource {
    fn from(artifact: Artifact) -> Self {
        Self::Artifact(artifact)
    }
}

impl From<Metadata> for Resource {
    fn from(metadata: Metadata) -> Self {
        Self::Metadata(metadata)
    }
}

/// Logical identity of a requested resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(String);

impl ResourceKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

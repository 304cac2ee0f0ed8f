//! Mapping resources to repository paths

use repofetch_types::{Artifact, Metadata, Resource};

/// Computes where a resource lives inside a repository
///
/// Implementations are pure; no I/O happens here.
pub trait RepositoryLayout: Send + Sync {
    fn path(&self, resource: &Resource) -> String;
}

/// The default `group/as/dirs/artifact/version/artifact-version.ext` layout
#[derive(Debug, Clone, Copy, Default)]
pub struct Maven2Layout;

impl Maven2Layout {
    fn artifact_path(artifact: &Artifact) -> String {
        let mut path = group_dir(&artifact.group_id);
        path.push('/');
        path.push_str(&artifact.artifact_id);
        path.push('/');
        path.push_str(&artifact.version);
        path.push('/');
        path.push_str(&artifact.artifact_id);
        path.push('-');
        path.push_str(&artifact.version);
        if !artifact.classifier.is_empty() {
            path.push('-');
            path.push_str(&artifact.classifier);
        }
        if !artifact.extension.is_empty() {
            path.push('.');
            path.push_str(&artifact.extension);
        }
        path
    }

    fn metadata_path(metadata: &Metadata) -> String {
        let mut segments = Vec::with_capacity(4);
        if !metadata.group_id.is_empty() {
            segments.push(group_dir(&metadata.group_id));
        }
        if let Some(artifact_id) = metadata.artifact_id.as_deref().filter(|a| !a.is_empty()) {
            segments.push(artifact_id.to_string());
            if let Some(version) = metadata.version.as_deref().filter(|v| !v.is_empty()) {
                segments.push(version.to_string());
            }
        }
        segments.push(metadata.kind.clone());
        segments.join("/")
    }
}

impl RepositoryLayout for Maven2Layout {
    fn path(&self, resource: &Resource) -> String {
        match resource {
            Resource::Artifact(artifact) => Self::artifact_path(artifact),
            Resource::Metadata(metadata) => Self::metadata_path(metadata),
        }
    }
}

fn group_dir(group_id: &str) -> String {
    group_id.replace('.', "/")
}

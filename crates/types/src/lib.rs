#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for repofetch
//!
//! This crate provides the data model shared by the reader and its
//! collaborators: resource identities, fetch requests, and the repositories
//! they are fetched from.

pub mod repository;
pub mod request;
pub mod resource;

// Re-export commonly used types
pub use repository::{
    Authentication, AuthenticationSelector, Proxy, ProxySelector, RemoteRepository,
    StaticAuthentication, StaticProxy,
};
pub use request::{ArtifactRequest, ChecksumPolicy, MetadataRequest, ResourceRequest};
pub use resource::{Artifact, Metadata, Resource, ResourceKey, DEFAULT_METADATA_KIND};

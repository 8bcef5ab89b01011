//! Staging-repository release workflow.
//!
//! This module provides the [`StagingWorkflow`] orchestrator and the leaf
//! collaborators it drives:
//!
//! - [`artifact`] - Artifact coordinates and default discovery
//! - [`checksum`] - MD5 / SHA-1 sidecar files
//! - [`client`] - HTTP access to the staging service
//! - [`parser`] - XML / JSON response decoding
//! - [`retry`] - Bounded retry with backoff
//! - [`signer`] - Detached GnuPG signatures
//! - [`workflow`] - The lifecycle state machine

pub mod artifact;
pub mod checksum;
pub mod client;
pub mod parser;
pub mod retry;
pub mod signer;
pub mod workflow;

pub use artifact::{Artifact, discover_artifacts};
pub use checksum::{DigestAlgorithm, calculate_digest, write_digest};
pub use client::{ContentType, HttpClient, Method, RemoteClient, RemoteResponse, RequestBody};
pub use parser::{RepositoryState, RepositoryStatus, StagingProfile};
pub use retry::{Backoff, RetryPolicy, retry_with_backoff};
pub use signer::{ArtifactSigner, GpgSigner};
pub use workflow::{StagedRepository, StagingWorkflow, WorkflowState};

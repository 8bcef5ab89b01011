//! Staging-repository release library for Maven artifacts
//!
//! This library provides the release workflow for Maven-compatible staging
//! services (Sonatype Nexus style):
//! - Opening a staging repository for a profile
//! - Uploading artifacts with detached signatures and checksums
//! - Closing the repository and waiting for validation
//! - Promoting the closed repository
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod cli;
pub mod config;
pub mod error;
pub mod metadata;
pub mod staging;

// Re-export commonly used types
pub use config::{StagingConfig, StagingConfigBuilder};
pub use error::{CliError, FailureKind, Result, StagingError};
pub use staging::{StagedRepository, StagingWorkflow, WorkflowState};

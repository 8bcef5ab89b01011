//! Command execution functions for staging operations.
//!
//! - [`deploy`] - Stage, close and optionally release artifacts
//! - [`release`] - Release a repository closed by an earlier deploy
//! - [`push_tag`] - Push the release tag from CI

mod deploy;
mod push_tag;
mod release;

pub use deploy::deploy;
pub use push_tag::push_tag;
pub use release::release;

use super::ServiceArgs;
use crate::config::{Credentials, StagingConfigBuilder};
use crate::staging::HttpClient;

/// Builder pre-filled with the shared connection settings.
fn service_config(service: &ServiceArgs) -> StagingConfigBuilder {
    crate::config::StagingConfig::builder()
        .base_url(service.base_url.clone())
        .credentials(Credentials::new(&service.user, &service.password))
        .release_mode(service.release_mode())
        .request_timeout(service.request_timeout())
}

fn http_client(service: &ServiceArgs) -> crate::Result<HttpClient> {
    HttpClient::new(
        Credentials::new(&service.user, &service.password),
        service.request_timeout(),
    )
}

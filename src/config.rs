//! Immutable configuration for a staging run.
//!
//! [`StagingConfig`] is built once from CLI arguments (or directly by library
//! callers via [`StagingConfigBuilder`]) and handed to the workflow by value.
//! Nothing in the workflow reads the environment on its own.

use crate::error::{CliError, Result, StagingError};
use crate::staging::Artifact;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Sonatype OSS staging service root
pub const DEFAULT_BASE_URL: &str = "https://oss.sonatype.org/service/local/staging";

/// Status checks per close attempt
pub const DEFAULT_POLL_ATTEMPTS: u32 = 10;

/// Wait between status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Close attempts (finish + polling) before giving up
pub const DEFAULT_CLOSE_ATTEMPTS: u32 = 3;

/// Per-request HTTP timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Username/password pair for the staging service.
#[derive(Clone)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// URL layout of the staging service.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// Parses the service root, e.g. `https://oss.sonatype.org/service/local/staging`.
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base.trim_end_matches('/')).map_err(|e| {
            StagingError::Cli(CliError::InvalidArguments {
                reason: format!("Invalid staging base URL '{}': {}", base, e),
            })
        })?;
        if base.cannot_be_a_base() {
            return Err(StagingError::Cli(CliError::InvalidArguments {
                reason: format!("Staging base URL '{}' cannot carry a path", base),
            }));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `GET {base}/profiles`
    pub fn profiles(&self) -> String {
        self.join(&["profiles"])
    }

    /// `POST {base}/profiles/{profile}/start`
    pub fn start(&self, profile_id: &str) -> String {
        self.join(&["profiles", profile_id, "start"])
    }

    /// `POST {base}/profiles/{profile}/finish`
    pub fn finish(&self, profile_id: &str) -> String {
        self.join(&["profiles", profile_id, "finish"])
    }

    /// `POST {base}/profiles/{profile}/promote`
    pub fn promote(&self, profile_id: &str) -> String {
        self.join(&["profiles", profile_id, "promote"])
    }

    /// `GET {base}/profile_repositories/{profile}`
    pub fn profile_repositories(&self, profile_id: &str) -> String {
        self.join(&["profile_repositories", profile_id])
    }

    /// `POST {base}/bulk/promote`
    pub fn bulk_promote(&self) -> String {
        self.join(&["bulk", "promote"])
    }

    /// `PUT {base}/deployByRepositoryId/{repo}/{group path}/{artifact}/{version}/{file}`
    pub fn deploy(&self, repository_id: &str, artifact: &Artifact) -> String {
        let mut segments = vec!["deployByRepositoryId", repository_id];
        segments.extend(artifact.group_path().iter().map(String::as_str));
        segments.push(artifact.artifact_id());
        segments.push(artifact.version());
        segments.push(artifact.file_name());
        self.join(&segments)
    }

    fn join(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.to_string()
    }
}

/// Status polling and close-retry bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Status checks per close attempt
    pub max_attempts: u32,
    /// Wait between status checks
    pub interval: Duration,
    /// Close attempts (finish + polling)
    pub close_attempts: u32,
    /// Wait between close attempts
    pub close_retry_interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_POLL_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
            close_attempts: DEFAULT_CLOSE_ATTEMPTS,
            close_retry_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// How a closed repository is promoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseMode {
    /// XML envelope posted to the profile's promote endpoint
    #[default]
    Profile,
    /// JSON body posted to the bulk promote endpoint
    Bulk,
}

/// Configuration for one staging run.
#[derive(Debug, Clone)]
pub struct StagingConfig {
    endpoints: Endpoints,
    credentials: Credentials,
    profile_name: Option<String>,
    description: String,
    poll: PollSettings,
    release_mode: ReleaseMode,
    deadline: Option<Duration>,
    request_timeout: Duration,
}

impl StagingConfig {
    pub fn builder() -> StagingConfigBuilder {
        StagingConfigBuilder::new()
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Profile name matched against the service's profile list. Only
    /// staging needs it; releasing works from the profile id.
    pub fn profile_name(&self) -> Option<&str> {
        self.profile_name.as_deref()
    }

    /// Description sent with start/finish/promote requests.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn poll(&self) -> PollSettings {
        self.poll
    }

    pub fn release_mode(&self) -> ReleaseMode {
        self.release_mode
    }

    /// Overall time budget for `run`, if any.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

/// Builder for constructing [`StagingConfig`].
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_staging::config::{Credentials, StagingConfig};
///
/// # fn example() -> kodegen_bundler_staging::Result<()> {
/// let config = StagingConfig::builder()
///     .credentials(Credentials::new("deployer", "secret"))
///     .profile_name("com.example")
///     .build()?;
/// assert_eq!(config.description(), "com.example upload");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct StagingConfigBuilder {
    base_url: Option<String>,
    credentials: Option<Credentials>,
    profile_name: Option<String>,
    description: Option<String>,
    poll: PollSettings,
    release_mode: ReleaseMode,
    deadline: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl StagingConfigBuilder {
    /// Creates a new config builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the service root. Default: [`DEFAULT_BASE_URL`].
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the service credentials.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the profile name to look up when staging.
    pub fn profile_name(mut self, name: impl Into<String>) -> Self {
        self.profile_name = Some(name.into());
        self
    }

    /// Sets the request description. Default: `"<profile> upload"`, or
    /// `"release"` without a profile name.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn poll(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn release_mode(mut self, mode: ReleaseMode) -> Self {
        self.release_mode = mode;
        self
    }

    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<StagingConfig> {
        let credentials = self.credentials.ok_or_else(|| {
            StagingError::Cli(CliError::MissingArgument {
                argument: "credentials (--user / --password)".to_string(),
            })
        })?;
        if credentials.user().is_empty() {
            return Err(StagingError::Cli(CliError::MissingArgument {
                argument: "--user".to_string(),
            }));
        }

        let profile_name = self.profile_name.filter(|name| !name.trim().is_empty());

        if self.poll.max_attempts == 0 || self.poll.close_attempts == 0 {
            return Err(StagingError::Cli(CliError::InvalidArguments {
                reason: "Poll attempts and close retries must be at least 1".to_string(),
            }));
        }

        let endpoints = Endpoints::new(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        let description = self.description.unwrap_or_else(|| match &profile_name {
            Some(name) => format!("{} upload", name),
            None => "release".to_string(),
        });

        Ok(StagingConfig {
            endpoints,
            credentials,
            profile_name,
            description,
            poll: self.poll,
            release_mode: self.release_mode,
            deadline: self.deadline,
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn endpoints_follow_service_layout() {
        let endpoints = Endpoints::new("https://repo.example.org/service/local/staging/").unwrap();
        assert_eq!(
            endpoints.start("12ab"),
            "https://repo.example.org/service/local/staging/profiles/12ab/start"
        );
        assert_eq!(
            endpoints.profile_repositories("12ab"),
            "https://repo.example.org/service/local/staging/profile_repositories/12ab"
        );
        assert_eq!(
            endpoints.bulk_promote(),
            "https://repo.example.org/service/local/staging/bulk/promote"
        );
    }

    #[test]
    fn deploy_url_splits_group_into_segments() {
        let endpoints = Endpoints::new(DEFAULT_BASE_URL).unwrap();
        let artifact = Artifact::new(
            "com.example",
            "lib",
            "1.0.0",
            PathBuf::from("/tmp/out/lib-1.0.0.jar"),
        )
        .unwrap();
        assert_eq!(
            endpoints.deploy("comexample-1001", &artifact),
            "https://oss.sonatype.org/service/local/staging/deployByRepositoryId/comexample-1001/com/example/lib/1.0.0/lib-1.0.0.jar"
        );
    }

    #[test]
    fn builder_requires_credentials() {
        assert!(StagingConfig::builder().profile_name("com.example").build().is_err());
        assert!(
            StagingConfig::builder()
                .credentials(Credentials::new("", "p"))
                .build()
                .is_err()
        );
    }

    #[test]
    fn profile_name_is_optional_for_release() {
        let config = StagingConfig::builder()
            .credentials(Credentials::new("u", "p"))
            .profile_name("  ")
            .build()
            .unwrap();
        assert_eq!(config.profile_name(), None);
        assert_eq!(config.description(), "release");

        let config = StagingConfig::builder()
            .credentials(Credentials::new("u", "p"))
            .profile_name("com.example")
            .build()
            .unwrap();
        assert_eq!(config.profile_name(), Some("com.example"));
        assert_eq!(config.description(), "com.example upload");
    }

    #[test]
    fn credentials_debug_hides_password() {
        let rendered = format!("{:?}", Credentials::new("deployer", "hunter2"));
        assert!(rendered.contains("deployer"));
        assert!(!rendered.contains("hunter2"));
    }
}

//! Command line argument parsing and validation.
//!
//! This module provides CLI argument parsing using clap. Every value the
//! scripts used to read from the environment has a flag with an environment
//! fallback, so CI jobs can keep exporting `MVN_USER` and friends.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    DEFAULT_BASE_URL, DEFAULT_CLOSE_ATTEMPTS, DEFAULT_POLL_ATTEMPTS, PollSettings, ReleaseMode,
};

/// Maven staging-repository release tool
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_staging",
    version,
    about = "Stage, close and release Maven artifacts on a staging repository",
    long_about = "Uploads signed Maven artifacts into a staging repository, waits for the \
repository to close, and optionally releases it.

Usage:
  kodegen_bundler_staging deploy --artifact-dir _build/java --release
  kodegen_bundler_staging release --profile-id 12a3b4c5d6 --repository-id comexample-1001
  kodegen_bundler_staging push-tag --version-file VERSION

Exit code 0 = every requested step completed."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Print detailed progress
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a staging repository, upload artifacts and close it
    Deploy(DeployArgs),

    /// Release a repository that is already closed
    Release(ReleaseArgs),

    /// Push a `v<VERSION>` tag from CI when it does not exist yet
    PushTag(PushTagArgs),
}

/// Staging service connection settings
#[derive(clap::Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Staging service user
    #[arg(long, env = "MVN_USER")]
    pub user: String,

    /// Staging service password
    #[arg(long, env = "MVN_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Staging service root URL
    #[arg(long, env = "STAGING_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = 300)]
    pub request_timeout_secs: u64,

    /// Promote through the bulk JSON endpoint instead of the profile endpoint
    #[arg(long)]
    pub bulk_promote: bool,
}

impl ServiceArgs {
    pub fn release_mode(&self) -> ReleaseMode {
        if self.bulk_promote {
            ReleaseMode::Bulk
        } else {
            ReleaseMode::Profile
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Arguments for `deploy`
#[derive(clap::Args, Debug, Clone)]
pub struct DeployArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// GnuPG passphrase for the signing key
    #[arg(long, env = "MVN_PASSPHRASE", hide_env_values = true)]
    pub passphrase: String,

    /// Signing key id (default key when omitted)
    #[arg(long, env = "MVN_KEY_ID")]
    pub key_id: Option<String>,

    /// Directory holding the built artifacts
    #[arg(long, env = "MVN_ARTIFACT_DIR", value_name = "DIR")]
    pub artifact_dir: PathBuf,

    /// Artifact version (read from the POM when omitted)
    #[arg(long = "artifact-version", env = "MVN_VERSION", value_name = "VERSION")]
    pub version: Option<String>,

    /// Artifact id (read from the POM when omitted)
    #[arg(long, env = "MVN_ARTIFACT_ID")]
    pub artifact_id: Option<String>,

    /// Group id (read from the POM when omitted)
    #[arg(long, env = "MVN_GROUP_ID")]
    pub group_id: Option<String>,

    /// Staging profile name (defaults to the group id)
    #[arg(long, env = "STAGING_PROFILE")]
    pub profile_name: Option<String>,

    /// Explicit file to stage, in upload order (repeatable)
    #[arg(long = "file", value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Status checks per close attempt
    #[arg(long, env = "STAGING_POLL_ATTEMPTS", default_value_t = DEFAULT_POLL_ATTEMPTS)]
    pub poll_attempts: u32,

    /// Seconds between status checks
    #[arg(long, env = "STAGING_POLL_INTERVAL_SECS", default_value_t = 60)]
    pub poll_interval_secs: u64,

    /// Close attempts before giving up
    #[arg(long, env = "STAGING_CLOSE_RETRIES", default_value_t = DEFAULT_CLOSE_ATTEMPTS)]
    pub close_retries: u32,

    /// Overall time budget in seconds
    #[arg(long, env = "STAGING_DEADLINE_SECS")]
    pub deadline_secs: Option<u64>,

    /// Description sent with staging requests
    #[arg(long)]
    pub description: Option<String>,

    /// Release the repository once it is closed
    #[arg(long)]
    pub release: bool,
}

impl DeployArgs {
    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if !self.artifact_dir.is_dir() {
            return Err(format!(
                "Artifact directory does not exist: {}",
                self.artifact_dir.display()
            ));
        }
        if self.poll_attempts == 0 {
            return Err("--poll-attempts must be at least 1".to_string());
        }
        if self.close_retries == 0 {
            return Err("--close-retries must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn poll_settings(&self) -> PollSettings {
        let interval = Duration::from_secs(self.poll_interval_secs);
        PollSettings {
            max_attempts: self.poll_attempts,
            interval,
            close_attempts: self.close_retries,
            close_retry_interval: interval,
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

/// Arguments for `release`
#[derive(clap::Args, Debug, Clone)]
pub struct ReleaseArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Profile that owns the repository
    #[arg(long)]
    pub profile_id: String,

    /// Closed repository to release
    #[arg(long)]
    pub repository_id: String,

    /// Description sent with the promote request
    #[arg(long, default_value = "release")]
    pub description: String,
}

/// Arguments for `push-tag`
#[derive(clap::Args, Debug, Clone)]
pub struct PushTagArgs {
    /// Repository to tag
    #[arg(long, default_value = ".")]
    pub repo_path: PathBuf,

    /// File holding the version, relative to the repository
    #[arg(long, default_value = "VERSION")]
    pub version_file: PathBuf,

    /// Branch the CI job runs on
    #[arg(long, env = "TRAVIS_BRANCH")]
    pub branch: Option<String>,

    /// Only this branch produces tags
    #[arg(long, default_value = "master")]
    pub release_branch: String,

    /// Remote to push to
    #[arg(long, default_value = "origin")]
    pub remote: String,

    /// GitHub `owner/repo`; with a token, the remote is pointed at an authenticated URL
    #[arg(long, env = "GIT_REPO_SLUG")]
    pub repo_slug: Option<String>,

    /// Token for the authenticated remote URL
    #[arg(long, env = "GIT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Tag prefix
    #[arg(long, default_value = "v")]
    pub tag_prefix: String,

    /// Push attempts
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Seconds between push attempts
    #[arg(long, default_value_t = 10)]
    pub retry_interval_secs: u64,
}

impl PushTagArgs {
    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.token.is_some() && self.repo_slug.is_none() {
            return Err("--token requires --repo-slug".to_string());
        }
        if let Some(slug) = &self.repo_slug {
            if slug.split('/').filter(|part| !part.is_empty()).count() != 2 {
                return Err(format!("Invalid repo slug '{}', expected owner/repo", slug));
            }
        }
        Ok(())
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Deploy(args) => args.validate(),
            Command::Release(args) => {
                if args.profile_id.trim().is_empty() || args.repository_id.trim().is_empty() {
                    Err("--profile-id and --repository-id cannot be empty".to_string())
                } else {
                    Ok(())
                }
            }
            Command::PushTag(args) => args.validate(),
        }
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for terminal output
    output: super::OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        let output = super::OutputManager::new(args.verbose, args.quiet);
        Self { output }
    }
}

impl RuntimeConfig {
    /// Print verbose message if in verbose mode
    pub fn verbose_println(&self, message: &str) -> std::io::Result<()> {
        self.output.verbose(message)
    }

    /// Print success message if not in quiet mode
    pub fn success_println(&self, message: &str) -> std::io::Result<()> {
        self.output.success(message)
    }

    /// Print warning message if not in quiet mode
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.output.warn(message)
    }

    /// Print progress message
    pub fn progress(&self, message: &str) -> std::io::Result<()> {
        self.output.progress(message)
    }

    /// Print section header
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        self.output.section(title)
    }

    /// Print indented text
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.output.indent(message)
    }
}

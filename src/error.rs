//! Error types for staging-repository operations.
//!
//! Every failure the workflow can reach is a [`StagingError`] variant. The
//! variants map onto a [`FailureKind`] so the workflow's terminal `Failed`
//! state can be compared without holding the error value itself.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for staging operations
pub type Result<T> = std::result::Result<T, StagingError>;

/// Main error type for all staging operations
#[derive(Error, Debug)]
pub enum StagingError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network or HTTP client failure
    #[error("Transport error calling {url}: {reason}")]
    Transport {
        /// Request URL
        url: String,
        /// Underlying client error
        reason: String,
    },

    /// Non-2xx response whose body matched no known envelope
    #[error("Unexpected HTTP {status} from {url}: {body}")]
    UnexpectedStatus {
        /// Request URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Response body matched neither a success nor an error shape
    #[error("Could not parse {context} response: {reason}")]
    Parse {
        /// Which call produced the body
        context: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Well-formed error envelope returned by the service
    #[error("Staging service rejected the request: {message}")]
    RemoteRejected {
        /// Message extracted verbatim from the envelope
        message: String,
    },

    /// No profile matched the configured name
    #[error("No staging profile named '{name}' is available to this account")]
    ProfileNotFound {
        /// Configured profile name
        name: String,
    },

    /// External signing tool failed
    #[error("Signing {} failed: {reason}", path.display())]
    SigningFailure {
        /// File being signed
        path: PathBuf,
        /// Exit status and stderr of the tool
        reason: String,
    },

    /// Status polling exhausted its attempts
    #[error("Repository {repository_id} did not reach 'closed' after {attempts} status checks")]
    CloseTimeout {
        /// Repository being closed
        repository_id: String,
        /// Number of status checks made
        attempts: u32,
    },

    /// Promotion requested for a repository that is not closed
    #[error("Repository {repository_id} is '{state}', only closed repositories can be released")]
    RepositoryNotClosed {
        /// Repository id
        repository_id: String,
        /// State reported by the service
        state: String,
    },

    /// Workflow operation called from the wrong state
    #[error("Invalid workflow transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// Artifact file name or coordinates could not be resolved
    #[error("Invalid artifact {}: {reason}", path.display())]
    InvalidArtifact {
        /// Offending file
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Git command failure during tag pushing
    #[error("git {command} failed: {reason}")]
    Git {
        /// Git subcommand
        command: String,
        /// Stderr or spawn error
        reason: String,
    },

    /// Cancellation token fired
    #[error("Workflow cancelled")]
    Cancelled,

    /// Overall deadline elapsed
    #[error("Workflow exceeded its deadline of {}s", limit.as_secs())]
    DeadlineExceeded {
        /// Configured deadline
        limit: Duration,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

/// Coarse classification of a failure, carried by the workflow's `Failed` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Parse,
    RemoteRejected,
    ProfileNotFound,
    SigningFailure,
    CloseTimeout,
    NotClosed,
    InvalidTransition,
    Cancelled,
    DeadlineExceeded,
    Configuration,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transport => "transport",
            Self::Parse => "parse",
            Self::RemoteRejected => "remote-rejected",
            Self::ProfileNotFound => "profile-not-found",
            Self::SigningFailure => "signing",
            Self::CloseTimeout => "close-timeout",
            Self::NotClosed => "not-closed",
            Self::InvalidTransition => "invalid-transition",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline-exceeded",
            Self::Configuration => "configuration",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

impl StagingError {
    /// Classify this error for the workflow's terminal state.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport { .. } | Self::UnexpectedStatus { .. } => FailureKind::Transport,
            Self::Parse { .. } => FailureKind::Parse,
            Self::RemoteRejected { .. } => FailureKind::RemoteRejected,
            Self::ProfileNotFound { .. } => FailureKind::ProfileNotFound,
            Self::SigningFailure { .. } => FailureKind::SigningFailure,
            Self::CloseTimeout { .. } => FailureKind::CloseTimeout,
            Self::RepositoryNotClosed { .. } => FailureKind::NotClosed,
            Self::InvalidTransition { .. } => FailureKind::InvalidTransition,
            Self::Cancelled => FailureKind::Cancelled,
            Self::DeadlineExceeded { .. } => FailureKind::DeadlineExceeded,
            Self::Cli(_) | Self::InvalidArtifact { .. } | Self::Git { .. } => {
                FailureKind::Configuration
            }
            Self::Io(_) => FailureKind::Io,
        }
    }

    /// Whether the close phase may be attempted again after this error.
    ///
    /// Only an exhausted poll loop and raw transport failures qualify. An
    /// unexpected status is fatal even though it classifies as transport.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CloseTimeout { .. } | Self::Transport { .. })
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            Self::ProfileNotFound { name } => vec![
                format!("Check that the account may stage into '{}'", name),
                "Pass --profile-name when the profile differs from the group id".to_string(),
            ],
            Self::SigningFailure { .. } => vec![
                "Verify MVN_PASSPHRASE and that the secret key is in the gpg keyring".to_string(),
            ],
            Self::CloseTimeout { repository_id, .. } => vec![
                format!(
                    "Inspect repository {} in the staging UI for failed close rules",
                    repository_id
                ),
                "Increase --poll-attempts or --close-retries".to_string(),
            ],
            Self::RepositoryNotClosed { .. } => {
                vec!["Wait for the close to finish, then run `release` again".to_string()]
            }
            Self::Transport { .. } | Self::UnexpectedStatus { .. } => vec![
                "Check network access and the --base-url value".to_string(),
                "Check MVN_USER / MVN_PASSWORD".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

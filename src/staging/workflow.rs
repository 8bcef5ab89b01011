//! Staging-repository lifecycle orchestration.
//!
//! [`StagingWorkflow`] drives one repository through
//! `Idle → Starting → Uploading → Closing → Polling(n) → Closed`, and, when
//! asked separately, `Closed → Promoting → Released`. Any failure moves it to
//! the absorbing `Failed` state and is returned to the caller unchanged.
//!
//! Closing is retried at two levels: the status poll loop waits for the
//! service's asynchronous close validation, and the whole close phase
//! (finish + polling) is re-issued when that loop times out.
//!
//! A repository left open by a failed run is reported, never dropped.

use crate::config::{ReleaseMode, StagingConfig};
use crate::error::{CliError, FailureKind, Result, StagingError};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::artifact::Artifact;
use super::checksum::{DigestAlgorithm, write_digest};
use super::client::{Method, RemoteClient, RemoteResponse, RequestBody};
use super::parser::{self, RepositoryState, RepositoryStatus, StagingProfile};
use super::retry::{Backoff, RetryPolicy};
use super::signer::ArtifactSigner;

/// Longest response excerpt carried in an error
const BODY_EXCERPT: usize = 512;

/// Position of a workflow in the repository lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Starting,
    Uploading,
    Closing,
    /// Number of status checks already completed in this close attempt
    Polling(u32),
    Closed,
    Promoting,
    Released,
    Failed {
        kind: FailureKind,
        message: String,
    },
}

impl WorkflowState {
    /// `Released` and `Failed` accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Failed { .. })
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Starting => f.write_str("starting"),
            Self::Uploading => f.write_str("uploading"),
            Self::Closing => f.write_str("closing"),
            Self::Polling(n) => write!(f, "polling({})", n),
            Self::Closed => f.write_str("closed"),
            Self::Promoting => f.write_str("promoting"),
            Self::Released => f.write_str("released"),
            Self::Failed { kind, .. } => write!(f, "failed({})", kind),
        }
    }
}

/// Repository handle produced by a run that reached `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRepository {
    pub profile_id: String,
    pub repository_id: String,
}

/// Drives one staging repository through its lifecycle.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use kodegen_bundler_staging::config::StagingConfig;
/// use kodegen_bundler_staging::staging::{Artifact, GpgSigner, HttpClient, StagingWorkflow};
///
/// # async fn example(config: StagingConfig, artifacts: Vec<Artifact>) -> kodegen_bundler_staging::Result<()> {
/// let client = HttpClient::new(config.credentials().clone(), config.request_timeout())?;
/// let signer = GpgSigner::detect("passphrase")?;
///
/// let mut workflow = StagingWorkflow::new(config, Arc::new(client), Arc::new(signer));
/// let staged = workflow.run(&artifacts).await?;
/// workflow.promote(&staged).await?;
/// # Ok(())
/// # }
/// ```
pub struct StagingWorkflow {
    config: StagingConfig,
    client: Arc<dyn RemoteClient>,
    signer: Option<Arc<dyn ArtifactSigner>>,
    cancel: CancellationToken,
    state: WorkflowState,
    history: Vec<WorkflowState>,
    staged: Option<StagedRepository>,
    /// `staged` was opened by `run`, not attached
    opened: bool,
}

impl fmt::Debug for StagingWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagingWorkflow")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("staged", &self.staged)
            .field("opened", &self.opened)
            .finish()
    }
}

impl StagingWorkflow {
    /// Creates an idle workflow that can stage, close and promote.
    pub fn new(
        config: StagingConfig,
        client: Arc<dyn RemoteClient>,
        signer: Arc<dyn ArtifactSigner>,
    ) -> Self {
        Self::build(config, client, Some(signer))
    }

    /// Creates an idle workflow for [`attach`](Self::attach) and
    /// [`promote`](Self::promote) only. It never uploads, so it needs no
    /// signer and no profile name.
    pub fn for_release(config: StagingConfig, client: Arc<dyn RemoteClient>) -> Self {
        Self::build(config, client, None)
    }

    fn build(
        config: StagingConfig,
        client: Arc<dyn RemoteClient>,
        signer: Option<Arc<dyn ArtifactSigner>>,
    ) -> Self {
        Self {
            config,
            client,
            signer,
            cancel: CancellationToken::new(),
            state: WorkflowState::Idle,
            history: vec![WorkflowState::Idle],
            staged: None,
            opened: false,
        }
    }

    /// Uses `token` to abort waits and remote calls.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[WorkflowState] {
        &self.history
    }

    /// Repository opened (or attached) by this workflow, if any.
    pub fn staged_repository(&self) -> Option<&StagedRepository> {
        self.staged.as_ref()
    }

    /// Repository this workflow opened itself. Attached repositories are
    /// never reported here.
    pub fn opened_repository(&self) -> Option<&StagedRepository> {
        self.staged.as_ref().filter(|_| self.opened)
    }

    pub fn config(&self) -> &StagingConfig {
        &self.config
    }

    /// Opens a repository, uploads `artifacts` and closes it.
    ///
    /// Ends in `Closed` on success. Promotion is a separate step, see
    /// [`StagingWorkflow::promote`].
    pub async fn run(&mut self, artifacts: &[Artifact]) -> Result<StagedRepository> {
        self.expect_state(&WorkflowState::Idle, WorkflowState::Starting)?;

        let Some(signer) = self.signer.clone() else {
            return Err(StagingError::Cli(CliError::InvalidArguments {
                reason: "A release-only workflow cannot stage artifacts".to_string(),
            }));
        };
        let Some(profile_name) = self.config.profile_name().map(str::to_string) else {
            return Err(StagingError::Cli(CliError::MissingArgument {
                argument: "--profile-name".to_string(),
            }));
        };
        if artifacts.is_empty() {
            return Err(StagingError::Cli(CliError::InvalidArguments {
                reason: "No artifacts to stage".to_string(),
            }));
        }

        let deadline = self.config.deadline();
        let phases = self.run_phases(artifacts, &profile_name, signer.as_ref());
        let outcome = match deadline {
            Some(limit) => {
                match tokio::time::timeout(limit, phases).await {
                    Ok(result) => result,
                    Err(_elapsed) => Err(StagingError::DeadlineExceeded { limit }),
                }
            }
            None => phases.await,
        };

        outcome.map_err(|e| self.fail(e))
    }

    /// Resumes from an existing repository that the service reports closed.
    ///
    /// Lets promotion run as its own invocation, after an earlier `run`.
    pub async fn attach(&mut self, staged: StagedRepository) -> Result<()> {
        self.expect_state(&WorkflowState::Idle, WorkflowState::Closed)?;
        self.staged = Some(staged.clone());

        let outcome = match self.fetch_status(&staged).await {
            Ok(status) if status.is_closed() => Ok(()),
            Ok(status) => Err(StagingError::RepositoryNotClosed {
                repository_id: staged.repository_id.clone(),
                state: describe(&status),
            }),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                self.transition(WorkflowState::Closed);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Promotes a closed repository: `Closed → Promoting → Released`.
    pub async fn promote(&mut self, staged: &StagedRepository) -> Result<()> {
        self.expect_state(&WorkflowState::Closed, WorkflowState::Promoting)?;
        self.transition(WorkflowState::Promoting);

        match self.release(staged).await {
            Ok(()) => {
                self.transition(WorkflowState::Released);
                log::info!("Repository {} released", staged.repository_id);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn run_phases(
        &mut self,
        artifacts: &[Artifact],
        profile_name: &str,
        signer: &dyn ArtifactSigner,
    ) -> Result<StagedRepository> {
        self.transition(WorkflowState::Starting);
        let profile = self.resolve_profile(profile_name).await?;
        let repository_id = self.start_repository(&profile).await?;

        let staged = StagedRepository {
            profile_id: profile.id,
            repository_id,
        };
        self.staged = Some(staged.clone());
        self.opened = true;

        self.transition(WorkflowState::Uploading);
        self.upload_artifacts(&staged.repository_id, artifacts, signer)
            .await?;

        self.close(&staged).await?;
        self.transition(WorkflowState::Closed);
        log::info!("Repository {} closed", staged.repository_id);

        Ok(staged)
    }

    async fn resolve_profile(&self, wanted: &str) -> Result<StagingProfile> {
        let url = self.config.endpoints().profiles();
        let response = self.call(&url, Method::Get, None).await?;
        let profiles = interpret(&url, response, parser::parse_profiles)?;

        let profile = profiles
            .into_iter()
            .find(|profile| profile.name == wanted)
            .ok_or_else(|| StagingError::ProfileNotFound {
                name: wanted.to_string(),
            })?;

        log::info!("Found profile id {} for {}", profile.id, profile.name);
        Ok(profile)
    }

    async fn start_repository(&self, profile: &StagingProfile) -> Result<String> {
        log::info!("Starting repository...");
        let url = self.config.endpoints().start(&profile.id);
        let body = RequestBody::xml(promote_request(self.config.description(), None));
        let response = self.call(&url, Method::Post, Some(body)).await?;
        let repository_id = interpret(&url, response, parser::parse_started_repository)?;

        log::info!("Opened staging repository {}", repository_id);
        Ok(repository_id)
    }

    /// Uploads each artifact followed by its signature and checksums.
    async fn upload_artifacts(
        &self,
        repository_id: &str,
        artifacts: &[Artifact],
        signer: &dyn ArtifactSigner,
    ) -> Result<()> {
        for artifact in artifacts {
            self.upload(repository_id, artifact).await?;

            let signature = signer.sign(artifact.local_path()).await?;
            self.upload(repository_id, &artifact.sidecar("asc", signature))
                .await?;

            for algorithm in [DigestAlgorithm::Md5, DigestAlgorithm::Sha1] {
                let digest = write_digest(artifact.local_path(), algorithm).await?;
                self.upload(
                    repository_id,
                    &artifact.sidecar(algorithm.extension(), digest),
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn upload(&self, repository_id: &str, artifact: &Artifact) -> Result<()> {
        self.ensure_active()?;
        let url = self.config.endpoints().deploy(repository_id, artifact);
        log::info!("Uploading {} to {}", artifact.local_path().display(), url);

        let response = tokio::select! {
            _ = self.cancel.cancelled() => return Err(StagingError::Cancelled),
            response = self.client.upload_file(&url, artifact.local_path()) => response?,
        };

        interpret(&url, response, |body| match parser::error_message(body) {
            Some(message) => Err(StagingError::RemoteRejected { message }),
            None => Ok(()),
        })
    }

    /// Outer loop: re-issues finish + polling while the close times out.
    async fn close(&mut self, staged: &StagedRepository) -> Result<()> {
        let poll = self.config.poll();
        let cancel = self.cancel.clone();
        let mut backoff = Backoff::new(
            RetryPolicy::new(poll.close_attempts, poll.close_retry_interval),
            &cancel,
            "Close",
        );

        loop {
            backoff.ensure_active()?;
            match self.close_once(staged).await {
                Ok(()) => return Ok(()),
                Err(e) => backoff.retry_after(e, StagingError::is_retryable).await?,
            }
        }
    }

    async fn close_once(&mut self, staged: &StagedRepository) -> Result<()> {
        self.transition(WorkflowState::Closing);
        log::info!("Closing repository {}...", staged.repository_id);

        let url = self.config.endpoints().finish(&staged.profile_id);
        let body = RequestBody::xml(promote_request(
            self.config.description(),
            Some(&staged.repository_id),
        ));
        let response = self.call(&url, Method::Post, Some(body)).await?;
        interpret(&url, response, |body| {
            parser::parse_acknowledgement(body, "finish")
        })?;

        self.poll_until_closed(staged).await
    }

    /// Inner loop: checks status up to `max_attempts` times.
    async fn poll_until_closed(&mut self, staged: &StagedRepository) -> Result<()> {
        let poll = self.config.poll();
        let cancel = self.cancel.clone();
        let mut backoff = Backoff::new(
            RetryPolicy::new(poll.max_attempts, poll.interval),
            &cancel,
            "Status check",
        );

        loop {
            backoff.ensure_active()?;
            self.transition(WorkflowState::Polling(backoff.attempt() - 1));

            let error = match self.fetch_status(staged).await {
                Ok(status) if status.is_closed() => return Ok(()),
                Ok(status) if status.state == RepositoryState::Dropped => {
                    return Err(StagingError::RemoteRejected {
                        message: format!("Repository {} was dropped", staged.repository_id),
                    });
                }
                Ok(status) => {
                    log::info!(
                        "Repository {} is {} (check {}/{})",
                        staged.repository_id,
                        describe(&status),
                        backoff.attempt(),
                        backoff.max_attempts()
                    );
                    close_timeout(staged, backoff.attempt())
                }
                // Status unknown counts as not closed
                Err(e) if e.is_retryable() => {
                    log::warn!("Status check failed: {}", e);
                    close_timeout(staged, backoff.attempt())
                }
                Err(e) => return Err(e),
            };

            backoff.retry_after(error, StagingError::is_retryable).await?;
        }
    }

    async fn fetch_status(&self, staged: &StagedRepository) -> Result<RepositoryStatus> {
        let url = self
            .config
            .endpoints()
            .profile_repositories(&staged.profile_id);
        let response = self.call(&url, Method::Get, None).await?;
        interpret(&url, response, |body| {
            parser::parse_repository_state(body, &staged.repository_id)
        })
    }

    async fn release(&self, staged: &StagedRepository) -> Result<()> {
        log::info!("Releasing repository {}...", staged.repository_id);
        let description = self.config.description();

        let (url, body) = match self.config.release_mode() {
            ReleaseMode::Profile => (
                self.config.endpoints().promote(&staged.profile_id),
                RequestBody::xml(promote_request(description, Some(&staged.repository_id))),
            ),
            ReleaseMode::Bulk => {
                let payload = serde_json::json!({
                    "data": {
                        "stagedRepositoryIds": [staged.repository_id],
                        "description": description,
                    }
                });
                (
                    self.config.endpoints().bulk_promote(),
                    RequestBody::json(payload.to_string()),
                )
            }
        };

        let response = self.call(&url, Method::Post, Some(body)).await?;
        interpret(&url, response, |body| {
            parser::parse_acknowledgement(body, "promote")
        })
    }

    async fn call(
        &self,
        url: &str,
        method: Method,
        body: Option<RequestBody>,
    ) -> Result<RemoteResponse> {
        self.ensure_active()?;
        tokio::select! {
            _ = self.cancel.cancelled() => Err(StagingError::Cancelled),
            response = self.client.request(url, method, body) => response,
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(StagingError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn expect_state(&self, expected: &WorkflowState, next: WorkflowState) -> Result<()> {
        if &self.state == expected {
            Ok(())
        } else {
            Err(StagingError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            })
        }
    }

    fn transition(&mut self, next: WorkflowState) {
        log::debug!("Workflow: {} -> {}", self.state, next);
        self.state = next.clone();
        self.history.push(next);
    }

    fn fail(&mut self, error: StagingError) -> StagingError {
        if let Some(staged) = self.opened_repository() {
            log::warn!(
                "Staging repository {} (profile {}) was left {}; drop or release it manually",
                staged.repository_id,
                staged.profile_id,
                self.state
            );
        }
        log::error!("Workflow failed in state {}: {}", self.state, error);

        self.transition(WorkflowState::Failed {
            kind: error.kind(),
            message: error.to_string(),
        });
        error
    }
}

/// Maps a raw response onto the parser's result.
///
/// Non-2xx replies are reported through their error envelope when they have
/// one, and as [`StagingError::UnexpectedStatus`] otherwise.
fn interpret<T, F>(url: &str, response: RemoteResponse, parse: F) -> Result<T>
where
    F: FnOnce(&str) -> Result<T>,
{
    if response.is_success() {
        return parse(&response.body);
    }

    if let Some(message) = parser::error_message(&response.body) {
        return Err(StagingError::RemoteRejected { message });
    }

    let mut body = response.body;
    if body.len() > BODY_EXCERPT {
        let mut cut = BODY_EXCERPT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }

    Err(StagingError::UnexpectedStatus {
        url: url.to_string(),
        status: response.status,
        body,
    })
}

/// `<promoteRequest>` envelope shared by start, finish and promote.
pub fn promote_request(description: &str, repository_id: Option<&str>) -> String {
    let mut data = String::new();
    if let Some(id) = repository_id {
        data.push_str(&format!(
            "<stagedRepositoryId>{}</stagedRepositoryId>",
            xml_escape(id)
        ));
    }
    data.push_str(&format!(
        "<description>{}</description>",
        xml_escape(description)
    ));
    format!("<promoteRequest><data>{}</data></promoteRequest>", data)
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn close_timeout(staged: &StagedRepository, attempts: u32) -> StagingError {
    StagingError::CloseTimeout {
        repository_id: staged.repository_id.clone(),
        attempts,
    }
}

fn describe(status: &RepositoryStatus) -> String {
    if status.transitioning {
        format!("{} (transitioning)", status.state)
    } else {
        status.state.to_string()
    }
}

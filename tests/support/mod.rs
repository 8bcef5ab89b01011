//! In-memory fakes for the workflow's collaborators (testing only)
//!
//! `MockClient` answers from scripted responses and records every call;
//! `MockSigner` writes placeholder `.asc` files.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use kodegen_bundler_staging::config::{Credentials, PollSettings, StagingConfig};
use kodegen_bundler_staging::staging::{
    Artifact, ArtifactSigner, Method, RemoteClient, RemoteResponse, RequestBody,
};
use kodegen_bundler_staging::{Result, StagingError};

pub const BASE_URL: &str = "https://staging.example.org/service/local/staging";
pub const PROFILE_ID: &str = "12ab";
pub const PROFILE_NAME: &str = "com.example";
pub const REPOSITORY_ID: &str = "comexample-1001";

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

pub fn profiles_xml() -> String {
    format!(
        "<stagingProfiles><data>\
           <stagingProfile><id>99zz</id><name>org.other</name></stagingProfile>\
           <stagingProfile><id>{}</id><name>{}</name></stagingProfile>\
         </data></stagingProfiles>",
        PROFILE_ID, PROFILE_NAME
    )
}

pub fn started_xml() -> String {
    format!(
        "<promoteResponse><data><stagedRepositoryId>{}</stagedRepositoryId>\
         <description>com.example upload</description></data></promoteResponse>",
        REPOSITORY_ID
    )
}

pub fn status_xml(state: &str, transitioning: bool) -> String {
    format!(
        "<stagingRepositories><data>\
           <stagingProfileRepository>\
             <repositoryId>comexample-0999</repositoryId><type>released</type>\
           </stagingProfileRepository>\
           <stagingProfileRepository>\
             <profileId>{}</profileId><repositoryId>{}</repositoryId>\
             <type>{}</type><transitioning>{}</transitioning>\
           </stagingProfileRepository>\
         </data></stagingRepositories>",
        PROFILE_ID, REPOSITORY_ID, state, transitioning
    )
}

pub fn nexus_error(message: &str) -> String {
    format!(
        "<nexus-error><errors><error><id>*</id><msg>{}</msg></error></errors></nexus-error>",
        message
    )
}

// ---------------------------------------------------------------------------
// MockClient
// ---------------------------------------------------------------------------

/// One status-endpoint reply in a scripted sequence.
#[derive(Debug, Clone)]
pub enum StatusReply {
    State(&'static str),
    Transitioning(&'static str),
    TransportError,
}

/// A recorded request.
#[derive(Debug, Clone)]
pub struct Call {
    pub verb: &'static str,
    pub url: String,
    pub body: Option<String>,
    pub at: Instant,
}

impl Call {
    pub fn endpoint(&self) -> &'static str {
        endpoint_of(&self.url)
    }

    /// File name at the end of an upload URL.
    pub fn file_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or_default()
    }
}

/// Classifies a URL by the staging operation it addresses.
pub fn endpoint_of(url: &str) -> &'static str {
    let path = url.strip_prefix(BASE_URL).unwrap_or(url);
    if path.starts_with("/deployByRepositoryId/") {
        "upload"
    } else if path == "/profiles" {
        "profiles"
    } else if path.ends_with("/start") {
        "start"
    } else if path.ends_with("/finish") {
        "finish"
    } else if path.ends_with("/promote") {
        "promote"
    } else if path.starts_with("/profile_repositories/") {
        "status"
    } else {
        "unknown"
    }
}

#[derive(Debug)]
struct Script {
    profiles: RemoteResponse,
    start: RemoteResponse,
    finish: RemoteResponse,
    promote: RemoteResponse,
    upload: RemoteResponse,
    statuses: VecDeque<StatusReply>,
}

/// Scripted [`RemoteClient`] that records every call.
///
/// The status script is consumed one reply per check; its last entry
/// repeats once the others are used up.
#[derive(Debug)]
pub struct MockClient {
    script: Mutex<Script>,
    calls: Mutex<Vec<Call>>,
}

impl MockClient {
    /// Happy path: the profile exists and the repository closes at once.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                profiles: RemoteResponse::new(200, profiles_xml()),
                start: RemoteResponse::new(201, started_xml()),
                finish: RemoteResponse::new(201, ""),
                promote: RemoteResponse::new(201, ""),
                upload: RemoteResponse::new(201, ""),
                statuses: VecDeque::from([StatusReply::State("closed")]),
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_statuses(self, statuses: Vec<StatusReply>) -> Self {
        self.script.lock().unwrap().statuses = statuses.into();
        self
    }

    pub fn with_profiles(self, response: RemoteResponse) -> Self {
        self.script.lock().unwrap().profiles = response;
        self
    }

    pub fn with_start(self, response: RemoteResponse) -> Self {
        self.script.lock().unwrap().start = response;
        self
    }

    pub fn with_promote(self, response: RemoteResponse) -> Self {
        self.script.lock().unwrap().promote = response;
        self
    }

    pub fn with_upload(self, response: RemoteResponse) -> Self {
        self.script.lock().unwrap().upload = response;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.endpoint() == endpoint)
            .count()
    }

    /// Endpoint names in call order.
    pub fn sequence(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|call| call.endpoint().to_string())
            .collect()
    }

    fn record(&self, url: &str, verb: &'static str, body: Option<String>) {
        self.calls.lock().unwrap().push(Call {
            verb,
            url: url.to_string(),
            body,
            at: Instant::now(),
        });
    }

    fn next_status(&self, url: &str) -> Result<RemoteResponse> {
        let mut script = self.script.lock().unwrap();
        let reply = if script.statuses.len() > 1 {
            script.statuses.pop_front()
        } else {
            script.statuses.front().cloned()
        };

        match reply {
            Some(StatusReply::State(state)) => Ok(RemoteResponse::new(200, status_xml(state, false))),
            Some(StatusReply::Transitioning(state)) => {
                Ok(RemoteResponse::new(200, status_xml(state, true)))
            }
            Some(StatusReply::TransportError) | None => Err(StagingError::Transport {
                url: url.to_string(),
                reason: "connection reset by peer".to_string(),
            }),
        }
    }
}

#[async_trait]
impl RemoteClient for MockClient {
    async fn request(
        &self,
        url: &str,
        method: Method,
        body: Option<RequestBody>,
    ) -> Result<RemoteResponse> {
        let verb = match method {
            Method::Get => "GET",
            Method::Post => "POST",
        };
        self.record(url, verb, body.map(|b| b.content));

        let endpoint = endpoint_of(url);
        if endpoint == "status" {
            return self.next_status(url);
        }

        let script = self.script.lock().unwrap();
        match endpoint {
            "profiles" => Ok(script.profiles.clone()),
            "start" => Ok(script.start.clone()),
            "finish" => Ok(script.finish.clone()),
            "promote" => Ok(script.promote.clone()),
            _ => Ok(RemoteResponse::new(404, "not found")),
        }
    }

    async fn upload_file(&self, url: &str, path: &Path) -> Result<RemoteResponse> {
        assert!(path.is_file(), "uploaded file must exist: {}", path.display());
        self.record(url, "PUT", None);
        Ok(self.script.lock().unwrap().upload.clone())
    }
}

// ---------------------------------------------------------------------------
// MockSigner
// ---------------------------------------------------------------------------

/// Writes a placeholder signature beside each file.
#[derive(Debug, Default)]
pub struct MockSigner {
    fail_on: Option<String>,
    signed: Mutex<Vec<PathBuf>>,
}

impl MockSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails for files whose name ends with `suffix`.
    pub fn failing_on(suffix: &str) -> Self {
        Self {
            fail_on: Some(suffix.to_string()),
            signed: Mutex::new(Vec::new()),
        }
    }

    pub fn signed(&self) -> Vec<PathBuf> {
        self.signed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactSigner for MockSigner {
    async fn sign(&self, path: &Path) -> Result<PathBuf> {
        if let Some(suffix) = &self.fail_on {
            if path.to_string_lossy().ends_with(suffix.as_str()) {
                return Err(StagingError::SigningFailure {
                    path: path.to_path_buf(),
                    reason: "gpg exited with exit status: 2: bad passphrase".to_string(),
                });
            }
        }

        let mut name = path.as_os_str().to_os_string();
        name.push(".asc");
        let signature = PathBuf::from(name);
        std::fs::write(&signature, "-----BEGIN PGP SIGNATURE-----\n")?;
        self.signed.lock().unwrap().push(path.to_path_buf());
        Ok(signature)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// `lib-1.0.0.pom` and `lib-1.0.0.jar` in a fresh directory.
pub fn artifact_dir() -> (tempfile::TempDir, Vec<Artifact>) {
    let dir = tempfile::tempdir().unwrap();
    let mut artifacts = Vec::new();
    for (name, contents) in [
        ("lib-1.0.0.pom", "<project><artifactId>lib</artifactId></project>"),
        ("lib-1.0.0.jar", "PK\u{3}\u{4} not really a jar"),
    ] {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        artifacts.push(Artifact::from_file("com.example", "1.0.0", path).unwrap());
    }
    (dir, artifacts)
}

pub fn poll_settings(max_attempts: u32, close_attempts: u32) -> PollSettings {
    PollSettings {
        max_attempts,
        interval: Duration::from_secs(60),
        close_attempts,
        close_retry_interval: Duration::from_secs(30),
    }
}

pub fn config(poll: PollSettings) -> StagingConfig {
    StagingConfig::builder()
        .base_url(BASE_URL)
        .credentials(Credentials::new("deployer", "secret"))
        .profile_name(PROFILE_NAME)
        .poll(poll)
        .build()
        .unwrap()
}

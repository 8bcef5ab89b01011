//! HTTP access to the staging service.
//!
//! [`RemoteClient`] is the seam between the workflow and the network. The
//! production implementation is [`HttpClient`] (reqwest); tests substitute an
//! in-memory fake. Clients return the raw body and status and never
//! interpret the body.

use crate::config::Credentials;
use crate::error::{Result, StagingError};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;

/// Method of a control request. File uploads go through
/// [`RemoteClient::upload_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Media type of a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Xml,
    Json,
    Jar,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xml => "application/xml",
            Self::Json => "application/json",
            Self::Jar => "application/x-jar",
        }
    }
}

/// Body of a control request.
#[derive(Debug, Clone)]
pub struct RequestBody {
    pub content: String,
    pub content_type: ContentType,
}

impl RequestBody {
    pub fn xml(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: ContentType::Xml,
        }
    }

    pub fn json(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: ContentType::Json,
        }
    }
}

/// Raw reply from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
}

impl RemoteResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Authenticated access to the staging service.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Issues a control request and returns the raw response.
    async fn request(
        &self,
        url: &str,
        method: Method,
        body: Option<RequestBody>,
    ) -> Result<RemoteResponse>;

    /// Uploads a file from disk and returns the raw response.
    async fn upload_file(&self, url: &str, path: &Path) -> Result<RemoteResponse>;
}

/// reqwest-backed [`RemoteClient`] using HTTP basic authentication.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    credentials: Credentials,
}

impl HttpClient {
    /// Builds a client with the given per-request timeout.
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StagingError::Transport {
                url: String::new(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { inner, credentials })
    }

    async fn send(&self, url: &str, request: reqwest::RequestBuilder) -> Result<RemoteResponse> {
        let response = request
            .basic_auth(self.credentials.user(), Some(self.credentials.password()))
            .send()
            .await
            .map_err(|e| transport(url, e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| transport(url, e))?;
        log::debug!("{} -> HTTP {} ({} bytes)", url, status, body.len());

        Ok(RemoteResponse { status, body })
    }
}

#[async_trait]
impl RemoteClient for HttpClient {
    async fn request(
        &self,
        url: &str,
        method: Method,
        body: Option<RequestBody>,
    ) -> Result<RemoteResponse> {
        log::debug!("{:?} {}", method, url);

        let mut request = match method {
            Method::Get => self.inner.get(url),
            Method::Post => self.inner.post(url),
        };

        request = match body {
            Some(body) => request
                .header(reqwest::header::CONTENT_TYPE, body.content_type.as_str())
                .header(reqwest::header::ACCEPT, body.content_type.as_str())
                .body(body.content),
            None => request.header(reqwest::header::ACCEPT, ContentType::Xml.as_str()),
        };

        self.send(url, request).await
    }

    async fn upload_file(&self, url: &str, path: &Path) -> Result<RemoteResponse> {
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        log::debug!("PUT {} ({} bytes from {})", url, length, path.display());

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let request = self
            .inner
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, ContentType::Jar.as_str())
            .header(reqwest::header::CONTENT_LENGTH, length)
            .body(body);

        self.send(url, request).await
    }
}

fn transport(url: &str, error: reqwest::Error) -> StagingError {
    StagingError::Transport {
        url: url.to_string(),
        reason: error.to_string(),
    }
}

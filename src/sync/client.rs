//! HTTP client for the GitHub contents API.
//!
//! The mirror is a single file in `owner/repo@branch`. Reads return the
//! decoded content and its blob SHA; writes send the SHA back so GitHub can
//! reject a write based on a stale read.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{RemoteError, SyncError};
use crate::models::SyncSettings;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_REMOTE_PATH: &str = "data.json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Where the mirror lives and how long to wait for GitHub, independent of credentials.
#[derive(Debug, Clone)]
pub struct RemoteOptions {
    pub api_url: String,
    pub path: String,
    pub timeout: Duration,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            path: DEFAULT_REMOTE_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RemoteOptions {
    /// Builds the shared HTTP client.
    pub fn http_client(&self) -> Result<reqwest::Client, RemoteError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("latebase/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))
    }
}

/// A file read from the mirror.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteBlob {
    pub content: Vec<u8>,
    /// Concurrency token for the next write
    pub sha: String,
}

/// Repository metadata returned by the connectivity check.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    pub full_name: String,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub private: bool,
}

#[derive(Deserialize)]
struct ContentResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

#[derive(Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

/// Client for one mirror file, bound to a repository and a token.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    owner: String,
    repo: String,
    branch: String,
    path: String,
    token: String,
}

impl GitHubClient {
    /// Creates a client from the stored settings.
    ///
    /// Returns an error if sync is not configured.
    pub fn from_settings(
        http: reqwest::Client,
        options: &RemoteOptions,
        settings: &SyncSettings,
    ) -> Result<Self, SyncError> {
        if !settings.is_configured() {
            return Err(SyncError::NotConfigured);
        }
        let token = settings.token.clone().ok_or(SyncError::NotConfigured)?;

        Ok(Self {
            http,
            api_url: options.api_url.trim_end_matches('/').to_string(),
            owner: settings.owner.trim().to_string(),
            repo: settings.repo.trim().to_string(),
            branch: settings.branch.trim().to_string(),
            path: options.path.trim_matches('/').to_string(),
            token,
        })
    }

    pub fn repo_slug(&self) -> String {
        format!("{}/{}@{}", self.owner, self.repo, self.branch)
    }

    /// Reads the mirror file.
    ///
    /// Returns `Ok(None)` if the file doesn't exist yet.
    pub async fn fetch_blob(&self) -> Result<Option<RemoteBlob>, RemoteError> {
        let url = self.contents_url();
        let response = self
            .authorized(self.http.get(&url))
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(%url, %status, "GET contents");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(error_for(status, response).await);
        }

        let body: ContentResponse = response.json().await?;
        if body.encoding != "base64" {
            return Err(RemoteError::Decode(format!(
                "unsupported content encoding '{}'",
                body.encoding
            )));
        }

        Ok(Some(RemoteBlob {
            content: decode_content(&body.content)?,
            sha: body.sha,
        }))
    }

    /// Creates or replaces the mirror file and returns its new SHA.
    ///
    /// `sha` must be the token of the version being replaced, or `None` when
    /// the file doesn't exist yet.
    pub async fn put_blob(
        &self,
        content: &[u8],
        sha: Option<&str>,
        message: &str,
    ) -> Result<String, RemoteError> {
        let url = self.contents_url();
        let body = PutRequest {
            message,
            content: BASE64.encode(content),
            sha,
            branch: &self.branch,
        };

        let response = self.authorized(self.http.put(&url)).json(&body).send().await?;

        let status = response.status();
        tracing::debug!(%url, %status, with_sha = sha.is_some(), "PUT contents");

        match status {
            s if s.is_success() => {
                let body: PutResponse = response.json().await?;
                Ok(body.content.sha)
            }
            StatusCode::NOT_FOUND => Err(RemoteError::NotFound(self.repo_slug())),
            s => Err(error_for(s, response).await),
        }
    }

    /// Checks that the repository is reachable with the current token.
    pub async fn check_access(&self) -> Result<RepoInfo, RemoteError> {
        let url = format!(
            "{}/repos/{}/{}",
            self.api_url,
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.repo)
        );
        let response = self.authorized(self.http.get(&url)).send().await?;

        let status = response.status();
        tracing::debug!(%url, %status, "GET repository");

        match status {
            s if s.is_success() => Ok(response.json().await?),
            StatusCode::NOT_FOUND => Err(RemoteError::NotFound(self.repo_slug())),
            s => Err(error_for(s, response).await),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        if let Ok(mut value) = HeaderValue::from_str(&format!("Bearer {}", self.token)) {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        request.headers(headers)
    }

    fn contents_url(&self) -> String {
        let path = self
            .path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url,
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.repo),
            path
        )
    }
}

/// Maps a non-success status to an error, reading GitHub's message when present.
async fn error_for(status: StatusCode, response: Response) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Auth(status),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => RemoteError::Conflict,
        _ => {
            let message = response
                .json::<ApiMessage>()
                .await
                .map(|m| m.message)
                .unwrap_or_else(|_| "Unknown API error".to_string());
            RemoteError::Api { status, message }
        }
    }
}

/// GitHub wraps base64 content at 60 columns; the line breaks must go before decoding.
fn decode_content(content: &str) -> Result<Vec<u8>, RemoteError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64
        .decode(compact)
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

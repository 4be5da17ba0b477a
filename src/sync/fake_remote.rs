//! In-process stand-in for the GitHub contents API, used by tests.
//!
//! Enforces the same rules the real service applies to a single file:
//! bearer auth, SHA match on update, SHA required on update and refused on
//! create.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::client::{RemoteOptions, DEFAULT_REMOTE_PATH};

pub const GOOD_TOKEN: &str = "ghp_good_token";

#[derive(Default)]
struct FakeState {
    file: Option<(Vec<u8>, String)>,
    last_message: Option<String>,
    last_branch: Option<String>,
    puts: usize,
    active_puts: usize,
    max_active_puts: usize,
    put_delay: Duration,
    version: u64,
}

type Shared = Arc<Mutex<FakeState>>;

#[derive(Deserialize)]
struct PutBody {
    message: String,
    content: String,
    sha: Option<String>,
    branch: String,
}

pub struct FakeGitHub {
    base_url: String,
    state: Shared,
    handle: JoinHandle<()>,
}

impl FakeGitHub {
    pub async fn start() -> Self {
        let state: Shared = Arc::default();

        let app = Router::new()
            .route("/repos/{owner}/{repo}", get(repo_info))
            .route(
                "/repos/{owner}/{repo}/contents/{*path}",
                get(get_contents).put(put_contents),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    pub fn options(&self) -> RemoteOptions {
        RemoteOptions {
            api_url: self.base_url.clone(),
            path: DEFAULT_REMOTE_PATH.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn content(&self) -> Option<Vec<u8>> {
        self.state.lock().unwrap().file.as_ref().map(|(c, _)| c.clone())
    }

    pub fn sha(&self) -> Option<String> {
        self.state.lock().unwrap().file.as_ref().map(|(_, s)| s.clone())
    }

    pub fn last_message(&self) -> Option<String> {
        self.state.lock().unwrap().last_message.clone()
    }

    pub fn last_branch(&self) -> Option<String> {
        self.state.lock().unwrap().last_branch.clone()
    }

    /// Number of accepted writes.
    pub fn put_count(&self) -> usize {
        self.state.lock().unwrap().puts
    }

    /// Highest number of writes the server saw at the same time.
    pub fn max_concurrent_puts(&self) -> usize {
        self.state.lock().unwrap().max_active_puts
    }

    pub fn set_put_delay(&self, delay: Duration) {
        self.state.lock().unwrap().put_delay = delay;
    }

    /// Simulates a write by another client, returning the new SHA.
    pub fn overwrite(&self, content: &[u8]) -> String {
        let mut state = self.state.lock().unwrap();
        store(&mut state, content.to_vec())
    }
}

impl Drop for FakeGitHub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn store(state: &mut FakeState, content: Vec<u8>) -> String {
    state.version += 1;
    let mut hasher = Sha256::new();
    hasher.update(state.version.to_be_bytes());
    hasher.update(&content);
    let sha: String = hasher
        .finalize()
        .iter()
        .take(20)
        .map(|b| format!("{:02x}", b))
        .collect();
    state.file = Some((content, sha.clone()));
    sha
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", GOOD_TOKEN))
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

async fn repo_info(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return message(StatusCode::UNAUTHORIZED, "Bad credentials");
    }
    Json(json!({
        "full_name": "latebase/catalog",
        "default_branch": "main",
        "private": true
    }))
    .into_response()
}

async fn get_contents(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return message(StatusCode::UNAUTHORIZED, "Bad credentials");
    }
    let state = state.lock().unwrap();
    match &state.file {
        None => message(StatusCode::NOT_FOUND, "Not Found"),
        Some((content, sha)) => {
            // GitHub wraps the payload at 60 columns
            let encoded = BASE64.encode(content);
            let wrapped = encoded
                .as_bytes()
                .chunks(60)
                .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                .collect::<Vec<_>>()
                .join("\n");
            Json(json!({
                "sha": sha,
                "content": wrapped,
                "encoding": "base64"
            }))
            .into_response()
        }
    }
}

async fn put_contents(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<PutBody>,
) -> Response {
    if !authorized(&headers) {
        return message(StatusCode::UNAUTHORIZED, "Bad credentials");
    }

    let delay = {
        let mut state = state.lock().unwrap();
        state.active_puts += 1;
        state.max_active_puts = state.max_active_puts.max(state.active_puts);
        state.put_delay
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mut state = state.lock().unwrap();
    state.active_puts -= 1;

    let Ok(content) = BASE64.decode(&body.content) else {
        return message(StatusCode::UNPROCESSABLE_ENTITY, "content is not valid Base64");
    };

    let current = state.file.as_ref().map(|(_, sha)| sha.clone());
    let created = match (current, body.sha) {
        (None, None) => true,
        (None, Some(_)) => {
            return message(StatusCode::UNPROCESSABLE_ENTITY, "sha does not match");
        }
        (Some(_), None) => {
            return message(StatusCode::UNPROCESSABLE_ENTITY, "\"sha\" wasn't supplied.");
        }
        (Some(current), Some(given)) if current != given => {
            return message(StatusCode::CONFLICT, "data.json does not match");
        }
        (Some(_), Some(_)) => false,
    };

    let sha = store(&mut state, content);
    state.puts += 1;
    state.last_message = Some(body.message);
    state.last_branch = Some(body.branch);

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(json!({ "content": { "sha": sha } }))).into_response()
}

//! Shared harness for the HTTP integration tests.
//!
//! Builds the real router over file-backed stores in a temporary directory and a
//! scripted oracle, and offers small request helpers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use api_lib::adapters::{DocxWriter, FileDocumentReader, FileEventLog, JsonAccountStore};
use api_lib::config::Config;
use api_lib::web::auth::hash_password;
use api_lib::web::build_router;
use api_lib::web::state::{AppState, SessionRegistry};
use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use translation_workflow_core::domain::{AccessEvent, Role, UserAccount};
use translation_workflow_core::ports::{
    AccountStore, EventLog, PortError, PortResult, TranslationOracle,
};
use translation_workflow_core::workflow::TranslationWorkflow;
use uuid::Uuid;

pub const ADMIN: (&str, &str) = ("admin", "admin-pass");
pub const ALICE: (&str, &str) = ("alice", "alice-pass");

// ---------------------------------------------------------------------------
// Scripted oracle
// ---------------------------------------------------------------------------

/// Replies with queued results in order, and "(no reply scripted)" once empty.
#[derive(Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<PortResult<String>>>,
    prompts: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedOracle {
    pub fn reply(&self, text: &str) {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn fail(&self, err: PortError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    /// Every prompt received so far, with the model it asked for.
    pub fn prompts(&self) -> Vec<(String, Option<String>)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranslationOracle for ScriptedOracle {
    async fn complete(&self, prompt: &str, model: Option<&str>) -> PortResult<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), model.map(str::to_string)));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("(no reply scripted)".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Test application
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub oracle: Arc<ScriptedOracle>,
    _dir: TempDir,
}

impl TestApp {
    /// An app with an oracle credential, an `admin` and a plain `alice` account.
    pub async fn new() -> Self {
        Self::build(true).await
    }

    /// An app started without any oracle credential.
    pub async fn without_credential() -> Self {
        Self::build(false).await
    }

    async fn build(with_oracle: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.user_db_file = dir.path().join("users.json");
        config.log_file = dir.path().join("access_log.txt");

        let accounts = Arc::new(JsonAccountStore::open(&config.user_db_file).await.unwrap());
        for ((username, password), role) in [(ADMIN, Role::Admin), (ALICE, Role::User)] {
            accounts
                .create_account(UserAccount {
                    username: username.to_string(),
                    password_hash: hash_password(password).unwrap(),
                    role,
                })
                .await
                .unwrap();
        }
        let events = Arc::new(FileEventLog::new(&config.log_file));

        let oracle = Arc::new(ScriptedOracle::default());
        let workflow_oracle: Option<Arc<dyn TranslationOracle>> = if with_oracle {
            Some(oracle.clone() as Arc<dyn TranslationOracle>)
        } else {
            None
        };
        let workflow = TranslationWorkflow::new(
            workflow_oracle,
            Arc::new(FileDocumentReader::new()),
            Arc::new(DocxWriter::new()),
            events.clone(),
        );

        let state = Arc::new(AppState {
            config: Arc::new(config),
            workflow,
            accounts,
            events,
            sessions: SessionRegistry::new(),
        });

        Self {
            router: build_router(state.clone()),
            state,
            oracle,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends a request with an optional session cookie and JSON body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        json: Option<serde_json::Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match json {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    /// Logs in and returns the `session=<id>` cookie pair.
    pub async fn login(&self, (username, password): (&str, &str)) -> String {
        let response = self
            .call(
                Method::POST,
                "/auth/login",
                None,
                Some(serde_json::json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login as {username} failed");
        session_cookie(&response).expect("login must set the session cookie")
    }

    /// Uploads a start form with the given files and language fields.
    pub async fn start_project(&self, cookie: &str, form: &MultipartForm) -> Response<Body> {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/project")
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, form.content_type())
            .body(Body::from(form.body()))
            .unwrap();
        self.send(request).await
    }

    pub async fn events(&self) -> Vec<AccessEvent> {
        self.state.events.read_events().await.unwrap()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Extracts `session=<id>` from a response's `Set-Cookie` header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    let set_cookie = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    let pair = set_cookie.split(';').next()?.trim();
    pair.starts_with("session=").then(|| pair.to_string())
}

pub fn session_id(cookie: &str) -> Uuid {
    Uuid::parse_str(cookie.trim_start_matches("session=")).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}

/// A hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartForm {
    parts: Vec<(String, Option<String>, Vec<u8>)>,
}

impl MultipartForm {
    const BOUNDARY: &'static str = "----workflow-test-boundary";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, field: &str, file_name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.parts
            .push((field.to_string(), Some(file_name.to_string()), bytes.into()));
        self
    }

    pub fn text(mut self, field: &str, value: &str) -> Self {
        self.parts
            .push((field.to_string(), None, value.as_bytes().to_vec()));
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", Self::BOUNDARY)
    }

    pub fn body(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for (field, file_name, bytes) in &self.parts {
            body.extend_from_slice(format!("--{}\r\n", Self::BOUNDARY).as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", Self::BOUNDARY).as_bytes());
        body
    }
}

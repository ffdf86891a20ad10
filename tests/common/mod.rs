//! In-process stand-in for the DeepL document API, plus test helpers

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use epub_translator::TranslatorConfig;

/// Upload bodies containing this marker are rejected with HTTP 500
pub const FAIL_SUBMIT: &str = "FAIL_SUBMIT";
/// Upload bodies containing this marker get a response without `document_key`
pub const NO_KEY: &str = "NO_KEY";
/// Upload bodies containing this marker get a non-JSON response
pub const BAD_JSON: &str = "BAD_JSON";
/// Documents containing this marker cannot be downloaded
pub const FAIL_RESULT: &str = "FAIL_RESULT";

/// How the fake service answers status checks
#[derive(Debug, Clone, Copy)]
pub struct Behavior {
    /// Per-document poll number (1-based) from which `done` is reported; `None` never
    pub done_after: Option<u32>,
    /// The first N polls of each document answer HTTP 503
    pub failing_polls: u32,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            done_after: Some(1),
            failing_polls: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub uploads: Vec<Vec<u8>>,
    pub authorizations: Vec<String>,
    pub polls: HashMap<String, u32>,
    pub total_polls: u32,
    pub result_requests: u32,
    documents: HashMap<String, Vec<u8>>,
}

#[derive(Clone)]
struct Shared {
    behavior: Behavior,
    recorded: Arc<Mutex<Recorded>>,
}

#[derive(Deserialize)]
struct KeyForm {
    document_key: String,
}

/// Handle on a running fake service
pub struct FakeDeepl {
    pub base_url: String,
    recorded: Arc<Mutex<Recorded>>,
}

impl FakeDeepl {
    /// Start the service on an ephemeral local port
    pub async fn start(behavior: Behavior) -> Self {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let shared = Shared {
            behavior,
            recorded: recorded.clone(),
        };

        let app = Router::new()
            .route("/document", post(upload))
            .route("/document/:id", post(status))
            .route("/document/:id/result", post(result))
            .with_state(shared);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            recorded,
        }
    }

    /// Inspect what the service has seen so far
    pub fn recorded<T>(&self, f: impl FnOnce(&Recorded) -> T) -> T {
        f(&self.recorded.lock().unwrap())
    }

    pub fn total_polls(&self) -> u32 {
        self.recorded(|r| r.total_polls)
    }

    pub fn upload_count(&self) -> usize {
        self.recorded(|r| r.uploads.len())
    }

    /// Configuration pointing at this service with millisecond polling
    pub fn config(&self, work_dir: &Path) -> TranslatorConfig {
        TranslatorConfig {
            auth_key: "test-key".to_string(),
            api_endpoint: self.base_url.clone(),
            poll_interval_ms: 1,
            max_poll_attempts: 100,
            timeout_ms: 5000,
            work_dir: Some(work_dir.to_path_buf()),
            ..Default::default()
        }
    }
}

/// Content the fake service returns for a document
pub fn translated_body(document_id: &str) -> String {
    format!("<p>translated {}</p>", document_id)
}

pub fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}

async fn upload(State(shared): State<Shared>, headers: HeaderMap, body: Bytes) -> Response {
    let mut recorded = shared.recorded.lock().unwrap();
    recorded.uploads.push(body.to_vec());
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        recorded.authorizations.push(auth.to_string());
    }

    if contains(&body, FAIL_SUBMIT) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upload failed").into_response();
    }
    if contains(&body, BAD_JSON) {
        return (StatusCode::OK, "this is not json").into_response();
    }

    let document_id = format!("doc-{}", recorded.documents.len() + 1);
    recorded.documents.insert(document_id.clone(), body.to_vec());

    if contains(&body, NO_KEY) {
        return Json(serde_json::json!({ "document_id": document_id })).into_response();
    }

    Json(serde_json::json!({
        "document_id": document_id,
        "document_key": format!("key-{}", document_id),
    }))
    .into_response()
}

async fn status(
    State(shared): State<Shared>,
    UrlPath(id): UrlPath<String>,
    Form(form): Form<KeyForm>,
) -> Response {
    let mut recorded = shared.recorded.lock().unwrap();
    if !recorded.documents.contains_key(&id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    if form.document_key != format!("key-{}", id) {
        return StatusCode::FORBIDDEN.into_response();
    }

    recorded.total_polls += 1;
    let count = recorded.polls.entry(id.clone()).or_insert(0);
    *count += 1;
    let poll = *count;

    if poll <= shared.behavior.failing_polls {
        return (StatusCode::SERVICE_UNAVAILABLE, "try again").into_response();
    }

    let done = shared.behavior.done_after.map_or(false, |n| poll >= n);
    if done {
        Json(serde_json::json!({ "document_id": id, "status": "done" })).into_response()
    } else {
        Json(serde_json::json!({
            "document_id": id,
            "status": "translating",
            "seconds_remaining": 20
        }))
        .into_response()
    }
}

async fn result(
    State(shared): State<Shared>,
    UrlPath(id): UrlPath<String>,
    Form(form): Form<KeyForm>,
) -> Response {
    let mut recorded = shared.recorded.lock().unwrap();
    recorded.result_requests += 1;

    let Some(document) = recorded.documents.get(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if form.document_key != format!("key-{}", id) {
        return StatusCode::FORBIDDEN.into_response();
    }
    if contains(document, FAIL_RESULT) {
        return (StatusCode::SERVICE_UNAVAILABLE, "result unavailable").into_response();
    }

    translated_body(&id).into_response()
}

/// Write a zip archive with the given entries, in order
pub fn write_epub(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, content) in entries {
        zip.start_file(*name, zip::write::FileOptions::default())
            .unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
}

/// Read every entry of a zip archive, in archive order
pub fn read_epub(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entries = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        entries.push((entry.name().to_string(), content));
    }
    entries
}

/// Entries of `dir`, for checking that nothing is left behind
pub fn list_dir(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}

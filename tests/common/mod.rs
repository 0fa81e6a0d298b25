//! In-process stand-ins for Elasticsearch and Google Cloud Storage
//!
//! Each stub is an axum router bound to an ephemeral local port. Tests talk to
//! them through the real `SearchClient` and `GcsStorage`, then inspect what
//! the stubs recorded.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{Path as UrlPath, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use cloud_storage_dump::config::{SearchConfig, StorageConfig};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const BUCKET: &str = "dumps";
pub const ACCESS_TOKEN: &str = "stub-access-token";
pub const CLIENT_EMAIL: &str = "dumper@test-project.iam.gserviceaccount.com";
pub const KEY_ID: &str = "stub-key-1";
const SCROLL_ID: &str = "c2Nyb2xsLXN0dWI=";

pub const PRIVATE_KEY: &str = include_str!("../fixtures/test_service_account.pem");
pub const PUBLIC_KEY: &str = include_str!("../fixtures/test_service_account.pub.pem");

/// Bind `app` to 127.0.0.1 on a free port and serve it in the background
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("stub listener should bind");
    let addr = listener.local_addr().expect("stub listener has an address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server crashed");
    });
    addr
}

/// Search settings pointing at a running stub
pub fn search_config(addr: SocketAddr, page_size: u32) -> SearchConfig {
    SearchConfig {
        host: Some(addr.ip().to_string()),
        port: Some(addr.port()),
        scroll_size: page_size,
        ..SearchConfig::default()
    }
}

/// Storage settings pointing at a running stub
pub fn storage_config(addr: SocketAddr, key_file: &Path) -> StorageConfig {
    StorageConfig {
        bucket: Some(BUCKET.to_string()),
        credentials_path: Some(key_file.to_path_buf()),
        endpoint: format!("http://{}", addr),
        ..StorageConfig::default()
    }
}

/// Write a service-account key file whose token endpoint is the stub
pub fn write_key_file(dir: &Path, storage_addr: SocketAddr) -> PathBuf {
    let key = json!({
        "type": "service_account",
        "project_id": "test-project",
        "private_key_id": KEY_ID,
        "private_key": PRIVATE_KEY,
        "client_email": CLIENT_EMAIL,
        "token_uri": token_uri(storage_addr),
    });
    let path = dir.join("service-account.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&key).unwrap()).unwrap();
    path
}

pub fn token_uri(storage_addr: SocketAddr) -> String {
    format!("http://{}/token", storage_addr)
}

/* ============================ Elasticsearch ============================ */

/// What the search stub serves and what it saw
pub struct SearchState {
    pub docs: Vec<Value>,
    pub health_status: u16,
    /// Overrides `hits.total.value`; defaults to the real document count
    pub reported_total: Option<u64>,
    /// Fail the n-th continuation request with a 500
    pub fail_scroll_at: Option<usize>,
    pub page_size: usize,
    pub position: usize,
    pub searches: Vec<(String, Value)>,
    pub scroll_requests: usize,
    pub released: Vec<Value>,
    pub authorization: Option<String>,
}

#[derive(Clone)]
pub struct SearchStub {
    inner: Arc<Mutex<SearchState>>,
}

impl SearchStub {
    pub fn new(docs: Vec<Value>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SearchState {
                docs,
                health_status: 200,
                reported_total: None,
                fail_scroll_at: None,
                page_size: 10,
                position: 0,
                searches: Vec::new(),
                scroll_requests: 0,
                released: Vec::new(),
                authorization: None,
            })),
        }
    }

    pub fn with_health_status(self, status: u16) -> Self {
        self.state().health_status = status;
        self
    }

    pub fn with_reported_total(self, total: u64) -> Self {
        self.state().reported_total = Some(total);
        self
    }

    pub fn with_scroll_failure_at(self, request: usize) -> Self {
        self.state().fail_scroll_at = Some(request);
        self
    }

    pub fn state(&self) -> MutexGuard<'_, SearchState> {
        self.inner.lock().unwrap()
    }

    pub async fn start(&self) -> SocketAddr {
        let app = Router::new()
            .route("/", get(cluster_info))
            .route("/_search/scroll", post(continue_scroll).delete(clear_scroll))
            .route("/:index/_search", post(open_scroll))
            .with_state(self.clone());
        serve(app).await
    }
}

impl SearchState {
    fn next_page(&mut self) -> Value {
        let start = self.position;
        let end = (start + self.page_size).min(self.docs.len());
        let hits: Vec<Value> = self.docs[start..end]
            .iter()
            .enumerate()
            .map(|(offset, doc)| {
                json!({ "_index": "stub", "_id": (start + offset).to_string(), "_source": doc })
            })
            .collect();
        self.position = end;

        let total = self.reported_total.unwrap_or(self.docs.len() as u64);
        json!({
            "_scroll_id": SCROLL_ID,
            "took": 1,
            "timed_out": false,
            "_shards": { "total": 1, "successful": 1, "skipped": 0, "failed": 0 },
            "hits": {
                "total": { "value": total, "relation": "eq" },
                "hits": hits,
            },
        })
    }
}

async fn cluster_info(State(stub): State<SearchStub>, headers: HeaderMap) -> Response {
    let mut state = stub.state();
    state.authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if state.health_status != 200 {
        let status =
            StatusCode::from_u16(state.health_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(json!({ "error": "unavailable" }))).into_response();
    }
    Json(json!({
        "name": "stub-node",
        "cluster_name": "stub-cluster",
        "version": { "number": "8.11.0" },
        "tagline": "You Know, for Search",
    }))
    .into_response()
}

async fn open_scroll(
    State(stub): State<SearchStub>,
    UrlPath(index): UrlPath<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = stub.state();
    if !params.contains_key("scroll") {
        return (StatusCode::BAD_REQUEST, "scroll parameter missing").into_response();
    }
    state.page_size = body["size"].as_u64().unwrap_or(10) as usize;
    state.position = 0;
    state.searches.push((index, body));
    Json(state.next_page()).into_response()
}

async fn continue_scroll(State(stub): State<SearchStub>, Json(body): Json<Value>) -> Response {
    let mut state = stub.state();
    state.scroll_requests += 1;
    if body["scroll_id"] != SCROLL_ID {
        return (StatusCode::NOT_FOUND, "unknown scroll id").into_response();
    }
    if state.fail_scroll_at == Some(state.scroll_requests) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "node left the cluster").into_response();
    }
    Json(state.next_page()).into_response()
}

async fn clear_scroll(State(stub): State<SearchStub>, Json(body): Json<Value>) -> Json<Value> {
    stub.state().released.push(body);
    Json(json!({ "succeeded": true, "num_freed": 1 }))
}

/* ============================ Cloud Storage ============================ */

/// An object received by the storage stub
pub struct ReceivedUpload {
    pub bucket: String,
    pub name: String,
    pub content_type: String,
    pub authorization: String,
    pub body: Vec<u8>,
}

pub struct StorageState {
    pub upload_status: u16,
    pub token_requests: usize,
    pub claims: Vec<Value>,
    pub key_ids: Vec<Option<String>>,
    pub bucket_probes: Vec<String>,
    pub uploads: Vec<ReceivedUpload>,
}

#[derive(Clone)]
pub struct StorageStub {
    inner: Arc<Mutex<StorageState>>,
}

impl StorageStub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StorageState {
                upload_status: 200,
                token_requests: 0,
                claims: Vec::new(),
                key_ids: Vec::new(),
                bucket_probes: Vec::new(),
                uploads: Vec::new(),
            })),
        }
    }

    pub fn with_upload_status(self, status: u16) -> Self {
        self.state().upload_status = status;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, StorageState> {
        self.inner.lock().unwrap()
    }

    pub async fn start(&self) -> SocketAddr {
        let app = Router::new()
            .route("/token", post(issue_token))
            .route("/storage/v1/b/:bucket", get(get_bucket))
            .route("/upload/storage/v1/b/:bucket/o", post(insert_object))
            .with_state(self.clone());
        serve(app).await
    }
}

async fn issue_token(
    State(stub): State<StorageStub>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let mut state = stub.state();
    state.token_requests += 1;

    if form.get("grant_type").map(String::as_str)
        != Some("urn:ietf:params:oauth:grant-type:jwt-bearer")
    {
        return (StatusCode::BAD_REQUEST, "unsupported grant_type").into_response();
    }
    let Some(assertion) = form.get("assertion") else {
        return (StatusCode::BAD_REQUEST, "assertion missing").into_response();
    };

    let key = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).expect("fixture public key");
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_aud = false;
    match jsonwebtoken::decode::<Value>(assertion, &key, &validation) {
        Ok(data) => {
            state.key_ids.push(data.header.kid);
            state.claims.push(data.claims);
            Json(json!({
                "access_token": ACCESS_TOKEN,
                "expires_in": 3599,
                "token_type": "Bearer",
            }))
            .into_response()
        }
        Err(e) => (StatusCode::UNAUTHORIZED, format!("invalid assertion: {}", e)).into_response(),
    }
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {}", ACCESS_TOKEN).as_str())
}

async fn get_bucket(
    State(stub): State<StorageStub>,
    UrlPath(bucket): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    stub.state().bucket_probes.push(bucket.clone());
    if !bearer_ok(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if bucket != BUCKET {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "code": 404, "message": "The specified bucket does not exist." } })),
        )
            .into_response();
    }
    Json(json!({ "kind": "storage#bucket", "name": bucket })).into_response()
}

async fn insert_object(
    State(stub): State<StorageStub>,
    UrlPath(bucket): UrlPath<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut state = stub.state();
    if params.get("uploadType").map(String::as_str) != Some("media") {
        return (StatusCode::BAD_REQUEST, "unsupported uploadType").into_response();
    }
    let Some(name) = params.get("name").cloned() else {
        return (StatusCode::BAD_REQUEST, "name missing").into_response();
    };
    if state.upload_status != 200 {
        let status =
            StatusCode::from_u16(state.upload_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "backend error").into_response();
    }

    let header_text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    let size = body.len();
    state.uploads.push(ReceivedUpload {
        bucket: bucket.clone(),
        name: name.clone(),
        content_type: header_text(header::CONTENT_TYPE),
        authorization: header_text(header::AUTHORIZATION),
        body: body.to_vec(),
    });
    Json(json!({
        "kind": "storage#object",
        "bucket": bucket,
        "name": name,
        "size": size.to_string(),
    }))
    .into_response()
}

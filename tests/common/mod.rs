// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{header, Request, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use jobtread_dashboard::config::Config;
use jobtread_dashboard::db::FirestoreDb;
use jobtread_dashboard::models::{Organization, User};
use jobtread_dashboard::routes::create_router;
use jobtread_dashboard::services::FirebaseAuth;
use jobtread_dashboard::AppState;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

pub const TEST_KID: &str = "test-kid";
pub const TEST_SECRET: &[u8] = b"integration-test-secret";
pub const TEST_ZESTIMATE: i64 = 512300;
pub const TEST_ZILLOW_URL: &str = "https://www.zillow.com/homedetails/123-Main-St/1_zpid/";

/// Answers a Pave query; `None` falls back to the default mutation answers.
pub type PaveResponder = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// In-process stand-in for JobTread, Bridge, and Google Static Maps.
#[allow(dead_code)]
#[derive(Clone)]
pub struct FakeUpstream {
    pub base_url: String,
    responder: PaveResponder,
    pub pave_queries: Arc<Mutex<Vec<Value>>>,
    pub bridge_addresses: Arc<Mutex<Vec<String>>>,
    pub map_calls: Arc<AtomicUsize>,
    pub uploads: Arc<Mutex<Vec<(String, usize)>>>,
}

#[allow(dead_code)]
impl FakeUpstream {
    /// Start a fake upstream with the default Pave answers.
    pub async fn start() -> Self {
        Self::start_with(Arc::new(|_| None)).await
    }

    pub async fn start_with(responder: PaveResponder) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake upstream");
        let addr = listener.local_addr().expect("fake upstream address");

        let upstream = Self {
            base_url: format!("http://{}", addr),
            responder,
            pave_queries: Arc::new(Mutex::new(Vec::new())),
            bridge_addresses: Arc::new(Mutex::new(Vec::new())),
            map_calls: Arc::new(AtomicUsize::new(0)),
            uploads: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/pave", post(fake_pave))
            .route("/zestimates", get(fake_bridge))
            .route("/staticmap", get(fake_static_map))
            .route("/upload/{id}", put(fake_upload))
            .with_state(upstream.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake upstream server");
        });

        upstream
    }

    /// Point every upstream URL in `config` at this server.
    pub fn configure(&self, config: &mut Config) {
        config.jobtread_api_url = format!("{}/pave", self.base_url);
        config.bridge_api_url = format!("{}/zestimates", self.base_url);
        config.static_maps_url = format!("{}/staticmap", self.base_url);
    }

    pub fn pave_queries(&self) -> Vec<Value> {
        self.pave_queries.lock().unwrap().clone()
    }

    pub fn bridge_calls(&self) -> usize {
        self.bridge_addresses.lock().unwrap().len()
    }

    pub fn map_calls(&self) -> usize {
        self.map_calls.load(Ordering::SeqCst)
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

async fn fake_pave(State(upstream): State<FakeUpstream>, Json(body): Json<Value>) -> Json<Value> {
    let query = body["query"].clone();
    upstream.pave_queries.lock().unwrap().push(query.clone());
    let answer = (upstream.responder)(&query)
        .unwrap_or_else(|| default_pave_answer(&upstream.base_url, &query));
    Json(answer)
}

/// Successful answers for every mutation the automations send.
fn default_pave_answer(base_url: &str, query: &Value) -> Value {
    if let Some(update) = query.get("updateLocation") {
        return json!({ "updateLocation": { "location": { "id": update["$"]["id"] } } });
    }
    if let Some(update) = query.get("updateJob") {
        return json!({ "updateJob": { "job": { "id": update["$"]["id"] } } });
    }
    if query.get("createUploadRequest").is_some() {
        return json!({
            "createUploadRequest": {
                "createdUploadRequest": {
                    "id": "upload1",
                    "url": format!("{}/upload/upload1", base_url)
                }
            }
        });
    }
    if query.get("createFile").is_some() {
        return json!({ "createFile": { "createdFile": { "id": "file1" } } });
    }
    json!({})
}

async fn fake_bridge(
    State(upstream): State<FakeUpstream>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if params.get("access_token").map(String::as_str) != Some("test_bridge_token") {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad token" })));
    }
    let address = params.get("address").cloned().unwrap_or_default();
    upstream.bridge_addresses.lock().unwrap().push(address);
    (
        StatusCode::OK,
        Json(json!({
            "bundle": [{ "zestimate": TEST_ZESTIMATE, "zillowUrl": TEST_ZILLOW_URL }]
        })),
    )
}

async fn fake_static_map(State(upstream): State<FakeUpstream>) -> impl IntoResponse {
    upstream.map_calls.fetch_add(1, Ordering::SeqCst);
    (
        [(header::CONTENT_TYPE, "image/png")],
        vec![0x89u8, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a],
    )
}

async fn fake_upload(
    State(upstream): State<FakeUpstream>,
    Path(id): Path<String>,
    body: Bytes,
) -> StatusCode {
    upstream.uploads.lock().unwrap().push((id, body.len()));
    StatusCode::OK
}

/// Build the app around an in-memory database and a static-key verifier.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (Router, Arc<AppState>) {
    let auth = FirebaseAuth::new_with_static_key(
        &config,
        TEST_KID,
        Algorithm::HS256,
        DecodingKey::from_secret(TEST_SECRET),
    )
    .expect("static verifier");
    let db = FirestoreDb::new_in_memory();

    let state = Arc::new(AppState::new(config, db, Arc::new(auth)).expect("app state"));
    (create_router(state.clone()), state)
}

/// Create a test app whose database is unreachable.
#[allow(dead_code)]
pub fn create_offline_test_app() -> (Router, Arc<AppState>) {
    let config = Config::test_default();
    let auth = FirebaseAuth::new_with_static_key(
        &config,
        TEST_KID,
        Algorithm::HS256,
        DecodingKey::from_secret(TEST_SECRET),
    )
    .expect("static verifier");
    let state = Arc::new(
        AppState::new(config, FirestoreDb::new_mock(), Arc::new(auth)).expect("app state"),
    );
    (create_router(state.clone()), state)
}

/// Create a test app whose upstreams point nowhere.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with(Config::test_default())
}

/// Create a test app wired to a fake upstream.
#[allow(dead_code)]
pub fn create_test_app_for(upstream: &FakeUpstream) -> (Router, Arc<AppState>) {
    let mut config = Config::test_default();
    upstream.configure(&mut config);
    create_test_app_with(config)
}

/// Mint a Firebase-shaped ID token accepted by the test verifier.
#[allow(dead_code)]
pub fn mint_token(uid: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = json!({
        "sub": uid,
        "aud": "test-project",
        "iss": "https://securetoken.google.com/test-project",
        "iat": now,
        "exp": now + 3600,
        "email": format!("{}@example.com", uid),
    });
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(TEST_KID.to_string());
    encode(&header, &claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap()
}

/// Seed a user linked to an organization with working credentials.
#[allow(dead_code)]
pub async fn seed_linked_user(state: &AppState, uid: &str, org_id: &str, org: Organization) {
    let user = User {
        email: Some(format!("{}@example.com", uid)),
        org: Some(org_id.to_string()),
        ..Default::default()
    };
    state.db.upsert_user(uid, &user).await.unwrap();
    state.db.upsert_org(org_id, &org).await.unwrap();
}

/// Organization with a grant key and JobTread org ID.
#[allow(dead_code)]
pub fn org_with_credentials() -> Organization {
    Organization {
        name: Some("Acme Builders".to_string()),
        grant_key: Some("gk_secret_1234".to_string()),
        jobtread_org_id: Some("22NjtOrg".to_string()),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

#[allow(dead_code)]
pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// POST a body as-is, for requests that are not valid JSON.
#[allow(dead_code)]
pub fn post_raw(uri: &str, content_type: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn authed(method: &str, uri: &str, uid: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", mint_token(uid)));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

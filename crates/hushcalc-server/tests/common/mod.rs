//! Shared test helpers for server integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use hushcalc_core::repository::{KeySpace, KeyValueStore, StoredValue};
use hushcalc_engine::application::session::{Session, SessionPorts};
use hushcalc_server::actor::SessionHandle;
use hushcalc_server::ports::HeadlessCapabilities;
use hushcalc_server::state::AppState;
use hushcalc_story::StepGraph;
use hushcalc_test_support::{
    FailingKeyValueStore, InMemoryKeyValueStore, ManualClock, MockRng, RecordingPresenter,
    test_epoch,
};
use tower::ServiceExt;

/// Long enough that no tick fires during a test after the first one.
const TEST_TICK: Duration = Duration::from_secs(3600);

/// Build the full app router around a session backed by `store`. Uses the
/// same route structure as `main.rs`.
pub fn build_test_app_with_store(store: Arc<dyn KeyValueStore>) -> Router {
    let ports = SessionPorts {
        presenter: Arc::new(RecordingPresenter::default()),
        capabilities: Arc::new(HeadlessCapabilities),
        clock: Arc::new(ManualClock::new(test_epoch())),
        store,
    };
    let session = Session::new(
        Arc::new(StepGraph::embedded().clone()),
        ports,
        Box::new(MockRng),
    );
    hushcalc_server::app(AppState::new(SessionHandle::spawn(session, TEST_TICK)))
}

/// App with an empty store: a calculator that has never talked.
pub fn build_test_app() -> Router {
    build_test_app_with_store(Arc::new(InMemoryKeyValueStore::default()))
}

/// App resumed in the middle of the conversation at `step`.
pub fn build_test_app_at_step(step: u32) -> Router {
    let mut entries = KeySpace::new();
    entries.insert("conversationStep".to_owned(), StoredValue::Int(i64::from(step)));
    entries.insert("inConversation".to_owned(), StoredValue::Bool(true));
    build_test_app_with_store(Arc::new(InMemoryKeyValueStore::with_entries(entries)))
}

/// App whose store fails every operation.
pub fn build_failing_test_app() -> Router {
    build_test_app_with_store(Arc::new(FailingKeyValueStore))
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

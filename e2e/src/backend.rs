//! Mock Gemini API server
//!
//! Serves `models/{model}:generateContent` and `models/{model}` lookups.
//! Tests pre-configure responses via SharedBackendState before each request.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::types::{BackendState, MockResponse, ReceivedRequest, SharedBackendState};

/// Default fallback response when no response is queued
fn default_generate_response() -> MockResponse {
    MockResponse::json(
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Default response (no mock queued)"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":10,"candidatesTokenCount":5,"totalTokenCount":15}}"#,
    )
}

/// Handle POST /v1beta/models/{model}:generateContent - serves pre-configured mock responses
async fn handle_generate(
    State(state): State<SharedBackendState>,
    Query(query): Query<HashMap<String, String>>,
    request: Request<Body>,
) -> Response {
    let path = request.uri().path().to_string();

    let body_bytes = axum::body::to_bytes(request.into_body(), 10 * 1024 * 1024)
        .await
        .unwrap_or_default();
    let body_json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null);

    let received = ReceivedRequest {
        method: "POST".to_string(),
        path,
        api_key: query.get("key").cloned(),
        body: body_json,
    };

    // Pop the next configured response (or use default)
    let mock_response = {
        let mut state = state.lock().unwrap();
        state.received_requests.push(received);
        state.response_queue.pop_front().unwrap_or_else(default_generate_response)
    };

    Response::builder()
        .status(mock_response.status)
        .header("Content-Type", &mock_response.content_type)
        .body(Body::from(mock_response.body))
        .unwrap()
        .into_response()
}

/// Handle GET /v1beta/models/{model} (used by `test-upstream`)
async fn handle_model(
    State(state): State<SharedBackendState>,
    Query(query): Query<HashMap<String, String>>,
    request: Request<Body>,
) -> impl IntoResponse {
    let path = request.uri().path().to_string();
    let name = path.trim_start_matches("/v1beta/").to_string();

    state.lock().unwrap().received_requests.push(ReceivedRequest {
        method: "GET".to_string(),
        path,
        api_key: query.get("key").cloned(),
        body: serde_json::Value::Null,
    });

    (
        StatusCode::OK,
        [("Content-Type", "application/json")],
        serde_json::json!({
            "name": name,
            "displayName": "E2E Model",
            "inputTokenLimit": 1048576,
            "outputTokenLimit": 8192
        })
        .to_string(),
    )
}

/// Start the mock Gemini server and return the shared state handle
pub async fn start(port: u16) -> anyhow::Result<SharedBackendState> {
    let state: SharedBackendState = std::sync::Arc::new(std::sync::Mutex::new(BackendState::default()));

    let app = Router::new()
        .route("/v1beta/models/*rest", post(handle_generate).get(handle_model))
        .with_state(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await
        .map_err(|e| anyhow::anyhow!("Failed to bind mock backend to {}: {}", addr, e))?;

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock backend server failed");
    });

    // Brief pause to let the server start accepting connections
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    Ok(state)
}

/// Helper to configure the next generateContent response
pub fn queue_response(state: &SharedBackendState, response: MockResponse) {
    state.lock().unwrap().response_queue.push_back(response);
}

/// Helper to get all requests received since last clear
pub fn drain_requests(state: &SharedBackendState) -> Vec<ReceivedRequest> {
    let mut s = state.lock().unwrap();
    s.received_requests.drain(..).collect()
}

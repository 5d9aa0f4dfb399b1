//! End-to-end scenarios driving the full HTTP surface through
//! `tower::ServiceExt::oneshot`, with a real local axum server standing in
//! for the upstream provider (no mocking crate, per `DESIGN.md` §M).
//!
//! Grounded on the teacher's `tower::ServiceExt::oneshot` route tests in
//! `src/api/mod.rs` and its `#[sqlx::test]`-backed integration style.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use llm_gateway::api::build_router;
use llm_gateway::api::state::AppState;
use llm_gateway::auth::{in_memory_verifier, AuthConfig};
use llm_gateway::registry::{ProviderRegistry, SlotRegistry};

const JWT_SECRET: &str = "e2e-test-secret";
const ENCRYPTION_KEY: [u8; 32] = [4u8; 32];

#[derive(Clone, Copy)]
enum MockBehavior {
    /// Answers every `/chat/completions` call with a canned completion or,
    /// when `stream: true` is requested, a two-event SSE body.
    Success,
    /// Answers every call with HTTP 500.
    Failing,
}

#[derive(Clone)]
struct MockState {
    behavior: MockBehavior,
}

async fn mock_chat_completions(State(state): State<MockState>, Json(body): Json<Value>) -> axum::response::Response {
    use axum::response::IntoResponse;

    match state.behavior {
        MockBehavior::Failing => (StatusCode::INTERNAL_SERVER_ERROR, "mock upstream failure").into_response(),
        MockBehavior::Success => {
            if body["stream"].as_bool().unwrap_or(false) {
                let sse = concat!(
                    "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"},\"finish_reason\":null}]}\n\n",
                    "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}],",
                    "\"usage\":{\"prompt_tokens\":5,\"completion_tokens\":2,\"total_tokens\":7}}\n\n",
                    "data: [DONE]\n\n",
                );
                (
                    StatusCode::OK,
                    [("content-type", "text/event-stream")],
                    sse,
                )
                    .into_response()
            } else {
                Json(json!({
                    "model": "mock-model",
                    "choices": [{"message": {"role": "assistant", "content": "hello from mock"}}],
                    "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7},
                }))
                .into_response()
            }
        }
    }
}

/// Spawns a one-off axum server on an OS-assigned port and returns its base
/// URL. The server is dropped (and the port freed) when the returned
/// `tokio::task::JoinHandle` is aborted at the end of the owning test.
async fn spawn_mock_upstream(behavior: MockBehavior) -> (String, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/chat/completions", post(mock_chat_completions))
        .with_state(MockState { behavior });

    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let server = axum::Server::bind(&addr).serve(app.into_make_service());
    let local_addr = server.local_addr();
    let handle = tokio::spawn(async move {
        let _ = server.await;
    });
    (format!("http://{local_addr}"), handle)
}

fn test_auth() -> Arc<AuthConfig> {
    Arc::new(AuthConfig {
        jwt_secret: JWT_SECRET.to_string(),
        api_key_verifier: in_memory_verifier(Default::default()),
    })
}

#[derive(Serialize)]
struct Claims {
    sub: String,
    role: String,
    exp: usize,
}

fn admin_token() -> String {
    let claims = Claims { sub: "test-admin".to_string(), role: "admin".to_string(), exp: 4_000_000_000 };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).unwrap()
}

fn user_token() -> String {
    let claims = Claims { sub: "test-user".to_string(), role: "user".to_string(), exp: 4_000_000_000 };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).unwrap()
}

async fn app_state(pool: PgPool) -> Arc<AppState> {
    let providers = ProviderRegistry::new(pool.clone(), ENCRYPTION_KEY);
    let slots = SlotRegistry::new(pool);
    Arc::new(AppState::new(providers, slots))
}

async fn create_provider(state: &AppState, name: &str, base_url: &str) -> Value {
    let body = json!({
        "name": name,
        "slug": name,
        "provider_type": "openai",
        "base_url": base_url,
        "api_key": "sk-test-unused",
        "config": {},
    });
    let provider = state
        .providers
        .create(serde_json::from_value(body).unwrap())
        .await
        .expect("provider creation should succeed");
    serde_json::to_value(provider).unwrap()
}

async fn configure_fast_slot(state: &AppState, primary_provider_id: &str, fallback: &[(&str, &str)]) {
    let body = json!({
        "primary_provider_id": primary_provider_id,
        "primary_model_id": "mock-model",
        "fallback_chain": fallback.iter().map(|(id, model)| json!({
            "provider_id": id,
            "model_id": model,
        })).collect::<Vec<_>>(),
        "is_enabled": true,
    });
    let req: llm_gateway::models::slot::ConfigureSlotRequest =
        Into::into(serde_json::from_value::<llm_gateway::api::types::ConfigureSlotBody>(body).unwrap());
    state
        .slots
        .configure(llm_gateway::models::SlotType::Fast, &state.providers, req)
        .await
        .expect("slot configuration should succeed");
}

fn chat_request(stream: bool) -> Request<Body> {
    let payload = json!({
        "messages": [{"role": "user", "content": "say hi"}],
        "stream": stream,
    });
    Request::builder()
        .method(Method::POST)
        .uri("/api/llm/slots/fast/invoke")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", user_token()))
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Scenario 1: slot success on primary ------------------------------------

#[sqlx::test]
async fn slot_invoke_succeeds_on_primary(pool: PgPool) {
    let (base_url, upstream) = spawn_mock_upstream(MockBehavior::Success).await;
    let state = app_state(pool).await;
    let provider = create_provider(&state, "primary-provider", &base_url).await;
    configure_fast_slot(&state, provider["id"].as_str().unwrap(), &[]).await;

    let app = build_router(state, test_auth());
    let response = app.oneshot(chat_request(false)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["result"]["content"], "hello from mock");
    assert_eq!(body["data"]["routing"]["used_resource_pool"], false);
    assert_eq!(body["data"]["routing"]["failover_trace"].as_array().unwrap().len(), 1);

    upstream.abort();
}

// --- Scenario 2: primary fails, fallback succeeds ---------------------------

#[sqlx::test]
async fn slot_invoke_fails_over_to_fallback(pool: PgPool) {
    let (bad_url, bad_upstream) = spawn_mock_upstream(MockBehavior::Failing).await;
    let (good_url, good_upstream) = spawn_mock_upstream(MockBehavior::Success).await;
    let state = app_state(pool).await;

    let primary = create_provider(&state, "dead-provider", &bad_url).await;
    let fallback = create_provider(&state, "healthy-provider", &good_url).await;
    configure_fast_slot(
        &state,
        primary["id"].as_str().unwrap(),
        &[(fallback["id"].as_str().unwrap(), "mock-model")],
    )
    .await;

    let app = build_router(state, test_auth());
    let response = app.oneshot(chat_request(false)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["result"]["content"], "hello from mock");
    assert_eq!(body["data"]["routing"]["used_resource_pool"], true);
    let trace = body["data"]["routing"]["failover_trace"].as_array().unwrap();
    assert_eq!(trace.len(), 2);
    assert_eq!(trace[0]["success"], false);
    assert_eq!(trace[1]["success"], true);

    bad_upstream.abort();
    good_upstream.abort();
}

// --- Scenario 3: all candidates fail -----------------------------------------

#[sqlx::test]
async fn slot_invoke_reports_all_models_failed(pool: PgPool) {
    let (bad_url_1, upstream_1) = spawn_mock_upstream(MockBehavior::Failing).await;
    let (bad_url_2, upstream_2) = spawn_mock_upstream(MockBehavior::Failing).await;
    let state = app_state(pool).await;

    let primary = create_provider(&state, "dead-primary", &bad_url_1).await;
    let fallback = create_provider(&state, "dead-fallback", &bad_url_2).await;
    configure_fast_slot(
        &state,
        primary["id"].as_str().unwrap(),
        &[(fallback["id"].as_str().unwrap(), "mock-model")],
    )
    .await;

    let app = build_router(state, test_auth());
    let response = app.oneshot(chat_request(false)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "ALL_MODELS_FAILED");
    assert_eq!(
        body["error"]["details"]["failover_trace"].as_array().unwrap().len(),
        2
    );

    upstream_1.abort();
    upstream_2.abort();
}

// --- Scenario 4: streaming response is byte-exact SSE framing ---------------

#[sqlx::test]
async fn slot_invoke_streams_sse_framing(pool: PgPool) {
    let (base_url, upstream) = spawn_mock_upstream(MockBehavior::Success).await;
    let state = app_state(pool).await;
    let provider = create_provider(&state, "stream-provider", &base_url).await;
    configure_fast_slot(&state, provider["id"].as_str().unwrap(), &[]).await;

    let app = build_router(state, test_auth());
    let response = app.oneshot(chat_request(true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    let events: Vec<&str> = text.split("\n\n").filter(|s| !s.is_empty()).collect();
    assert_eq!(
        events.len(),
        4,
        "expected two content deltas, one summary, and [DONE], got: {text:?}"
    );
    assert!(events[0].starts_with("data: "));
    assert!(events[0].contains("\"delta\":\"Hel\""));
    assert!(events[1].contains("\"delta\":\"lo\""));
    assert!(events[2].contains("\"usage\""));
    assert_eq!(events[3], "data: [DONE]");

    upstream.abort();
}

// --- Scenario 5: delete is blocked while referenced, then allowed -----------

#[sqlx::test]
async fn provider_delete_blocked_then_allowed(pool: PgPool) {
    let (base_url, upstream) = spawn_mock_upstream(MockBehavior::Success).await;
    let state = app_state(pool).await;
    let provider = create_provider(&state, "in-use-provider", &base_url).await;
    let provider_id = provider["id"].as_str().unwrap().to_string();
    configure_fast_slot(&state, &provider_id, &[]).await;

    let app = build_router(state.clone(), test_auth());
    let delete_req = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/llm/providers/{provider_id}"))
        .header("authorization", format!("Bearer {}", admin_token()))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(delete_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "PROVIDER_IN_USE");

    // Re-point the slot elsewhere so the provider is no longer referenced,
    // then retry the delete through a fresh router built on the same state.
    let other = create_provider(&state, "replacement-provider", &base_url).await;
    configure_fast_slot(&state, other["id"].as_str().unwrap(), &[]).await;

    let app = build_router(state, test_auth());
    let delete_req = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/llm/providers/{provider_id}"))
        .header("authorization", format!("Bearer {}", admin_token()))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(delete_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    upstream.abort();
}

// --- Scenario 6: tampered ciphertext surfaces as an encryption error -------
//
// Exercised through the direct (non-slot) completions route rather than a
// slot invoke: a direct call bypasses the Router's chain walk entirely (§6.1
// "Direct chat"), so a decrypt failure propagates as the raw 500
// `ENCRYPTION_ERROR` instead of being folded into an `ALL_MODELS_FAILED`
// trace the way a slot-chain attempt failure would be.

#[sqlx::test]
async fn tampered_api_key_surfaces_encryption_error(pool: PgPool) {
    let (base_url, upstream) = spawn_mock_upstream(MockBehavior::Success).await;
    let state = app_state(pool.clone()).await;
    let provider = create_provider(&state, "tamper-provider", &base_url).await;
    let provider_id = provider["id"].as_str().unwrap().to_string();

    sqlx::query("UPDATE llm.providers SET api_key_encrypted = 'not-a-valid-blob' WHERE id = $1::uuid")
        .bind(&provider_id)
        .execute(&pool)
        .await
        .unwrap();

    let app = build_router(state, test_auth());
    let payload = json!({
        "provider_id": provider_id,
        "model_id": "mock-model",
        "messages": [{"role": "user", "content": "say hi"}],
    });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/llm/completions")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", admin_token()))
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "ENCRYPTION_ERROR");

    upstream.abort();
}

//! HTTP surface assembly (§6.1, SPEC_FULL ambient layer J).
//!
//! Grounded on the teacher's `CircuitBreakerApiServer::create_router()`
//! (`src/api/mod.rs`): a `build_router(state)` function merging sub-routers,
//! `CorsLayer`, and a `not_found` fallback, on axum 0.6's
//! `axum::Server::bind(...).serve(...)` binding style.

pub mod extract;
pub mod handlers;
pub mod state;
pub mod types;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use handlers::*;
use state::AppState;

/// Assembles the full gateway router: public routes, auth-gated "any user"
/// invoke routes, and admin-gated provider/slot management routes.
pub fn build_router(state: Arc<AppState>, auth: Arc<AuthConfig>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/health", get(health_check))
        .route("/api/llm/providers/presets", get(list_presets));

    let user_routes = Router::new()
        .route("/api/llm/slots/:slot_type/invoke", post(invoke_chat_slot))
        .route("/api/llm/slots/embedding/invoke", post(invoke_embedding_slot))
        .route("/api/llm/slots/rerank/invoke", post(invoke_rerank_slot))
        .route_layer(middleware::from_fn_with_state(auth.clone(), crate::auth::authenticate));

    let admin_routes = Router::new()
        .route("/api/llm/providers", post(create_provider).get(list_providers))
        .route(
            "/api/llm/providers/:id",
            get(get_provider).put(update_provider).delete(delete_provider),
        )
        .route("/api/llm/providers/:id/models", get(list_provider_models))
        .route("/api/llm/providers/:id/test", post(test_provider))
        .route("/api/llm/slots", get(list_slots))
        .route("/api/llm/slots/:slot_type", get(get_slot).put(configure_slot))
        .route("/api/llm/completions", post(direct_chat))
        .route("/api/llm/embeddings", post(direct_embedding))
        .route("/api/llm/rerank", post(direct_rerank))
        .route_layer(middleware::from_fn_with_state(auth, crate::auth::authenticate_admin));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    fn test_auth() -> Arc<AuthConfig> {
        Arc::new(AuthConfig {
            jwt_secret: "test-secret".to_string(),
            api_key_verifier: crate::auth::in_memory_verifier(Default::default()),
        })
    }

    #[sqlx::test]
    async fn health_endpoint_requires_no_auth(pool: sqlx::PgPool) {
        let providers = crate::registry::ProviderRegistry::new(pool.clone(), [0u8; 32]);
        let slots = crate::registry::SlotRegistry::new(pool);
        let state = Arc::new(AppState::new(providers, slots));
        let app = build_router(state, test_auth());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[sqlx::test]
    async fn admin_route_without_credential_is_unauthorized(pool: sqlx::PgPool) {
        let providers = crate::registry::ProviderRegistry::new(pool.clone(), [0u8; 32]);
        let slots = crate::registry::SlotRegistry::new(pool);
        let state = Arc::new(AppState::new(providers, slots));
        let app = build_router(state, test_auth());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/api/llm/providers")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

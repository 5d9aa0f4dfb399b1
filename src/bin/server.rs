//! LLM Gateway server binary.
//!
//! Grounded on the teacher's `src/bin/server.rs` startup shape: `dotenv`
//! load, `tracing_subscriber::fmt::init()`, env-var-presence logging, then
//! build and bind the HTTP server — retargeted from the teacher's
//! GraphQL/NATS bootstrap onto this system's Postgres pool + axum router.

use std::sync::Arc;

use llm_gateway::api::state::AppState;
use llm_gateway::api::build_router;
use llm_gateway::auth::{in_memory_verifier, AuthConfig};
use llm_gateway::config::GatewayConfig;
use llm_gateway::registry::{ProviderRegistry, SlotRegistry};
use llm_gateway::db;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("starting llm-gateway");

    let config = GatewayConfig::from_env()?;
    let pool = db::connect(&config).await?;

    let providers = ProviderRegistry::new(pool.clone(), config.encryption_key);
    let slots = SlotRegistry::new(pool);
    let state = Arc::new(AppState::new(providers, slots));

    let auth = Arc::new(AuthConfig {
        jwt_secret: config.jwt_secret.clone(),
        // Production deployments supply their own callback wired to the
        // external auth service (§1 — identity/API-key issuance is out of
        // scope for this core); this default accepts no keys.
        api_key_verifier: in_memory_verifier(Default::default()),
    });

    let app = build_router(state, auth);
    let addr = format!("{}:{}", config.server_host, config.server_port);
    info!("listening on http://{addr}");

    axum::Server::bind(&addr.parse()?)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

//! Process configuration, loaded once at startup from the environment.
//!
//! Mirrors the teacher's `dotenv` + env-var-presence-logging convention in
//! `src/bin/server.rs`: secrets are never logged, only whether they were set.

use std::env;

use base64::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Sdk,
    Http,
}

impl RuntimeMode {
    fn from_env(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "sdk" => Self::Sdk,
            _ => Self::Http,
        }
    }
}

#[derive(Clone)]
pub struct GatewayConfig {
    pub database_url: String,
    pub jwt_secret: String,
    /// 32 raw bytes, decoded from the base64 `LLM_ENCRYPTION_KEY` env var.
    pub encryption_key: [u8; 32],
    pub server_host: String,
    pub server_port: u16,
    pub db_pool_size: u32,
    pub db_max_overflow: u32,
    /// `LLM_RUNTIME_MODE`: governs non-streaming chat/embedding/rerank calls.
    pub runtime_mode: RuntimeMode,
    /// `LLM_RUNTIME_HTTP_FALLBACK`: whether a failed SDK call degrades to raw HTTP.
    pub runtime_http_fallback: bool,
    /// `LLM_STREAMING_RUNTIME`: streaming always defaults to raw HTTP (see DESIGN.md).
    pub streaming_runtime: RuntimeMode,
}

impl GatewayConfig {
    /// Loads configuration from the process environment, logging presence
    /// (never values) for every secret-bearing variable.
    pub fn from_env() -> anyhow::Result<Self> {
        if dotenv::dotenv().is_err() {
            tracing::warn!("no .env file found, relying on process environment");
        }

        let database_url = require_env("DATABASE_URL")?;
        let jwt_secret = require_env("JWT_SECRET")?;
        let encryption_key = decode_encryption_key(&require_env("LLM_ENCRYPTION_KEY")?)?;

        tracing::info!("DATABASE_URL set");
        tracing::info!("JWT_SECRET set");
        tracing::info!("LLM_ENCRYPTION_KEY set");

        Ok(Self {
            database_url,
            jwt_secret,
            encryption_key,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            db_pool_size: env::var("DB_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            db_max_overflow: env::var("DB_MAX_OVERFLOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            runtime_mode: RuntimeMode::from_env(
                &env::var("LLM_RUNTIME_MODE").unwrap_or_else(|_| "sdk".to_string()),
            ),
            runtime_http_fallback: env::var("LLM_RUNTIME_HTTP_FALLBACK")
                .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(true),
            streaming_runtime: RuntimeMode::from_env(
                &env::var("LLM_STREAMING_RUNTIME").unwrap_or_else(|_| "http".to_string()),
            ),
        })
    }

    /// The effective max pool size handed to sqlx: `DB_POOL_SIZE + DB_MAX_OVERFLOW`,
    /// since sqlx's pool is fixed-size rather than core+overflow (see DESIGN.md).
    pub fn effective_pool_size(&self) -> u32 {
        self.db_pool_size + self.db_max_overflow
    }
}

fn require_env(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("missing required environment variable {key}"))
}

fn decode_encryption_key(raw: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|e| anyhow::anyhow!("LLM_ENCRYPTION_KEY is not valid base64: {e}"))?;
    let key: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("LLM_ENCRYPTION_KEY must decode to exactly 32 bytes"))?;
    Ok(key)
}

//! Postgres connection pool and embedded migrations.
//!
//! The teacher declares `sqlx` (postgres, runtime-tokio-rustls) in
//! `Cargo.toml` but never uses it — storage there goes through NATS
//! JetStream. This module is newly authored against that declared but
//! previously-unused dependency.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::GatewayConfig;

pub async fn connect(config: &GatewayConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.effective_pool_size())
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database pool connected and migrations applied");
    Ok(pool)
}

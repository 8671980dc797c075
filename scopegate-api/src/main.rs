//! # Scopegate API Server
//!
//! CRUD REST API with email/password authentication, permission grants
//! resolved per scope, and encrypted response payloads.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p scopegate-api
//! ```

use scopegate_api::{
    app::{build_router, AppState},
    config::Config,
};
use scopegate_shared::{
    db::{migrations::run_migrations, pool},
    lock::{memory::MemoryLock, redis::RedisLock, DistributedLock, LockManager},
    mail::LogMailer,
    redis::{sanitize_url, RedisClient, RedisConfig},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "scopegate_api=debug,scopegate_shared=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Scopegate API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let mut db_config = pool::DatabaseConfig::new(config.database.url.clone());
    db_config.max_connections = config.database.max_connections;
    let db = pool::create_pool(db_config).await?;
    run_migrations(&db).await?;

    let backend: Arc<dyn DistributedLock> = match &config.lock.redis_url {
        Some(url) => {
            tracing::info!(url = %sanitize_url(url), "Using Redis lock store");
            let client = RedisClient::new(RedisConfig::new(url.clone())).await?;
            Arc::new(RedisLock::new(client))
        }
        None => {
            tracing::warn!("REDIS_URL not set, locks are local to this process");
            Arc::new(MemoryLock::new())
        }
    };
    let locks = LockManager::new(backend, config.lock.settings());

    let address = config.bind_address();
    let state = AppState::new(db.clone(), config, locks, Arc::new(LogMailer));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received, draining connections...");
    pool::close_pool(db).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

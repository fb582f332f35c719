use std::sync::Arc;

use curio_api::api::{create_router, AppState};
use curio_api::config::Config;
use curio_api::db::{create_redis_client, InMemoryProfileStore, ProfileStore, RedisProfileStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("curio_api=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Profiles live in Redis when configured, otherwise in process memory
    let store: Arc<dyn ProfileStore> = match config.redis_url.as_deref() {
        Some(redis_url) => {
            tracing::info!(redis_url = %redis_url, "Using Redis profile store");
            Arc::new(RedisProfileStore::new(create_redis_client(redis_url)?))
        }
        None => {
            tracing::warn!("REDIS_URL not set, profiles are kept in memory");
            Arc::new(InMemoryProfileStore::new())
        }
    };

    let state = AppState::new(store, config.engine_settings());
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

use taskbase_api::api;
use taskbase_api::config;
use taskbase_api::database::{MemoryStore, PgStore, RecordStore};
use taskbase_api::registry::RegistryBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = config::config();
    info!("Starting Taskbase API in {:?} mode", config.environment);

    let store: Arc<dyn RecordStore> = match &config.database.url {
        Some(_) => Arc::new(
            PgStore::connect(&config.database)
                .await
                .context("failed to connect to PostgreSQL")?,
        ),
        None => {
            warn!("DATABASE_URL not set; records are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    // Built once, before any request is accepted
    let registry = RegistryBuilder::new(config.registry.clone(), store).discover().build();
    registry
        .prepare_storage()
        .await
        .context("failed to prepare entity storage")?;
    info!("Serving entity kinds: {}", registry.kinds().join(", "));

    let app = api::router(Arc::new(registry));

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Taskbase API listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

//! HTTP server entry point.

use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use storefront_api::{app, AppConfig, AppState, MySqlDatabase, Resource, SchemaPolicy};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("storefront_api=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(config.connect_options()?)
        .await?;
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(
        Arc::new(MySqlDatabase::new(pool)),
        config,
        SchemaPolicy::default(),
    );
    state.repo.schema().preload(&Resource::all_tables()).await?;

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("storefront api listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

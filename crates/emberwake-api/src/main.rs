//! Emberwake API server entry point.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use emberwake_api::config::AppConfig;
use emberwake_api::error::AppError;
use emberwake_api::routes;
use emberwake_api::runtime::NarrativeRuntime;
use emberwake_api::state::AppState;
use emberwake_core::clock::SystemClock;
use emberwake_core::record::RecordStore;
use emberwake_core::rng::StdRngSource;
use emberwake_store::{MemoryRecordStore, PgRecordStore};

async fn record_store(config: &AppConfig) -> Result<Arc<dyn RecordStore>, AppError> {
    let Some(database_url) = &config.database_url else {
        warn!("DATABASE_URL is not set, records are kept in memory and lost on exit");
        return Ok(Arc::new(MemoryRecordStore::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await?;
    let store = PgRecordStore::new(pool);
    store.migrate().await?;
    info!("record store migrated");
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("Starting Emberwake API server");

    let config = AppConfig::from_env()?;
    let content = emberwake_content::load_dir(&config.content_dir)?;
    let store = record_store(&config).await?;

    let runtime = NarrativeRuntime::new(
        content,
        store,
        Arc::new(SystemClock),
        Box::new(StdRngSource::from_os()),
    );

    // TODO: Replace CorsLayer::permissive() with configured origins before exposing publicly.
    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(runtime));

    let addr = config.bind_address()?;
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! scangate API server.

use std::sync::Arc;

use scangate_api::{AppState, routes};
use scangate_config::{Settings, StorageBackend};
use scangate_core::evidence::EvidenceStore;
use scangate_store::{
    MemoryEvidenceStore, MemoryJobStore, MemoryReleaseStore, PgJobStore, PgReleaseStore,
    create_pool, run_migrations,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;
    // Raw payloads stay in memory under both backends; the evidence
    // store abstraction is where an object store would slot in.
    let evidence: Arc<dyn EvidenceStore> = Arc::new(MemoryEvidenceStore::new());

    let state = match settings.storage_backend {
        StorageBackend::Memory => {
            info!("Using in-memory job/release stores");
            AppState::new(
                settings.clone(),
                Arc::new(MemoryJobStore::new()),
                Arc::new(MemoryReleaseStore::new()),
                evidence,
            )
        }
        StorageBackend::Postgres => {
            info!("Connecting to database...");
            let pool = create_pool(&settings.database_url).await?;
            run_migrations(&pool).await?;
            info!("Database connected");
            AppState::new(
                settings.clone(),
                Arc::new(PgJobStore::new(pool.clone())),
                Arc::new(PgReleaseStore::new(pool)),
                evidence,
            )
        }
    };

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    info!(bind = %settings.bind, workers = settings.worker_count, "Starting server");
    let listener = TcpListener::bind(&settings.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

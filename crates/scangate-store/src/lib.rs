//! Storage layer for scangate.
//!
//! Provides the job/release store traits with in-memory implementations
//! (the default backend) and PostgreSQL implementations.

pub mod error;
pub mod evidence;
pub mod job;
pub mod release;

pub use error::{StoreError, StoreResult};
pub use evidence::MemoryEvidenceStore;
pub use job::{JobStore, KeyedInsert, MemoryJobStore, PgJobStore};
pub use release::{MemoryReleaseStore, PgReleaseStore, ReleaseSnapshot, ReleaseStore};

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a new database connection pool.
pub async fn create_pool(database_url: &str) -> StoreResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> StoreResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

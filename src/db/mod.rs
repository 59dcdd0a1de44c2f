pub mod backend;
pub mod instrumented;
pub mod memory;
pub mod schema;

#[cfg(feature = "postgres")]
pub mod postgres;

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;

pub use backend::{DatabaseBackend, DbResult};
pub use instrumented::InstrumentedDatabase;
pub use memory::MemoryBackend;

/// Database connection type - polymorphic over backends
pub type Database = Arc<dyn DatabaseBackend>;

/// Initialize the configured backend, running migrations for PostgreSQL
pub async fn init_database(config: &crate::config::DatabaseConfig) -> Result<Database> {
    let backend: Database = match config.url.as_deref() {
        #[cfg(feature = "postgres")]
        Some(url) => {
            info!("Initializing PostgreSQL backend");
            let pool = postgres::connection::create_pool(config, url).await?;
            postgres::connection::test_connection(&pool).await?;
            schema::run_migrations(&pool).await?;
            Arc::new(PostgresBackend::new(pool)) as Database
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            anyhow::bail!("DATABASE_URL is set but this build has no PostgreSQL support");
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory student store");
            Arc::new(MemoryBackend::new()) as Database
        }
    };

    Ok(Arc::new(InstrumentedDatabase::new(backend)))
}

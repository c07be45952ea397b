//! Postgres block store.
//!
//! The [`ExplorerBackend`] owns a bounded connection pool over the explorer database and the
//! exact SQL contract on the `blocks` table. Writes are idempotent (`ON CONFLICT (hash) DO
//! NOTHING`), batch writes are transactional, and nothing here retries: the sync service owns
//! retry policy so that fetch and write are retried together.
//!
//! [`BlockStore`] is the seam the sync service programs against; tests substitute an
//! in-memory implementation.

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

mod block_db;
mod error;
mod store;

pub use error::StorageError;
pub use store::BlockStore;

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            name: "pulsechain_explorer".into(),
            user: "postgres".into(),
            password: None,
            max_connections: 20,
        }
    }
}

pub struct ExplorerBackend {
    pool: PgPool,
}

impl ExplorerBackend {
    /// Opens a bounded connection pool against the explorer database.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user);
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool = PgPoolOptions::new().max_connections(config.max_connections).connect_with(options).await?;
        Ok(Self { pool })
    }

    /// Wraps an already-built pool. Used by tests that manage their own database.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Startup reachability probe.
    pub async fn health_check(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}

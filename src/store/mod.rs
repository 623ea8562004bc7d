//! Relational persistence: backend selection and the adapters behind [`Store`].
//!
//! The orchestrator only sees `Box<dyn Store>`. Which database sits behind it
//! is decided once, here, from [`StorageConfig`].

pub mod postgres;
pub mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use tracing::info;

use crate::config::StorageConfig;
use crate::contract::Store;

/// Text form of naive donation timestamps in backends without a datetime type.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Builds the configured backend. No connection is opened until first use.
pub fn connect(config: &StorageConfig) -> Box<dyn Store> {
    match config {
        StorageConfig::Sqlite(sqlite) => {
            info!(path = %sqlite.path.display(), "Using sqlite store");
            Box::new(SqliteStore::new(sqlite.path.clone()))
        }
        StorageConfig::Postgres(pg) => {
            info!(host = %pg.host, port = pg.port, dbname = %pg.dbname, "Using postgres store");
            Box::new(PostgresStore::new(pg.connection_string()))
        }
    }
}

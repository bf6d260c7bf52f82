//! Store selection.
//!
//! Persistent backends are compiled in through cargo features. Requesting one
//! that is not compiled in logs a warning and falls back to the in-memory store.

use crate::domain::ports::WalletStoreBox;
use crate::error::Result;
use crate::infrastructure::in_memory::InMemoryWalletStore;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    RocksDb { path: PathBuf },
    Postgres { url: String, max_connections: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Upper bound on waiting for a row lock; `None` waits indefinitely.
    pub lock_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::InMemory,
            lock_timeout: None,
        }
    }
}

impl StoreConfig {
    /// Picks a backend from the CLI options. A database URL wins over a RocksDB path.
    pub fn from_options(
        db_path: Option<PathBuf>,
        database_url: Option<String>,
        max_connections: u32,
        lock_timeout_ms: Option<u64>,
    ) -> Self {
        let backend = match (database_url, db_path) {
            (Some(url), _) => StoreBackend::Postgres {
                url,
                max_connections,
            },
            (None, Some(path)) => StoreBackend::RocksDb { path },
            (None, None) => StoreBackend::InMemory,
        };
        Self {
            backend,
            lock_timeout: lock_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Opens the configured store.
pub async fn open_store(config: &StoreConfig) -> Result<WalletStoreBox> {
    match &config.backend {
        StoreBackend::InMemory => {
            info!("using in-memory wallet store");
            Ok(Box::new(InMemoryWalletStore::with_lock_timeout(
                config.lock_timeout,
            )))
        }
        StoreBackend::RocksDb { path } => open_rocksdb(path, config.lock_timeout),
        StoreBackend::Postgres {
            url,
            max_connections,
        } => open_postgres(url, *max_connections, config.lock_timeout).await,
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_rocksdb(path: &std::path::Path, lock_timeout: Option<Duration>) -> Result<WalletStoreBox> {
    use crate::infrastructure::rocksdb::RocksDbWalletStore;

    info!(path = %path.display(), "using RocksDB wallet store");
    Ok(Box::new(RocksDbWalletStore::open(path, lock_timeout)?))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_rocksdb(path: &std::path::Path, lock_timeout: Option<Duration>) -> Result<WalletStoreBox> {
    tracing::warn!(
        path = %path.display(),
        "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
    );
    Ok(Box::new(InMemoryWalletStore::with_lock_timeout(lock_timeout)))
}

#[cfg(feature = "storage-postgres")]
async fn open_postgres(
    url: &str,
    max_connections: u32,
    lock_timeout: Option<Duration>,
) -> Result<WalletStoreBox> {
    use crate::infrastructure::postgres::PostgresWalletStore;

    let store = PostgresWalletStore::connect(url, max_connections, lock_timeout).await?;
    store.migrate().await?;
    info!("using PostgreSQL wallet store");
    Ok(Box::new(store))
}

#[cfg(not(feature = "storage-postgres"))]
async fn open_postgres(
    _url: &str,
    _max_connections: u32,
    lock_timeout: Option<Duration>,
) -> Result<WalletStoreBox> {
    tracing::warn!(
        "PostgreSQL requested via --database-url, but 'storage-postgres' feature is not enabled. Falling back to in-memory storage."
    );
    Ok(Box::new(InMemoryWalletStore::with_lock_timeout(lock_timeout)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection() {
        let config = StoreConfig::from_options(None, None, DEFAULT_MAX_CONNECTIONS, None);
        assert_eq!(config, StoreConfig::default());

        let config = StoreConfig::from_options(Some("db".into()), None, 4, Some(250));
        assert_eq!(
            config.backend,
            StoreBackend::RocksDb { path: "db".into() }
        );
        assert_eq!(config.lock_timeout, Some(Duration::from_millis(250)));

        let config = StoreConfig::from_options(
            Some("db".into()),
            Some("postgres://localhost/ledger".to_string()),
            4,
            None,
        );
        assert_eq!(
            config.backend,
            StoreBackend::Postgres {
                url: "postgres://localhost/ledger".to_string(),
                max_connections: 4,
            }
        );
    }

    #[tokio::test]
    async fn test_open_in_memory_store() {
        let store = open_store(&StoreConfig::default()).await.unwrap();
        assert!(store.wallets().await.unwrap().is_empty());
    }
}

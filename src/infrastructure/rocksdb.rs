use super::locking::{LockingTransaction, RowBackend};
use super::row_locks::RowLocks;
use crate::domain::ports::{WalletStore, WalletTransactionBox};
use crate::domain::wallet::{Address, Wallet};
use crate::error::StoreError;
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Column Family for storing wallet rows.
pub const CF_WALLETS: &str = "wallets";

/// A persistent wallet store backed by RocksDB.
///
/// Rows are JSON-encoded wallets keyed by the address bytes. Row-level
/// exclusion is provided by an in-process [`RowLocks`] table, and a commit
/// lands as a single `WriteBatch`, so either every row of a transfer is
/// persisted or none is.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>` and lock table).
#[derive(Clone)]
pub struct RocksDbWalletStore {
    db: Arc<DB>,
    locks: RowLocks,
}

impl RocksDbWalletStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "wallets" column family exists.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    /// * `lock_timeout` - Upper bound on row lock waits; `None` waits indefinitely.
    pub fn open<P: AsRef<Path>>(path: P, lock_timeout: Option<Duration>) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_wallets = ColumnFamilyDescriptor::new(CF_WALLETS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_wallets])?;

        Ok(Self {
            db: Arc::new(db),
            locks: RowLocks::with_timeout(lock_timeout),
        })
    }

    fn wallets_cf(&self) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(CF_WALLETS)
            .ok_or_else(|| StoreError::Unavailable("wallets column family not found".to_string()))
    }
}

fn decode(key: &[u8], bytes: &[u8]) -> Result<Wallet, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl RowBackend for RocksDbWalletStore {
    async fn read(&self, address: &Address) -> Result<Option<Wallet>, StoreError> {
        let cf = self.wallets_cf()?;
        let key = address.as_str().as_bytes();
        match self.db.get_cf(cf, key)? {
            Some(bytes) => decode(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn apply(&self, wallets: Vec<Wallet>) -> Result<(), StoreError> {
        let cf = self.wallets_cf()?;
        let mut batch = WriteBatch::default();
        for wallet in &wallets {
            let value = serde_json::to_vec(wallet)?;
            batch.put_cf(cf, wallet.address.as_str().as_bytes(), value);
        }
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl WalletStore for RocksDbWalletStore {
    async fn begin(&self) -> Result<WalletTransactionBox, StoreError> {
        Ok(Box::new(LockingTransaction::new(
            self.clone(),
            self.locks.clone(),
        )))
    }

    async fn get(&self, address: &Address) -> Result<Option<Wallet>, StoreError> {
        self.read(address).await
    }

    async fn wallets(&self) -> Result<Vec<Wallet>, StoreError> {
        let cf = self.wallets_cf()?;
        let mut wallets = Vec::new();

        // Keys iterate in byte order, which matches the address ordering.
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            wallets.push(decode(&key, &value)?);
        }

        Ok(wallets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::wallet::Balance;
    use tempfile::tempdir;

    fn addr(value: &str) -> Address {
        Address::parse(value).unwrap()
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDbWalletStore::open(dir.path(), None).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_WALLETS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_commit_and_read_back() {
        let dir = tempdir().unwrap();
        let store = RocksDbWalletStore::open(dir.path(), None).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.create(&Wallet::with_balance(addr("B"), Balance::new(7)))
            .await
            .unwrap();
        tx.create(&Wallet::with_balance(addr("A"), Balance::new(3)))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let wallet = store.get(&addr("A")).await.unwrap().unwrap();
        assert_eq!(wallet.balance, Balance::new(3));

        let all = store.wallets().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].address, addr("A"));
        assert_eq!(all[1].address, addr("B"));
    }

    #[tokio::test]
    async fn test_rocksdb_rollback_leaves_no_rows() {
        let dir = tempdir().unwrap();
        let store = RocksDbWalletStore::open(dir.path(), None).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.create(&Wallet::new(addr("A"))).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(store.get(&addr("A")).await.unwrap().is_none());
        assert!(store.wallets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rocksdb_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDbWalletStore::open(dir.path(), None).unwrap();
            let mut tx = store.begin().await.unwrap();
            tx.create(&Wallet::with_balance(addr("A"), Balance::new(42)))
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }

        let store = RocksDbWalletStore::open(dir.path(), None).unwrap();
        let wallet = store.get(&addr("A")).await.unwrap().unwrap();
        assert_eq!(wallet.balance, Balance::new(42));
    }
}

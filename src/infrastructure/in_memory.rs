use super::locking::{LockingTransaction, RowBackend};
use super::row_locks::RowLocks;
use crate::domain::ports::{WalletStore, WalletTransactionBox};
use crate::domain::wallet::{Address, Wallet};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// A thread-safe in-memory wallet store.
///
/// Committed rows live in an `Arc<RwLock<HashMap<Address, Wallet>>>`; row-level
/// exclusion comes from a shared [`RowLocks`] table. Cloning shares both.
/// Ideal for testing or for single-process runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    rows: Arc<RwLock<HashMap<Address, Wallet>>>,
    locks: RowLocks,
}

impl InMemoryWalletStore {
    /// Creates a new, empty in-memory store whose lock waits never time out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that fails lock waits longer than `timeout`.
    pub fn with_lock_timeout(timeout: Option<Duration>) -> Self {
        Self {
            rows: Arc::default(),
            locks: RowLocks::with_timeout(timeout),
        }
    }
}

#[async_trait]
impl RowBackend for InMemoryWalletStore {
    async fn read(&self, address: &Address) -> Result<Option<Wallet>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.get(address).cloned())
    }

    async fn apply(&self, wallets: Vec<Wallet>) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        for wallet in wallets {
            rows.insert(wallet.address.clone(), wallet);
        }
        Ok(())
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
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
        let rows = self.rows.read().await;
        let mut wallets: Vec<Wallet> = rows.values().cloned().collect();
        wallets.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(wallets)
    }
}

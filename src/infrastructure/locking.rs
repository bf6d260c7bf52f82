use super::row_locks::{RowGuard, RowLocks};
use crate::domain::ports::WalletTransaction;
use crate::domain::wallet::{Address, Wallet};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

/// Committed row storage behind a [`LockingTransaction`].
#[async_trait]
pub trait RowBackend: Send + Sync + 'static {
    async fn read(&self, address: &Address) -> Result<Option<Wallet>, StoreError>;

    /// Persists all `rows` as one atomic write.
    async fn apply(&self, rows: Vec<Wallet>) -> Result<(), StoreError>;
}

/// A transaction built from a [`RowLocks`] table and a committed-rows backend.
///
/// Writes are buffered and only reach the backend on commit, so a rolled back
/// or dropped transaction never leaves partial state behind. Row locks are
/// released after the backend has applied the writes.
pub struct LockingTransaction<B: RowBackend> {
    backend: B,
    locks: RowLocks,
    held: HashMap<Address, RowGuard>,
    pending: BTreeMap<Address, Wallet>,
}

impl<B: RowBackend> LockingTransaction<B> {
    pub fn new(backend: B, locks: RowLocks) -> Self {
        Self {
            backend,
            locks,
            held: HashMap::new(),
            pending: BTreeMap::new(),
        }
    }

    async fn ensure_locked(&mut self, address: &Address) -> Result<(), StoreError> {
        if !self.held.contains_key(address) {
            let guard = self.locks.acquire(address).await?;
            self.held.insert(address.clone(), guard);
        }
        Ok(())
    }

    async fn current(&self, address: &Address) -> Result<Option<Wallet>, StoreError> {
        match self.pending.get(address) {
            Some(wallet) => Ok(Some(wallet.clone())),
            None => self.backend.read(address).await,
        }
    }
}

#[async_trait]
impl<B: RowBackend> WalletTransaction for LockingTransaction<B> {
    async fn lock_and_get(&mut self, address: &Address) -> Result<Option<Wallet>, StoreError> {
        self.ensure_locked(address).await?;
        self.current(address).await
    }

    async fn create(&mut self, wallet: &Wallet) -> Result<(), StoreError> {
        self.ensure_locked(&wallet.address).await?;
        if self.current(&wallet.address).await?.is_some() {
            return Err(StoreError::AlreadyExists {
                address: wallet.address.clone(),
            });
        }
        self.pending.insert(wallet.address.clone(), wallet.clone());
        Ok(())
    }

    async fn save(&mut self, wallet: &Wallet) -> Result<(), StoreError> {
        if !self.held.contains_key(&wallet.address) {
            return Err(StoreError::NotLocked {
                address: wallet.address.clone(),
            });
        }
        if self.current(&wallet.address).await?.is_none() {
            return Err(StoreError::MissingRow {
                address: wallet.address.clone(),
            });
        }
        self.pending.insert(wallet.address.clone(), wallet.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let LockingTransaction {
            backend,
            held,
            pending,
            ..
        } = *self;

        let result = if pending.is_empty() {
            Ok(())
        } else {
            backend.apply(pending.into_values().collect()).await
        };
        drop(held);
        result
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

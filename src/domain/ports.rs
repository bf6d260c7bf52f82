use super::wallet::{Address, Wallet};
use crate::error::StoreError;
use async_trait::async_trait;

/// A transactional store of wallet rows.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Opens a new atomic unit of work.
    async fn begin(&self) -> Result<WalletTransactionBox, StoreError>;

    /// Reads the committed state of a wallet without taking any lock.
    async fn get(&self, address: &Address) -> Result<Option<Wallet>, StoreError>;

    /// All committed wallets, sorted by address.
    async fn wallets(&self) -> Result<Vec<Wallet>, StoreError>;
}

/// A single open transaction against a [`WalletStore`].
///
/// Locks taken through `lock_and_get` or `create` are held until the
/// transaction commits, rolls back, or is dropped. Dropping without
/// committing discards every buffered write.
#[async_trait]
pub trait WalletTransaction: Send {
    /// Takes the exclusive row lock on `address` and returns its current state.
    ///
    /// Waits while another transaction holds the lock. Locking an address this
    /// transaction already holds returns immediately.
    async fn lock_and_get(&mut self, address: &Address) -> Result<Option<Wallet>, StoreError>;

    /// Inserts a new row, failing with [`StoreError::AlreadyExists`] if the
    /// address is already taken, including by a concurrent transaction that
    /// committed first.
    async fn create(&mut self, wallet: &Wallet) -> Result<(), StoreError>;

    /// Updates an existing row that this transaction has locked.
    async fn save(&mut self, wallet: &Wallet) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

pub type WalletStoreBox = Box<dyn WalletStore>;
pub type WalletTransactionBox = Box<dyn WalletTransaction>;

use crate::domain::ports::WalletStore;
use crate::domain::wallet::{Address, Balance, Wallet};
use crate::error::StoreError;
use tracing::info;

/// Address of the wallet that holds the initial supply of a fresh ledger.
pub const GENESIS_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
pub const GENESIS_BALANCE: Balance = Balance(1_000_000);

/// Creates `address` with `balance` unless it already exists.
///
/// Returns `true` if the wallet was created. An existing wallet keeps its
/// balance, so seeding twice never mints twice.
pub async fn seed_wallet(
    store: &dyn WalletStore,
    address: &Address,
    balance: Balance,
) -> Result<bool, StoreError> {
    let mut tx = store.begin().await?;
    if tx.lock_and_get(address).await?.is_some() {
        tx.rollback().await?;
        return Ok(false);
    }

    match tx.create(&Wallet::with_balance(address.clone(), balance)).await {
        Ok(()) => {}
        Err(StoreError::AlreadyExists { .. }) => {
            tx.rollback().await?;
            return Ok(false);
        }
        Err(err) => return Err(err),
    }
    tx.commit().await?;

    info!(%address, %balance, "seeded wallet");
    Ok(true)
}

/// Seeds the genesis wallet if the store holds no wallets at all.
pub async fn seed_genesis(store: &dyn WalletStore) -> Result<bool, StoreError> {
    if !store.wallets().await?.is_empty() {
        return Ok(false);
    }
    let address = Address::parse(GENESIS_ADDRESS)
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
    seed_wallet(store, &address, GENESIS_BALANCE).await
}

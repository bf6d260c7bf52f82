use crate::domain::ports::{WalletStoreBox, WalletTransaction};
use crate::domain::wallet::{Address, Amount, Balance, Wallet};
use crate::error::{StoreError, TransferError};
use tracing::{debug, info, warn};

/// Moves value between wallets held in a transactional [`WalletStore`].
///
/// The engine keeps no state of its own between calls and takes no
/// in-process locks: every transfer re-reads both rows under the store's
/// exclusive row locks inside a single transaction.
///
/// [`WalletStore`]: crate::domain::ports::WalletStore
pub struct TransferEngine {
    store: WalletStoreBox,
}

impl TransferEngine {
    /// Creates a new `TransferEngine` over the given store.
    pub fn new(store: WalletStoreBox) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &WalletStoreBox {
        &self.store
    }

    /// Transfers `amount` units from `from` to `to` and returns the sender's
    /// balance after the commit.
    ///
    /// The receiver is created with a zero balance if it does not exist yet.
    /// When `from == to` the wallet must exist and cover `amount`; nothing is
    /// written and its current balance is returned.
    ///
    /// Any failure rolls the whole transaction back. The engine never retries.
    pub async fn transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: i64,
    ) -> Result<Balance, TransferError> {
        let amount = Amount::new(amount)?;

        let mut tx = self.store.begin().await?;
        match execute(tx.as_mut(), from, to, amount).await {
            Ok(balance) => {
                tx.commit().await?;
                info!(%from, %to, amount = amount.value(), %balance, "transfer committed");
                Ok(balance)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(%from, %to, error = %rollback_err, "rollback failed");
                }
                debug!(%from, %to, amount = amount.value(), error = %err, "transfer rolled back");
                Err(err)
            }
        }
    }
}

async fn execute(
    tx: &mut dyn WalletTransaction,
    from: &Address,
    to: &Address,
    amount: Amount,
) -> Result<Balance, TransferError> {
    if from == to {
        let wallet = tx
            .lock_and_get(from)
            .await?
            .ok_or_else(|| TransferError::SenderNotFound {
                address: from.clone(),
            })?;
        if !wallet.can_cover(amount) {
            return Err(TransferError::InsufficientBalance {
                address: wallet.address,
                required: amount.value(),
                available: wallet.balance.value(),
            });
        }
        return Ok(wallet.balance);
    }

    // Both directions of a pair lock in the same order, so no cycle of waits can form.
    let (first, second) = if from < to { (from, to) } else { (to, from) };
    let first = acquire(tx, first, from).await?;
    let second = acquire(tx, second, from).await?;

    let (mut sender, mut receiver) = if first.address == *from {
        (first, second)
    } else {
        (second, first)
    };

    sender.withdraw(amount)?;
    receiver.deposit(amount)?;

    tx.save(&sender).await?;
    tx.save(&receiver).await?;

    Ok(sender.balance)
}

/// Locks `address` and returns its row, creating the receiver if it is missing.
///
/// Store failures on the receiver's row surface as `ReceiverResolutionFailed`,
/// except lock timeouts, which stay `Store(LockTimeout)` for either role.
async fn acquire(
    tx: &mut dyn WalletTransaction,
    address: &Address,
    sender: &Address,
) -> Result<Wallet, TransferError> {
    let is_sender = address == sender;
    let row = match tx.lock_and_get(address).await {
        Ok(row) => row,
        Err(err @ StoreError::LockTimeout { .. }) => return Err(err.into()),
        Err(err) if is_sender => return Err(err.into()),
        Err(source) => {
            return Err(TransferError::ReceiverResolutionFailed {
                address: address.clone(),
                source,
            });
        }
    };

    match row {
        Some(wallet) => Ok(wallet),
        None if is_sender => Err(TransferError::SenderNotFound {
            address: address.clone(),
        }),
        None => materialize_receiver(tx, address).await,
    }
}

async fn materialize_receiver(
    tx: &mut dyn WalletTransaction,
    address: &Address,
) -> Result<Wallet, TransferError> {
    let wallet = Wallet::new(address.clone());
    match tx.create(&wallet).await {
        Ok(()) => {
            info!(%address, "initialized wallet with balance 0");
            Ok(wallet)
        }
        Err(StoreError::AlreadyExists { .. }) => {
            debug!(%address, "receiver created concurrently, re-reading under lock");
            match tx.lock_and_get(address).await {
                Ok(Some(wallet)) => Ok(wallet),
                Ok(None) => Err(TransferError::ReceiverResolutionFailed {
                    address: address.clone(),
                    source: StoreError::MissingRow {
                        address: address.clone(),
                    },
                }),
                Err(source) => Err(TransferError::ReceiverResolutionFailed {
                    address: address.clone(),
                    source,
                }),
            }
        }
        Err(source) => Err(TransferError::ReceiverResolutionFailed {
            address: address.clone(),
            source,
        }),
    }
}

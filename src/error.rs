use crate::domain::wallet::Address;
use thiserror::Error;

/// Failures raised by a wallet store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("wallet {address} already exists")]
    AlreadyExists { address: Address },
    #[error("timed out waiting for the lock on wallet {address}")]
    LockTimeout { address: Address },
    #[error("wallet {address} is not locked by this transaction")]
    NotLocked { address: Address },
    #[error("wallet {address} does not exist")]
    MissingRow { address: Address },
    #[error("corrupt wallet record for {key}: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[cfg(feature = "storage-postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a failed transfer.
///
/// Callers match on the variant; the messages are for humans only.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("transfer amount must be greater than 0, got {amount}")]
    InvalidAmount { amount: i64 },
    #[error("invalid wallet address {0:?}")]
    InvalidAddress(String),
    #[error("sender wallet {address} not found")]
    SenderNotFound { address: Address },
    #[error("failed to resolve receiver wallet {address}: {source}")]
    ReceiverResolutionFailed {
        address: Address,
        #[source]
        source: StoreError,
    },
    #[error("insufficient balance in wallet {address}: required {required}, available {available}")]
    InsufficientBalance {
        address: Address,
        required: u64,
        available: u64,
    },
    #[error("balance of wallet {address} would overflow")]
    BalanceOverflow { address: Address },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StoreError {
    /// Lock contention or a connectivity failure, as opposed to bad data.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::LockTimeout { .. } | StoreError::Unavailable(_) => true,
            #[cfg(feature = "storage-postgres")]
            StoreError::Postgres(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::WorkerCrashed
            ),
            _ => false,
        }
    }
}

impl TransferError {
    /// Whether the same request may succeed if submitted again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransferError::InsufficientBalance { .. } => true,
            TransferError::Store(err) => err.is_transient(),
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error(transparent)]
    TransferError(#[from] TransferError),
    #[error(transparent)]
    StoreError(#[from] StoreError),
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

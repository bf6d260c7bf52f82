//! PostgreSQL wallet store.
//!
//! Row locking is delegated to the database (`SELECT ... FOR UPDATE`) and
//! concurrent creation of the same wallet is resolved by the primary key.

use crate::domain::ports::{WalletStore, WalletTransaction, WalletTransactionBox};
use crate::domain::wallet::{Address, Balance, Wallet};
use crate::error::StoreError;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use std::time::Duration;

/// SQLSTATE raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

const CREATE_WALLETS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS wallets (
        address TEXT PRIMARY KEY,
        balance BIGINT NOT NULL CHECK (balance >= 0)
    )
"#;

/// PostgreSQL-backed wallet store.
#[derive(Clone)]
pub struct PostgresWalletStore {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PostgresWalletStore {
    /// Create a new connection pool.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        lock_timeout: Option<Duration>,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool, lock_timeout })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool, lock_timeout: Option<Duration>) -> Self {
        Self { pool, lock_timeout }
    }

    /// Create the `wallets` table if it does not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_WALLETS_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

fn wallet_from_row(row: &PgRow) -> Result<Wallet, StoreError> {
    let address: String = row.try_get("address")?;
    let balance: i64 = row.try_get("balance")?;

    let units = u64::try_from(balance).map_err(|_| StoreError::Corrupt {
        key: address.clone(),
        reason: format!("negative balance {balance}"),
    })?;
    let address = Address::parse(address.clone()).map_err(|e| StoreError::Corrupt {
        key: address,
        reason: e.to_string(),
    })?;

    Ok(Wallet::with_balance(address, Balance::new(units)))
}

fn balance_param(wallet: &Wallet) -> Result<i64, StoreError> {
    i64::try_from(wallet.balance.value()).map_err(|_| StoreError::Corrupt {
        key: wallet.address.to_string(),
        reason: format!("balance {} exceeds BIGINT", wallet.balance),
    })
}

fn lock_error(err: sqlx::Error, address: &Address) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE)
    {
        return StoreError::LockTimeout {
            address: address.clone(),
        };
    }
    StoreError::Postgres(err)
}

#[async_trait]
impl WalletStore for PostgresWalletStore {
    async fn begin(&self) -> Result<WalletTransactionBox, StoreError> {
        let mut tx = self.pool.begin().await?;

        if let Some(timeout) = self.lock_timeout {
            // SET does not accept bind parameters.
            let statement = format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis());
            sqlx::query(&statement).execute(&mut *tx).await?;
        }

        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn get(&self, address: &Address) -> Result<Option<Wallet>, StoreError> {
        let row = sqlx::query("SELECT address, balance FROM wallets WHERE address = $1")
            .bind(address.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(wallet_from_row).transpose()
    }

    async fn wallets(&self) -> Result<Vec<Wallet>, StoreError> {
        let rows = sqlx::query("SELECT address, balance FROM wallets ORDER BY address COLLATE \"C\"")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(wallet_from_row).collect()
    }
}

/// One open PostgreSQL transaction. Dropping it rolls back.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl WalletTransaction for PostgresTransaction {
    async fn lock_and_get(&mut self, address: &Address) -> Result<Option<Wallet>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT address, balance FROM wallets
            WHERE address = $1
            FOR UPDATE
            "#,
        )
        .bind(address.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| lock_error(e, address))?;

        row.as_ref().map(wallet_from_row).transpose()
    }

    async fn create(&mut self, wallet: &Wallet) -> Result<(), StoreError> {
        // A concurrent uncommitted insert of the same key makes this wait;
        // once that one commits, no row is inserted here.
        let result = sqlx::query(
            r#"
            INSERT INTO wallets (address, balance)
            VALUES ($1, $2)
            ON CONFLICT (address) DO NOTHING
            "#,
        )
        .bind(wallet.address.as_str())
        .bind(balance_param(wallet)?)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| lock_error(e, &wallet.address))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists {
                address: wallet.address.clone(),
            });
        }
        Ok(())
    }

    async fn save(&mut self, wallet: &Wallet) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE wallets SET balance = $2 WHERE address = $1")
            .bind(wallet.address.as_str())
            .bind(balance_param(wallet)?)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| lock_error(e, &wallet.address))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRow {
                address: wallet.address.clone(),
            });
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(value: &str) -> Address {
        Address::parse(value).unwrap()
    }

    #[test]
    fn test_balance_param_rejects_values_beyond_bigint() {
        let wallet = Wallet::with_balance(addr("A"), Balance::new(u64::MAX));
        assert!(matches!(
            balance_param(&wallet),
            Err(StoreError::Corrupt { .. })
        ));

        let wallet = Wallet::with_balance(addr("A"), Balance::new(10));
        assert_eq!(balance_param(&wallet).unwrap(), 10);
    }

    #[test]
    fn test_non_database_errors_are_not_lock_timeouts() {
        let err = lock_error(sqlx::Error::RowNotFound, &addr("A"));
        assert!(matches!(err, StoreError::Postgres(_)));
    }
}

//! PostgreSQL wallet store
//!
//! # Tables
//!
//! - `wallets` - one row per wallet, current balance (mutable projection)
//! - `wallet_operations` - append-only ledger, indexed by `(id_wallet, created_at)`
//!
//! The per-wallet lock is the row lock taken by `SELECT ... FOR UPDATE`,
//! bounded by `lock_timeout` in wait mode or `NOWAIT` in no-wait mode.

use crate::{
    config::{EngineConfig, LockPolicy},
    error::{Result, WalletError},
    store::{UnitOfWork, WalletStore},
    types::{Amount, LedgerEntry, OperationType, Wallet, WalletId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS wallets (
        id_wallet UUID PRIMARY KEY,
        balance BIGINT NOT NULL DEFAULT 0 CHECK (balance >= 0),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS wallet_operations (
        id_operation UUID PRIMARY KEY,
        id_wallet UUID NOT NULL REFERENCES wallets(id_wallet),
        operation_type VARCHAR(16) NOT NULL CHECK (operation_type IN ('DEPOSIT', 'WITHDRAW')),
        amount BIGINT NOT NULL CHECK (amount > 0),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_wallet_operations_wallet_id_created_at
    ON wallet_operations (id_wallet, created_at)
    "#,
];

/// PostgreSQL-backed [`WalletStore`]
#[derive(Clone)]
pub struct PgWalletStore {
    pool: PgPool,
    policy: LockPolicy,
}

impl PgWalletStore {
    /// Store over an existing pool
    pub fn new(pool: PgPool, config: &EngineConfig) -> Self {
        Self {
            pool,
            policy: config.lock_policy,
        }
    }

    /// Underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if missing
    pub async fn init_schema(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!("Wallet schema initialized");
        Ok(())
    }
}

fn wallet_from_row(row: &PgRow) -> Result<Wallet> {
    Ok(Wallet {
        id: WalletId::from_uuid(row.try_get("id_wallet")?),
        balance: row.try_get("balance")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<LedgerEntry> {
    let raw_type: String = row.try_get("operation_type")?;
    let operation_type = raw_type
        .parse::<OperationType>()
        .map_err(WalletError::StorageUnavailable)?;
    let raw_amount: i64 = row.try_get("amount")?;
    let amount = Amount::new(raw_amount).ok_or_else(|| {
        WalletError::StorageUnavailable(format!("non-positive ledger amount {}", raw_amount))
    })?;

    Ok(LedgerEntry {
        id: row.try_get("id_operation")?,
        wallet_id: WalletId::from_uuid(row.try_get("id_wallet")?),
        operation_type,
        amount,
        created_at: row.try_get("created_at")?,
    })
}

async fn insert_entry(tx: &mut Transaction<'static, Postgres>, entry: &LedgerEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO wallet_operations (id_operation, id_wallet, operation_type, amount, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(entry.id)
    .bind(*entry.wallet_id.as_uuid())
    .bind(entry.operation_type.as_str())
    .bind(entry.amount.minor_units())
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork {
            tx,
            policy: self.policy,
            scope: None,
        }))
    }

    async fn get_wallet(&self, wallet_id: WalletId) -> Result<Option<Wallet>> {
        let row = sqlx::query(
            r#"
            SELECT id_wallet, balance, created_at, updated_at
            FROM wallets
            WHERE id_wallet = $1
            "#,
        )
        .bind(*wallet_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(wallet_from_row).transpose()
    }

    async fn ledger_entries(&self, wallet_id: WalletId) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id_operation, id_wallet, operation_type, amount, created_at
            FROM wallet_operations
            WHERE id_wallet = $1
            ORDER BY created_at ASC, id_operation ASC
            "#,
        )
        .bind(*wallet_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn create_wallet(&self, wallet_id: WalletId, opening_balance: i64) -> Result<Wallet> {
        if opening_balance < 0 {
            return Err(WalletError::InvalidInput(format!(
                "opening balance must not be negative, got {}",
                opening_balance
            )));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO wallets (id_wallet, balance, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (id_wallet) DO NOTHING
            RETURNING id_wallet, balance, created_at, updated_at
            "#,
        )
        .bind(*wallet_id.as_uuid())
        .bind(opening_balance)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let wallet = match row {
            Some(row) => wallet_from_row(&row)?,
            None => return Err(WalletError::WalletExists(wallet_id)),
        };

        if let Some(amount) = Amount::new(opening_balance) {
            let entry = LedgerEntry::new(wallet_id, OperationType::Credit, amount, now);
            insert_entry(&mut tx, &entry).await?;
        }

        tx.commit().await?;

        debug!("Created wallet {} with balance {}", wallet_id, opening_balance);
        Ok(wallet)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    policy: LockPolicy,
    scope: Option<WalletId>,
}

impl PgUnitOfWork {
    fn ensure_scope(&self, wallet_id: WalletId) -> Result<()> {
        match self.scope {
            Some(locked) if locked == wallet_id => Ok(()),
            Some(locked) => Err(WalletError::StorageUnavailable(format!(
                "unit of work is scoped to wallet {}, not {}",
                locked, wallet_id
            ))),
            None => Err(WalletError::StorageUnavailable(format!(
                "wallet {} is not locked by this unit of work",
                wallet_id
            ))),
        }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_and_read_balance(&mut self, wallet_id: WalletId) -> Result<Option<Wallet>> {
        if self.scope.is_some() {
            self.ensure_scope(wallet_id)?;
        }

        let statement = match self.policy.timeout_ms() {
            Some(timeout_ms) => {
                // SET LOCAL cannot take bind parameters; set_config(.., true) is the same thing.
                sqlx::query("SELECT set_config('lock_timeout', $1, true)")
                    .bind(format!("{}ms", timeout_ms.max(1)))
                    .execute(&mut *self.tx)
                    .await?;
                r#"
                SELECT id_wallet, balance, created_at, updated_at
                FROM wallets
                WHERE id_wallet = $1
                FOR UPDATE
                "#
            }
            None => {
                r#"
                SELECT id_wallet, balance, created_at, updated_at
                FROM wallets
                WHERE id_wallet = $1
                FOR UPDATE NOWAIT
                "#
            }
        };

        let row = sqlx::query(statement)
            .bind(*wallet_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        let wallet = row.as_ref().map(wallet_from_row).transpose()?;
        if wallet.is_some() {
            self.scope = Some(wallet_id);
        }
        Ok(wallet)
    }

    async fn insert_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.ensure_scope(entry.wallet_id)?;
        insert_entry(&mut self.tx, entry).await
    }

    async fn write_balance(
        &mut self,
        wallet_id: WalletId,
        new_balance: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_scope(wallet_id)?;
        if new_balance < 0 {
            return Err(WalletError::InvalidInput(format!(
                "balance of wallet {} must not be negative, got {}",
                wallet_id, new_balance
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = $1, updated_at = $2
            WHERE id_wallet = $3
            "#,
        )
        .bind(new_balance)
        .bind(updated_at)
        .bind(*wallet_id.as_uuid())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(WalletError::StorageUnavailable(format!(
                "balance update of wallet {} touched {} rows",
                wallet_id,
                result.rows_affected()
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

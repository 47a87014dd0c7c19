//! Persistence contracts for the Balance Store and the Ledger Store
//!
//! A backend provides one capability: "begin an exclusive unit of work scoped
//! to wallet K, read, mutate, commit or abort". The relational backend does it
//! with a row lock, the in-memory backend with a per-wallet mutex.
//!
//! # Guarantees required from every backend
//!
//! - Locking one wallet never blocks a unit of work on another wallet
//! - Lock acquisition follows the store's [`LockPolicy`](crate::config::LockPolicy)
//!   and never waits unboundedly
//! - Nothing written inside a unit of work is visible before `commit`
//! - Dropping a unit of work without committing is an abort

use crate::{
    error::Result,
    types::{LedgerEntry, Wallet, WalletId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Store of wallets and their ledger
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Open a new atomic unit of work
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    /// Point read of a wallet row; takes no lock
    async fn get_wallet(&self, wallet_id: WalletId) -> Result<Option<Wallet>>;

    /// Ledger entries of a wallet ordered by `(created_at, id)`
    async fn ledger_entries(&self, wallet_id: WalletId) -> Result<Vec<LedgerEntry>>;

    /// Seed/admin path: create a wallet with an opening balance.
    ///
    /// A positive opening balance is recorded as an opening CREDIT entry in
    /// the same transaction as the wallet row. A taken ID fails with
    /// [`WalletError::WalletExists`](crate::error::WalletError::WalletExists).
    async fn create_wallet(&self, wallet_id: WalletId, opening_balance: i64) -> Result<Wallet>;

    /// Cheap liveness probe
    async fn health_check(&self) -> Result<()>;
}

/// Exclusive unit of work over a single wallet
#[async_trait]
pub trait UnitOfWork: Send {
    /// Lock the wallet row and read it. `Ok(None)` if the wallet does not exist.
    async fn lock_and_read_balance(&mut self, wallet_id: WalletId) -> Result<Option<Wallet>>;

    /// Append a ledger entry for the locked wallet
    async fn insert_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<()>;

    /// Overwrite the locked wallet's balance
    async fn write_balance(
        &mut self,
        wallet_id: WalletId,
        new_balance: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Make every write of this unit visible at once
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard every write of this unit
    async fn abort(self: Box<Self>) -> Result<()>;
}

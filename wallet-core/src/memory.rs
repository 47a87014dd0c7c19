//! In-memory wallet store
//!
//! Wallet rows and the ledger live behind `parking_lot` locks; the per-wallet
//! exclusive lock is a `tokio::sync::Mutex` per wallet, held by the unit of
//! work as an owned guard. Writes are buffered in the unit of work and applied
//! in one critical section on commit.

use crate::{
    config::LockPolicy,
    error::{Result, WalletError},
    store::{UnitOfWork, WalletStore},
    types::{Amount, LedgerEntry, OperationType, Wallet, WalletId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

struct Shared {
    wallets: RwLock<HashMap<WalletId, Wallet>>,
    ledger: RwLock<Vec<LedgerEntry>>,
    locks: DashMap<WalletId, Arc<Mutex<()>>>,
    policy: LockPolicy,
    fail_commits: AtomicBool,
}

/// In-memory [`WalletStore`]; clones share the same data
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Store with the default lock policy
    pub fn new() -> Self {
        Self::with_policy(LockPolicy::default())
    }

    /// Store with an explicit lock policy
    pub fn with_policy(policy: LockPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                wallets: RwLock::new(HashMap::new()),
                ledger: RwLock::new(Vec::new()),
                locks: DashMap::new(),
                policy,
                fail_commits: AtomicBool::new(false),
            }),
        }
    }

    /// Make every subsequent commit fail with `StorageUnavailable`
    pub fn inject_commit_failure(&self, fail: bool) {
        self.shared.fail_commits.store(fail, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(MemoryUnitOfWork {
            shared: Arc::clone(&self.shared),
            scope: None,
            pending_entries: Vec::new(),
            pending_balance: None,
        }))
    }

    async fn get_wallet(&self, wallet_id: WalletId) -> Result<Option<Wallet>> {
        Ok(self.shared.wallets.read().get(&wallet_id).cloned())
    }

    async fn ledger_entries(&self, wallet_id: WalletId) -> Result<Vec<LedgerEntry>> {
        let mut entries: Vec<LedgerEntry> = self
            .shared
            .ledger
            .read()
            .iter()
            .filter(|entry| entry.wallet_id == wallet_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(entries)
    }

    async fn create_wallet(&self, wallet_id: WalletId, opening_balance: i64) -> Result<Wallet> {
        if opening_balance < 0 {
            return Err(WalletError::InvalidInput(format!(
                "opening balance must not be negative, got {}",
                opening_balance
            )));
        }

        let now = Utc::now();
        let wallet = Wallet::new(wallet_id, opening_balance, now);

        let mut ledger = self.shared.ledger.write();
        let mut wallets = self.shared.wallets.write();
        if wallets.contains_key(&wallet_id) {
            return Err(WalletError::WalletExists(wallet_id));
        }

        self.shared
            .locks
            .entry(wallet_id)
            .or_insert_with(|| Arc::new(Mutex::new(())));
        wallets.insert(wallet_id, wallet.clone());
        if let Some(amount) = Amount::new(opening_balance) {
            ledger.push(LedgerEntry::new(wallet_id, OperationType::Credit, amount, now));
        }

        debug!("Created wallet {} with balance {}", wallet_id, opening_balance);
        Ok(wallet)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

struct MemoryUnitOfWork {
    shared: Arc<Shared>,
    scope: Option<(WalletId, OwnedMutexGuard<()>)>,
    pending_entries: Vec<LedgerEntry>,
    pending_balance: Option<(WalletId, i64, DateTime<Utc>)>,
}

impl MemoryUnitOfWork {
    fn ensure_scope(&self, wallet_id: WalletId) -> Result<()> {
        match &self.scope {
            Some((locked, _)) if *locked == wallet_id => Ok(()),
            Some((locked, _)) => Err(WalletError::StorageUnavailable(format!(
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
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_and_read_balance(&mut self, wallet_id: WalletId) -> Result<Option<Wallet>> {
        if self.scope.is_some() {
            self.ensure_scope(wallet_id)?;
            return Ok(self.shared.wallets.read().get(&wallet_id).cloned());
        }

        // Wallets are never deleted, so a missing lock means a missing wallet.
        let lock = match self.shared.locks.get(&wallet_id).map(|l| Arc::clone(l.value())) {
            Some(lock) => lock,
            None => return Ok(None),
        };

        let guard = match self.shared.policy {
            LockPolicy::Wait { timeout } => tokio::time::timeout(timeout, lock.lock_owned())
                .await
                .map_err(|_| {
                    WalletError::StorageUnavailable(format!(
                        "lock wait on wallet {} timed out after {:?}",
                        wallet_id, timeout
                    ))
                })?,
            LockPolicy::NoWait => lock.try_lock_owned().map_err(|_| {
                WalletError::StorageUnavailable(format!(
                    "wallet {} is locked by another unit of work",
                    wallet_id
                ))
            })?,
        };

        let wallet = self.shared.wallets.read().get(&wallet_id).cloned();
        self.scope = Some((wallet_id, guard));
        Ok(wallet)
    }

    async fn insert_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.ensure_scope(entry.wallet_id)?;
        self.pending_entries.push(entry.clone());
        Ok(())
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
        self.pending_balance = Some((wallet_id, new_balance, updated_at));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = self;
        if this.shared.fail_commits.load(Ordering::SeqCst) {
            return Err(WalletError::StorageUnavailable(
                "commit failed: injected failure".to_string(),
            ));
        }

        let entries = std::mem::take(&mut this.pending_entries);
        let balance = this.pending_balance.take();

        let mut ledger = this.shared.ledger.write();
        let mut wallets = this.shared.wallets.write();
        if let Some((wallet_id, new_balance, updated_at)) = balance {
            let wallet = wallets.get_mut(&wallet_id).ok_or_else(|| {
                WalletError::StorageUnavailable(format!("wallet {} vanished before commit", wallet_id))
            })?;
            wallet.balance = new_balance;
            wallet.updated_at = updated_at;
        }
        ledger.extend(entries);
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

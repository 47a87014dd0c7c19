//! Read-only wallet lookups. Nothing here takes a lock.

use crate::{
    error::{Result, WalletError},
    store::WalletStore,
    types::{ledger_sum, LedgerEntry, Wallet, WalletId},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Balance vs. ledger comparison for one wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub wallet_id: WalletId,
    pub balance: i64,
    pub ledger_sum: i64,
    pub entries: usize,
    pub consistent: bool,
}

#[derive(Clone)]
pub struct WalletQueryService {
    store: Arc<dyn WalletStore>,
}

impl WalletQueryService {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self { store }
    }

    /// Current balance snapshot
    pub async fn get_balance(&self, wallet_id: WalletId) -> Result<Wallet> {
        self.store
            .get_wallet(wallet_id)
            .await?
            .ok_or(WalletError::WalletNotFound(wallet_id))
    }

    /// Ordered ledger of a wallet
    pub async fn history(&self, wallet_id: WalletId) -> Result<Vec<LedgerEntry>> {
        // Existence first so an unknown wallet is not reported as an empty history.
        self.get_balance(wallet_id).await?;
        self.store.ledger_entries(wallet_id).await
    }

    /// Recompute the ledger sum and compare it with the stored balance.
    ///
    /// The two reads are separate snapshots; a mutation committing between
    /// them shows up as an inconsistency, so run this on a quiet wallet.
    pub async fn verify(&self, wallet_id: WalletId) -> Result<Reconciliation> {
        let wallet = self.get_balance(wallet_id).await?;
        let entries = self.store.ledger_entries(wallet_id).await?;
        let sum = ledger_sum(&entries).ok_or_else(|| {
            WalletError::StorageUnavailable(format!("ledger sum of wallet {} overflows", wallet_id))
        })?;

        let consistent = sum == wallet.balance;
        if !consistent {
            warn!(
                "Wallet {} balance {} does not match ledger sum {}",
                wallet_id, wallet.balance, sum
            );
        }

        Ok(Reconciliation {
            wallet_id,
            balance: wallet.balance,
            ledger_sum: sum,
            entries: entries.len(),
            consistent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::BalanceEngine, memory::MemoryStore, types::Amount};

    #[tokio::test]
    async fn test_get_balance_not_found() {
        let query = WalletQueryService::new(Arc::new(MemoryStore::new()));
        let id = WalletId::generate();
        assert!(matches!(
            query.get_balance(id).await,
            Err(WalletError::WalletNotFound(missing)) if missing == id
        ));
        assert!(query.history(id).await.is_err());
    }

    #[tokio::test]
    async fn test_verify_after_operations() {
        let store = Arc::new(MemoryStore::new());
        let engine = BalanceEngine::new(store.clone());
        let query = WalletQueryService::new(store.clone());
        let id = WalletId::generate();
        store.create_wallet(id, 5_000).await.unwrap();

        engine.deposit(id, Amount::new(1_000).unwrap()).await.unwrap();
        engine.withdraw(id, Amount::new(1_500).unwrap()).await.unwrap();

        let report = query.verify(id).await.unwrap();
        assert!(report.consistent);
        assert_eq!(report.balance, 4_500);
        assert_eq!(report.entries, 3);
    }
}

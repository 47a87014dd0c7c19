//! Balance-mutation engine
//!
//! The only writer of wallet balances. Each call to [`BalanceEngine::apply`]
//! runs one unit of work:
//!
//! 1. begin
//! 2. lock the wallet row and read the balance
//! 3. compute the candidate balance
//! 4. reject a negative candidate (`InsufficientFunds`)
//! 5. append one ledger entry
//! 6. write the candidate balance
//! 7. commit
//!
//! Any failure aborts the unit of work, so either both the ledger entry and
//! the balance are written or neither is. The engine never retries.

use crate::{
    error::{Result, WalletError},
    store::{UnitOfWork, WalletStore},
    types::{Amount, LedgerEntry, OperationType, Wallet, WalletId},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Applies credits and debits to wallets
#[derive(Clone)]
pub struct BalanceEngine {
    store: Arc<dyn WalletStore>,
}

impl BalanceEngine {
    /// Engine writing through `store`
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self { store }
    }

    /// Apply one operation and return the wallet as committed.
    ///
    /// Dropping the returned future before it resolves aborts the unit of work.
    pub async fn apply(
        &self,
        wallet_id: WalletId,
        operation_type: OperationType,
        amount: Amount,
    ) -> Result<Wallet> {
        let mut uow = self.store.begin().await.map_err(|e| {
            error!("Failed to begin unit of work for wallet {}: {}", wallet_id, e);
            e
        })?;
        debug!(
            "Applying {} {} to wallet {}",
            operation_type, amount, wallet_id
        );

        let current = match uow.lock_and_read_balance(wallet_id).await {
            Ok(Some(wallet)) => wallet,
            Ok(None) => {
                warn!("Wallet {} not found", wallet_id);
                return Err(abort(uow, WalletError::WalletNotFound(wallet_id)).await);
            }
            Err(e) => {
                error!("Failed to lock wallet {}: {}", wallet_id, e);
                return Err(abort(uow, e).await);
            }
        };

        let new_balance = match operation_type.apply_to(current.balance, amount) {
            Some(balance) if balance >= 0 => balance,
            Some(_) => {
                warn!(
                    "Not enough money on wallet {}: balance {}, requested {}",
                    wallet_id, current.balance, amount
                );
                let err = WalletError::InsufficientFunds {
                    wallet_id,
                    balance: current.balance,
                    requested: amount.minor_units(),
                };
                return Err(abort(uow, err).await);
            }
            None => {
                warn!("Balance overflow on wallet {}", wallet_id);
                return Err(abort(uow, WalletError::BalanceOverflow { wallet_id }).await);
            }
        };

        // Clock skew must not move updated_at backwards.
        let now = Utc::now().max(current.updated_at);
        let entry = LedgerEntry::new(wallet_id, operation_type, amount, now);

        if let Err(e) = uow.insert_ledger_entry(&entry).await {
            error!("Failed to insert ledger entry for wallet {}: {}", wallet_id, e);
            return Err(abort(uow, e).await);
        }

        if let Err(e) = uow.write_balance(wallet_id, new_balance, now).await {
            error!("Failed to update balance of wallet {}: {}", wallet_id, e);
            return Err(abort(uow, e).await);
        }

        uow.commit().await.map_err(|e| {
            error!("Failed to commit operation on wallet {}: {}", wallet_id, e);
            e
        })?;

        info!(
            "Applied {} {} to wallet {} (entry {}), balance {} -> {}",
            operation_type, amount, wallet_id, entry.id, current.balance, new_balance
        );

        Ok(Wallet {
            id: wallet_id,
            balance: new_balance,
            created_at: current.created_at,
            updated_at: now,
        })
    }

    /// Credit shorthand
    pub async fn deposit(&self, wallet_id: WalletId, amount: Amount) -> Result<Wallet> {
        self.apply(wallet_id, OperationType::Credit, amount).await
    }

    /// Debit shorthand
    pub async fn withdraw(&self, wallet_id: WalletId, amount: Amount) -> Result<Wallet> {
        self.apply(wallet_id, OperationType::Debit, amount).await
    }
}

/// Abort `uow` and hand back `cause`. A failed abort is logged only; the
/// store rolls back on drop anyway.
async fn abort(uow: Box<dyn UnitOfWork>, cause: WalletError) -> WalletError {
    if let Err(e) = uow.abort().await {
        warn!("Abort after `{}` failed: {}", cause, e);
    }
    cause
}

//! Property-based tests for wallet invariants
//!
//! Random operation sequences against the in-memory store must keep:
//! - Ledger agreement: balance == Σ(signed ledger amounts)
//! - Non-negativity: balance never drops below zero
//! - Atomicity: a rejected operation leaves balance and ledger untouched
//! - Amount parsing: non-positive amounts never construct

use proptest::prelude::*;
use std::sync::Arc;
use wallet_core::{
    types::ledger_sum, Amount, BalanceEngine, MemoryStore, OperationType, WalletError, WalletId,
    WalletStore, MINOR_UNITS_PER_MAJOR,
};

/// Strategy for operation types
fn operation_type_strategy() -> impl Strategy<Value = OperationType> {
    prop_oneof![Just(OperationType::Credit), Just(OperationType::Debit)]
}

/// Strategy for (operation, minor units) steps
fn step_strategy() -> impl Strategy<Value = (OperationType, i64)> {
    (operation_type_strategy(), 1i64..100_000i64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: the stored balance always equals the ledger sum
    #[test]
    fn prop_balance_matches_ledger(
        opening in 0i64..1_000_000i64,
        steps in prop::collection::vec(step_strategy(), 1..40),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = MemoryStore::new();
            let engine = BalanceEngine::new(Arc::new(store.clone()));
            let id = WalletId::generate();
            store.create_wallet(id, opening).await.unwrap();

            let mut model = opening;
            for (op, minor_units) in steps {
                let amount = Amount::new(minor_units).unwrap();
                match engine.apply(id, op, amount).await {
                    Ok(wallet) => {
                        model += op.signed(amount);
                        prop_assert_eq!(wallet.balance, model);
                    }
                    Err(WalletError::InsufficientFunds { balance, requested, .. }) => {
                        prop_assert_eq!(op, OperationType::Debit);
                        prop_assert_eq!(balance, model);
                        prop_assert!(requested > balance);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {}", other),
                }

                let stored = store.get_wallet(id).await.unwrap().unwrap();
                prop_assert!(stored.balance >= 0);
                prop_assert_eq!(stored.balance, model);
            }

            let entries = store.ledger_entries(id).await.unwrap();
            prop_assert_eq!(ledger_sum(&entries), Some(model));
            Ok(())
        })?;
    }

    /// Property: a rejected debit does not append to the ledger
    #[test]
    fn prop_rejected_debit_is_atomic(balance in 0i64..1_000_000i64, excess in 1i64..1_000_000i64) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = MemoryStore::new();
            let engine = BalanceEngine::new(Arc::new(store.clone()));
            let id = WalletId::generate();
            store.create_wallet(id, balance).await.unwrap();
            let entries_before = store.ledger_entries(id).await.unwrap();

            let result = engine.withdraw(id, Amount::new(balance + excess).unwrap()).await;
            let rejected = matches!(result, Err(WalletError::InsufficientFunds { .. }));
            prop_assert!(rejected);

            prop_assert_eq!(store.get_wallet(id).await.unwrap().unwrap().balance, balance);
            prop_assert_eq!(store.ledger_entries(id).await.unwrap(), entries_before);
            Ok(())
        })?;
    }

    /// Property: only positive values construct an Amount
    #[test]
    fn prop_amount_is_positive(value in any::<i64>()) {
        prop_assert_eq!(Amount::new(value).is_some(), value > 0);
    }

    /// Property: major units scale by the fixed factor or fail on overflow
    #[test]
    fn prop_major_units_scale(value in 1i64..i64::MAX) {
        match Amount::from_major_units(value) {
            Some(amount) => prop_assert_eq!(amount.minor_units(), value * MINOR_UNITS_PER_MAJOR),
            None => prop_assert!(value.checked_mul(MINOR_UNITS_PER_MAJOR).is_none()),
        }
    }
}

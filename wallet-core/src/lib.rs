//! Wallet Core
//!
//! Balance-mutation engine over an append-only ledger and a mutable balance
//! snapshot per wallet.
//!
//! # Architecture
//!
//! - **Single writer**: only [`BalanceEngine`] writes balances
//! - **Unit of work**: ledger append and balance write commit together or not at all
//! - **Per-wallet locking**: operations on different wallets never contend
//! - **Pluggable stores**: PostgreSQL ([`PgWalletStore`]) and in-memory ([`MemoryStore`])
//!
//! # Invariants
//!
//! - `balance == Σ(signed ledger amounts)` for every wallet
//! - `balance >= 0` in every committed state
//! - Ledger entries are never updated or deleted
//! - Per wallet, committed mutations are linearizable

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;
pub mod types;

// Re-exports
pub use config::{EngineConfig, LockPolicy};
pub use engine::BalanceEngine;
pub use error::{Result, WalletError};
pub use memory::MemoryStore;
pub use postgres::PgWalletStore;
pub use query::{Reconciliation, WalletQueryService};
pub use store::{UnitOfWork, WalletStore};
pub use types::{Amount, LedgerEntry, OperationType, Wallet, WalletId, MINOR_UNITS_PER_MAJOR};

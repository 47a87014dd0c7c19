//! Error types for wallet operations

use crate::types::WalletId;
use thiserror::Error;

/// Result type for wallet operations
pub type Result<T> = std::result::Result<T, WalletError>;

/// SQLSTATE codes that mean "someone else holds the row"
const LOCK_CONFLICT_CODES: &[&str] = &["55P03", "40001", "40P01"];

/// Wallet errors
#[derive(Error, Debug)]
pub enum WalletError {
    /// No wallet row for the given ID
    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    /// Debit would drive the balance negative
    #[error("Insufficient funds in wallet {wallet_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        wallet_id: WalletId,
        balance: i64,
        requested: i64,
    },

    /// Create of a wallet ID that is already taken
    #[error("Wallet already exists: {0}")]
    WalletExists(WalletId),

    /// Credit would exceed the representable balance
    #[error("Balance overflow in wallet {wallet_id}")]
    BalanceOverflow { wallet_id: WalletId },

    /// Store could not execute the unit of work
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Caller contract violation
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl WalletError {
    /// Whether the caller may retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::StorageUnavailable(_))
    }

    /// Business-rule rejection (as opposed to an infrastructure fault)
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            WalletError::WalletNotFound(_)
                | WalletError::WalletExists(_)
                | WalletError::InsufficientFunds { .. }
                | WalletError::BalanceOverflow { .. }
        )
    }
}

impl From<sqlx::Error> for WalletError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(code) = db_err.code() {
                if LOCK_CONFLICT_CODES.iter().any(|c| code == *c) {
                    return WalletError::StorageUnavailable(format!(
                        "lock conflict ({}): {}",
                        code,
                        db_err.message()
                    ));
                }
            }
        }
        WalletError::StorageUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let id = WalletId::generate();
        assert!(WalletError::StorageUnavailable("timeout".into()).is_retryable());
        assert!(!WalletError::WalletNotFound(id).is_retryable());
        assert!(!WalletError::InsufficientFunds {
            wallet_id: id,
            balance: 1,
            requested: 2
        }
        .is_retryable());
        assert!(WalletError::WalletNotFound(id).is_business_rule());
        assert!(WalletError::WalletExists(id).is_business_rule());
        assert!(!WalletError::WalletExists(id).is_retryable());
        assert!(!WalletError::InvalidInput("x".into()).is_business_rule());
    }

    #[test]
    fn test_sqlx_errors_become_storage_unavailable() {
        let err: WalletError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, WalletError::StorageUnavailable(_)));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use wallet_core::{LedgerEntry, OperationType, Wallet, WalletId};

/// Body of `POST /api/v1/wallet`; `amount` is in major units
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct OperationRequest {
    pub wallet_id: WalletId,
    pub operation_type: OperationType,
    #[validate(range(min = 1, message = "amount must be greater than zero"))]
    pub amount: i64,
}

/// Balance in minor units
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WalletResponse {
    pub id: WalletId,
    pub balance: i64,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id,
            balance: wallet.balance,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OperationResponse {
    pub wallet: WalletResponse,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OperationRecord {
    pub id: Uuid,
    pub operation_type: OperationType,
    /// Minor units
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntry> for OperationRecord {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            operation_type: entry.operation_type,
            amount: entry.amount.minor_units(),
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletOperationsResponse {
    pub wallet_id: WalletId,
    pub operations: Vec<OperationRecord>,
}

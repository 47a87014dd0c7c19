use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;
use wallet_core::{WalletError, WalletId};

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    #[error("Wallet already exists: {0}")]
    WalletExists(WalletId),

    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },

    #[error("Balance overflow in wallet {0}")]
    BalanceOverflow(WalletId),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::WalletNotFound(id) => ApiError::WalletNotFound(id),
            WalletError::WalletExists(id) => ApiError::WalletExists(id),
            WalletError::InsufficientFunds {
                balance, requested, ..
            } => ApiError::InsufficientFunds { balance, requested },
            WalletError::BalanceOverflow { wallet_id } => ApiError::BalanceOverflow(wallet_id),
            WalletError::StorageUnavailable(msg) => ApiError::StorageUnavailable(msg),
            WalletError::InvalidInput(msg) => ApiError::Validation(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": error_message,
                "type": self.error_type(),
                "retryable": self.is_retryable()
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::WalletNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::WalletExists(_) => StatusCode::CONFLICT,
            ApiError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BalanceOverflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::StorageUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::WalletNotFound(_) => "wallet_not_found",
            ApiError::WalletExists(_) => "wallet_exists",
            ApiError::InsufficientFunds { .. } => "insufficient_funds",
            ApiError::BalanceOverflow(_) => "balance_overflow",
            ApiError::StorageUnavailable(_) => "storage_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::StorageUnavailable(_))
    }
}

use crate::errors::{ApiError, Result};
use crate::metrics;
use crate::models::{
    OperationRecord, OperationRequest, OperationResponse, WalletOperationsResponse, WalletResponse,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use validator::Validate;
use wallet_core::{
    Amount, BalanceEngine, WalletError, WalletId, WalletQueryService, WalletStore,
};

/// HTTP-facing wallet operations over one store
pub struct WalletService {
    store: Arc<dyn WalletStore>,
    engine: BalanceEngine,
    query: WalletQueryService,
}

impl WalletService {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self {
            engine: BalanceEngine::new(store.clone()),
            query: WalletQueryService::new(store.clone()),
            store,
        }
    }

    pub async fn get_wallet(&self, wallet_id: WalletId) -> Result<WalletResponse> {
        match self.query.get_balance(wallet_id).await {
            Ok(wallet) => {
                metrics::record_balance_query("found");
                Ok(wallet.into())
            }
            Err(WalletError::WalletNotFound(id)) => {
                metrics::record_balance_query("not_found");
                Err(ApiError::WalletNotFound(id))
            }
            Err(e) => {
                metrics::record_balance_query("error");
                Err(e.into())
            }
        }
    }

    pub async fn list_operations(&self, wallet_id: WalletId) -> Result<WalletOperationsResponse> {
        let entries = self.query.history(wallet_id).await?;

        Ok(WalletOperationsResponse {
            wallet_id,
            operations: entries.into_iter().map(OperationRecord::from).collect(),
        })
    }

    /// Validate, convert major to minor units, and hand off to the engine
    pub async fn apply_operation(&self, request: OperationRequest) -> Result<OperationResponse> {
        request.validate()?;

        let amount = Amount::from_major_units(request.amount).ok_or_else(|| {
            ApiError::Validation(format!("amount {} is out of range", request.amount))
        })?;
        let operation = request.operation_type.as_str();

        let started = Instant::now();
        let result = self
            .engine
            .apply(request.wallet_id, request.operation_type, amount)
            .await;
        metrics::WALLET_OPERATION_DURATION
            .with_label_values(&[operation])
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(wallet) => {
                metrics::record_operation(operation, "success");
                info!(
                    "{} of {} on wallet {} accepted",
                    operation, request.amount, request.wallet_id
                );
                Ok(OperationResponse {
                    wallet: wallet.into(),
                })
            }
            Err(e) => {
                metrics::record_operation(operation, outcome_label(&e));
                if e.is_business_rule() {
                    warn!(
                        "{} of {} on wallet {} rejected: {}",
                        operation, request.amount, request.wallet_id, e
                    );
                } else {
                    error!(
                        "{} of {} on wallet {} failed: {}",
                        operation, request.amount, request.wallet_id, e
                    );
                }
                Err(e.into())
            }
        }
    }

    pub async fn health_check(&self) -> Result<()> {
        self.store.health_check().await.map_err(ApiError::from)
    }
}

fn outcome_label(err: &WalletError) -> &'static str {
    match err {
        WalletError::WalletNotFound(_) => "not_found",
        WalletError::WalletExists(_) => "exists",
        WalletError::InsufficientFunds { .. } => "insufficient_funds",
        WalletError::BalanceOverflow { .. } => "overflow",
        WalletError::StorageUnavailable(_) => "storage_unavailable",
        WalletError::InvalidInput(_) => "invalid_input",
    }
}

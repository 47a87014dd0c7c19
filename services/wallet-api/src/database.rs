use crate::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;
use wallet_core::{Result, WalletError, WalletId, WalletStore};

pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    info!(
        "Connecting to database (pool {}..{})",
        config.min_connections, config.max_connections
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    // Test connection
    sqlx::query("SELECT 1").execute(&pool).await?;

    info!("Database connection verified");

    Ok(pool)
}

/// Create the configured wallets that do not exist yet.
/// Returns how many were created.
pub async fn seed_wallets(store: &dyn WalletStore, seeds: &[(WalletId, i64)]) -> Result<usize> {
    let mut created = 0;

    for &(wallet_id, balance) in seeds {
        if store.get_wallet(wallet_id).await?.is_some() {
            info!("Seed wallet {} already exists, skipping", wallet_id);
            continue;
        }

        match store.create_wallet(wallet_id, balance).await {
            Ok(_) => {
                info!("Seeded wallet {} with balance {}", wallet_id, balance);
                created += 1;
            }
            // Another instance seeded it between the lookup and the insert.
            Err(WalletError::WalletExists(_)) => {
                info!("Seed wallet {} already exists, skipping", wallet_id);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(created)
}

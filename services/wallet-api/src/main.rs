use actix_web::{middleware, web, App, HttpServer};
use anyhow::{anyhow, Context};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use wallet_api::{config::Config, database, handlers, services::WalletService};
use wallet_core::{PgWalletStore, WalletStore};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.environment == "production");
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    info!(
        "Starting Wallet API ({}) on {}:{}",
        config.environment, config.server.host, config.server.port
    );

    let engine_config = config.engine_config()?;
    match engine_config.lock_policy.timeout_ms() {
        Some(ms) => info!("Lock policy: wait up to {}ms", ms),
        None => info!("Lock policy: nowait"),
    }

    // Initialize database
    let pool = database::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let store = PgWalletStore::new(pool, &engine_config);
    store.init_schema().await.context("Failed to initialize schema")?;

    let seeds = config.parse_seed_wallets()?;
    let created = database::seed_wallets(&store, &seeds).await?;
    info!("Seeded {} of {} configured wallets", created, seeds.len());

    let pool = store.pool().clone();
    let store: Arc<dyn WalletStore> = Arc::new(store);
    let wallet_service = Arc::new(WalletService::new(store));

    let server = config.server.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .app_data(web::Data::new(wallet_service.clone()))
            .configure(handlers::configure_routes)
    })
    .workers(server.workers)
    .client_request_timeout(server.request_timeout())
    .keep_alive(server.keep_alive())
    .bind((server.host.as_str(), server.port))?
    .run()
    .await?;

    info!("Server stopped, closing database pool");
    pool.close().await;

    Ok(())
}

mod app;
mod config;
mod db;
mod errors;
mod external;
mod jobs;
mod logging;
mod models;
mod routes;
mod services;
mod state;
mod store;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, StoreConfig};
use crate::external::finnhub::FinnhubProvider;
use crate::jobs::price_sync_job::PriceSyncJob;
use crate::services::account_service::AccountService;
use crate::services::broadcaster::Broadcaster;
use crate::services::job_scheduler_service::JobSchedulerService;
use crate::services::portfolio_service::PortfolioService;
use crate::services::quote_client::QuoteClient;
use crate::state::AppState;
use crate::store::{MemoryStore, PgStore, PortfolioStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("invalid configuration")?;

    // Initialize logging FIRST
    logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))?;

    let store: Arc<dyn PortfolioStore> = match &config.store {
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            info!("🗄️  Using Postgres store");
            Arc::new(
                PgStore::connect(database_url, *max_connections)
                    .await
                    .context("failed to connect to Postgres")?,
            )
        }
        StoreConfig::Memory { seed_user } => {
            let store = MemoryStore::new();
            let user_id = seed_user.unwrap_or_else(Uuid::new_v4);
            store.register_user(user_id);
            warn!("🧪 Using in-memory store; data is lost on restart. Seed user: {}", user_id);
            Arc::new(store)
        }
    };

    let provider = FinnhubProvider::new(&config.quote).context("failed to build quote provider")?;
    let quotes = Arc::new(QuoteClient::new(Arc::new(provider), &config.quote));
    info!(
        "📊 Quote provider: {} (budget {}/min, enforced: {}, timeout {:?})",
        config.quote.base_url,
        config.quote.calls_per_minute,
        config.quote.enforce_rate_limit,
        config.quote.timeout
    );

    let broadcaster = Broadcaster::new();
    let portfolio = Arc::new(PortfolioService::new(
        store.clone(),
        quotes.clone(),
        broadcaster.clone(),
    ));
    let accounts = Arc::new(AccountService::new(store.clone()));

    let mut scheduler = if config.sync.enabled {
        let price_sync = Arc::new(PriceSyncJob::new(
            store.clone(),
            quotes.clone(),
            broadcaster.clone(),
        ));
        let mut scheduler = JobSchedulerService::new(price_sync, config.sync.interval).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        info!("⏸️  Price sync disabled");
        None
    };

    let app = app::create_app(AppState {
        portfolio,
        accounts,
        quotes,
        broadcaster,
    });

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("🚀 StockPulse backend running at http://{}/", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.stop().await?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

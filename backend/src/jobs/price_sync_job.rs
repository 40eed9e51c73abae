//! Periodic price synchronisation.
//!
//! Each tick walks every tracked symbol in enumeration order, fetches a fresh quote,
//! persists the new price and publishes it on the symbol's topic. A failure for one symbol
//! is logged and counted; the remaining symbols are still processed and the next tick runs
//! on schedule. There is no retry beyond the next tick.
//!
//! Ticks never overlap: a tick that fires while the previous one is still running is
//! skipped, which bounds the number of in-flight provider calls to one per tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::PriceUpdate;
use crate::services::broadcaster::{stock_topic, Broadcaster};
use crate::services::quote_client::QuoteClient;
use crate::store::PortfolioStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub items_processed: i32,
    pub items_failed: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Completed(JobResult),
    /// The previous tick was still running.
    Skipped,
}

pub struct PriceSyncJob {
    store: Arc<dyn PortfolioStore>,
    quotes: Arc<QuoteClient>,
    broadcaster: Broadcaster,
    running: AtomicBool,
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PriceSyncJob {
    pub fn new(
        store: Arc<dyn PortfolioStore>,
        quotes: Arc<QuoteClient>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            store,
            quotes,
            broadcaster,
            running: AtomicBool::new(false),
        }
    }

    #[allow(dead_code)]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn run_tick(&self) -> Result<TickOutcome, AppError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("⏭️  Price sync still running, skipping this tick");
            return Ok(TickOutcome::Skipped);
        }
        let _running = RunningGuard(&self.running);

        let symbols = self.store.list_symbols().await?;
        let mut processed = 0;
        let mut failed = 0;

        for symbol in &symbols {
            match self.refresh_symbol(symbol).await {
                Ok(update) => {
                    processed += 1;
                    info!("✅ {} -> {}", symbol, update.current_price);
                }
                Err(e) => {
                    failed += 1;
                    warn!("❌ Failed to refresh price for {}: {}", symbol, e);
                }
            }
        }

        Ok(TickOutcome::Completed(JobResult {
            items_processed: processed,
            items_failed: failed,
        }))
    }

    async fn refresh_symbol(&self, symbol: &str) -> Result<PriceUpdate, AppError> {
        let update = self.quotes.fetch_quote(symbol).await?;
        self.store.update_stock_quote(&update).await?;
        self.broadcaster.publish(&stock_topic(&update.symbol), &update);
        Ok(update)
    }
}

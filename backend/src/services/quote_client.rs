//! Rate-aware front door to the external quote provider.
//!
//! Every outbound call goes through [`QuoteClient`]: symbols are validated before a request is
//! built, each call is counted against the per-minute budget, and (when enforcement is turned
//! on) calls wait on a [`RateLimiter`]. A zero price from the provider is never handed back as a
//! quote; it becomes [`QuoteError::Unavailable`].

use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Months, NaiveDate, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::QuoteConfig;
use crate::external::quote_provider::{
    DividendRecord, ProviderQuote, QuoteError, QuoteProvider, SymbolSearchHit,
};
use crate::models::{PriceUpdate, Symbol};
use crate::services::rate_limiter::{RateLimitGuard, RateLimiter};

const MAX_CONCURRENT_CALLS: usize = 4;

#[derive(Debug, Default)]
struct UsageWindow {
    minute: i64,
    calls: u32,
}

/// Passive call counter bucketed by UTC minute.
pub struct CallUsage {
    budget: u32,
    window: Mutex<UsageWindow>,
}

impl CallUsage {
    pub fn new(budget: u32) -> Self {
        Self {
            budget,
            window: Mutex::new(UsageWindow::default()),
        }
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn record(&self) -> u32 {
        self.record_at(Utc::now())
    }

    fn record_at(&self, now: DateTime<Utc>) -> u32 {
        let minute = now.timestamp().div_euclid(60);
        let calls = {
            let mut window = self.window.lock();
            if window.minute != minute {
                window.minute = minute;
                window.calls = 0;
            }
            window.calls += 1;
            window.calls
        };

        if calls > self.budget {
            warn!(
                "Quote provider calls this minute: {}/{} (over budget)",
                calls, self.budget
            );
        } else {
            debug!("Quote provider calls this minute: {}/{}", calls, self.budget);
        }
        calls
    }

    pub fn calls_this_minute(&self) -> u32 {
        self.calls_at(Utc::now())
    }

    fn calls_at(&self, now: DateTime<Utc>) -> u32 {
        let window = self.window.lock();
        if window.minute == now.timestamp().div_euclid(60) {
            window.calls
        } else {
            0
        }
    }
}

pub struct QuoteClient {
    provider: Arc<dyn QuoteProvider>,
    usage: CallUsage,
    limiter: Option<RateLimiter>,
}

impl QuoteClient {
    pub fn new(provider: Arc<dyn QuoteProvider>, config: &QuoteConfig) -> Self {
        let limiter = config
            .enforce_rate_limit
            .then(|| RateLimiter::new(MAX_CONCURRENT_CALLS, config.calls_per_minute));

        Self {
            provider,
            usage: CallUsage::new(config.calls_per_minute),
            limiter,
        }
    }

    pub fn calls_this_minute(&self) -> u32 {
        self.usage.calls_this_minute()
    }

    pub fn call_budget(&self) -> u32 {
        self.usage.budget()
    }

    async fn before_call(&self, subject: &str) -> Result<Option<RateLimitGuard>, QuoteError> {
        let guard = match &self.limiter {
            Some(limiter) => Some(
                limiter
                    .acquire()
                    .await
                    .map_err(|e| QuoteError::transport(subject, e))?,
            ),
            None => None,
        };
        self.usage.record();
        Ok(guard)
    }

    /// Validates `raw` as a ticker and fetches its current quote.
    pub async fn fetch_quote(&self, raw: &str) -> Result<PriceUpdate, QuoteError> {
        let symbol = Symbol::parse(raw).map_err(|e| QuoteError::InvalidSymbol(e.0))?;
        self.fetch_quote_for(&symbol).await
    }

    pub async fn fetch_quote_for(&self, symbol: &Symbol) -> Result<PriceUpdate, QuoteError> {
        let _guard = self.before_call(symbol.as_str()).await?;
        let quote = self.provider.quote(symbol).await?;
        into_price_update(symbol, quote, Utc::now())
    }

    /// Display name from the company profile, `None` when the provider has none.
    pub async fn company_name(&self, symbol: &Symbol) -> Result<Option<String>, QuoteError> {
        let _guard = self.before_call(symbol.as_str()).await?;
        Ok(self.provider.company_profile(symbol).await?.name)
    }

    /// Dividend payouts over the year ending `today`.
    pub async fn dividend_history(
        &self,
        symbol: &Symbol,
        today: NaiveDate,
    ) -> Result<Vec<DividendRecord>, QuoteError> {
        let from = today.checked_sub_months(Months::new(12)).unwrap_or(today);
        let _guard = self.before_call(symbol.as_str()).await?;
        self.provider.dividends(symbol, from, today).await
    }

    pub async fn earnings_dates(&self, symbol: &Symbol) -> Result<Vec<NaiveDate>, QuoteError> {
        let _guard = self.before_call(symbol.as_str()).await?;
        self.provider.earnings_calendar(symbol).await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SymbolSearchHit>, QuoteError> {
        let _guard = self.before_call(query).await?;
        self.provider.search(query).await
    }
}

fn into_price_update(
    symbol: &Symbol,
    quote: ProviderQuote,
    timestamp: DateTime<Utc>,
) -> Result<PriceUpdate, QuoteError> {
    // The provider answers unknown symbols with an all-zero body
    if quote.current <= BigDecimal::zero() {
        return Err(QuoteError::Unavailable(symbol.to_string()));
    }

    Ok(PriceUpdate {
        symbol: symbol.to_string(),
        current_price: quote.current,
        change: quote.change.unwrap_or_else(BigDecimal::zero),
        change_percent: quote.change_percent.unwrap_or_else(BigDecimal::zero),
        timestamp,
    })
}

//! Fixtures shared by unit tests: decimal helpers, row builders, a scriptable quote
//! provider and a fully wired service harness on top of the in-memory store.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::{QuoteConfig, DEFAULT_FINNHUB_BASE_URL};
use crate::external::quote_provider::{
    CompanyProfile, DividendRecord, ProviderQuote, QuoteError, QuoteProvider, SymbolSearchHit,
};
use crate::jobs::price_sync_job::PriceSyncJob;
use crate::models::{Holding, HoldingWithStock, PriceUpdate, Stock, Symbol};
use crate::services::account_service::AccountService;
use crate::services::broadcaster::Broadcaster;
use crate::services::portfolio_service::PortfolioService;
use crate::services::quote_client::QuoteClient;
use crate::services::valuation::MergedPosition;
use crate::store::{MemoryStore, PortfolioStore};

pub fn dec(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

pub fn quote_config() -> QuoteConfig {
    QuoteConfig {
        api_key: "test".to_string(),
        base_url: DEFAULT_FINNHUB_BASE_URL.to_string(),
        timeout: Duration::from_secs(5),
        calls_per_minute: 60,
        enforce_rate_limit: false,
    }
}

pub fn price_update(symbol: &str, price: &str) -> PriceUpdate {
    PriceUpdate {
        symbol: symbol.to_string(),
        current_price: dec(price),
        change: dec("0"),
        change_percent: dec("0"),
        timestamp: Utc::now(),
    }
}

pub fn stock(symbol: &str, price: &str) -> Stock {
    Stock {
        id: Uuid::new_v4(),
        symbol: symbol.to_string(),
        company_name: format!("{} Inc", symbol),
        current_price: Some(dec(price)),
        price_change: None,
        price_change_percent: None,
        dividend_yield: None,
        annual_dividend: None,
        next_dividend_date: None,
        next_earnings_date: None,
        last_updated: Utc::now(),
    }
}

pub fn holding_with_stock(
    user_id: Uuid,
    symbol: &str,
    quantity: i32,
    total_invested: &str,
    current_value: Option<&str>,
) -> HoldingWithStock {
    let stock = stock(symbol, "1");
    let invested = dec(total_invested);
    let mut holding = Holding::open(
        user_id,
        stock.id,
        MergedPosition {
            quantity,
            average_buy_price: invested.clone() / BigDecimal::from(i64::from(quantity.max(1))),
            total_invested: invested,
        },
    );
    holding.current_value = current_value.map(dec);
    HoldingWithStock { holding, stock }
}

#[derive(Clone)]
enum ScriptedQuote {
    Price(ProviderQuote),
    Fail,
}

#[derive(Default)]
struct Script {
    quotes: HashMap<String, ScriptedQuote>,
    profiles: HashMap<String, String>,
    dividends: HashMap<String, Vec<DividendRecord>>,
    earnings: HashMap<String, Vec<NaiveDate>>,
    search_hits: Vec<SymbolSearchHit>,
    quote_delay: Option<Duration>,
    quote_log: Vec<String>,
}

/// In-process quote provider. Unscripted symbols answer with a zero price, like the real
/// provider does for unknown tickers.
#[derive(Default)]
pub struct FakeProvider {
    script: Mutex<Script>,
    ancillary_down: AtomicBool,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_quote(&self, symbol: &str, price: &str) {
        self.set_quote_with_change(symbol, price, "0", "0");
    }

    pub fn set_quote_with_change(&self, symbol: &str, price: &str, change: &str, percent: &str) {
        self.script.lock().quotes.insert(
            symbol.to_string(),
            ScriptedQuote::Price(ProviderQuote {
                current: dec(price),
                change: Some(dec(change)),
                change_percent: Some(dec(percent)),
            }),
        );
    }

    pub fn fail_quote(&self, symbol: &str) {
        self.script
            .lock()
            .quotes
            .insert(symbol.to_string(), ScriptedQuote::Fail);
    }

    pub fn set_quote_delay(&self, delay: Duration) {
        self.script.lock().quote_delay = Some(delay);
    }

    pub fn set_profile(&self, symbol: &str, name: &str) {
        self.script
            .lock()
            .profiles
            .insert(symbol.to_string(), name.to_string());
    }

    pub fn set_dividends(&self, symbol: &str, records: Vec<DividendRecord>) {
        self.script.lock().dividends.insert(symbol.to_string(), records);
    }

    pub fn set_earnings(&self, symbol: &str, dates: Vec<NaiveDate>) {
        self.script.lock().earnings.insert(symbol.to_string(), dates);
    }

    pub fn set_search_hits(&self, hits: Vec<SymbolSearchHit>) {
        self.script.lock().search_hits = hits;
    }

    /// Profile, dividend, earnings and search lookups all fail from now on.
    pub fn fail_ancillary(&self) {
        self.ancillary_down.store(true, Ordering::SeqCst);
    }

    pub fn quote_calls(&self, symbol: &str) -> usize {
        self.script
            .lock()
            .quote_log
            .iter()
            .filter(|logged| logged.as_str() == symbol)
            .count()
    }

    pub fn total_quote_calls(&self) -> usize {
        self.script.lock().quote_log.len()
    }

    pub fn quote_log(&self) -> Vec<String> {
        self.script.lock().quote_log.clone()
    }

    fn ancillary(&self, subject: &str) -> Result<(), QuoteError> {
        if self.ancillary_down.load(Ordering::SeqCst) {
            Err(QuoteError::transport(subject, "scripted outage"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl QuoteProvider for FakeProvider {
    async fn quote(&self, symbol: &Symbol) -> Result<ProviderQuote, QuoteError> {
        let (scripted, delay) = {
            let mut script = self.script.lock();
            script.quote_log.push(symbol.to_string());
            (script.quotes.get(symbol.as_str()).cloned(), script.quote_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match scripted {
            Some(ScriptedQuote::Price(quote)) => Ok(quote),
            Some(ScriptedQuote::Fail) => Err(QuoteError::transport(symbol.as_str(), "connection reset")),
            None => Ok(ProviderQuote {
                current: dec("0"),
                change: None,
                change_percent: None,
            }),
        }
    }

    async fn company_profile(&self, symbol: &Symbol) -> Result<CompanyProfile, QuoteError> {
        self.ancillary(symbol.as_str())?;
        Ok(CompanyProfile {
            name: self.script.lock().profiles.get(symbol.as_str()).cloned(),
        })
    }

    async fn dividends(
        &self,
        symbol: &Symbol,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<DividendRecord>, QuoteError> {
        self.ancillary(symbol.as_str())?;
        Ok(self
            .script
            .lock()
            .dividends
            .get(symbol.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn earnings_calendar(&self, symbol: &Symbol) -> Result<Vec<NaiveDate>, QuoteError> {
        self.ancillary(symbol.as_str())?;
        Ok(self
            .script
            .lock()
            .earnings
            .get(symbol.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn search(&self, query: &str) -> Result<Vec<SymbolSearchHit>, QuoteError> {
        self.ancillary(query)?;
        Ok(self.script.lock().search_hits.clone())
    }
}

/// Every service wired over one `MemoryStore` and one `FakeProvider`.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub provider: Arc<FakeProvider>,
    pub quotes: Arc<QuoteClient>,
    pub broadcaster: Broadcaster,
    pub portfolio: Arc<PortfolioService>,
    pub accounts: Arc<AccountService>,
    pub price_sync: Arc<PriceSyncJob>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(FakeProvider::new());
        let quotes = Arc::new(QuoteClient::new(provider.clone(), &quote_config()));
        let broadcaster = Broadcaster::new();
        let dyn_store: Arc<dyn PortfolioStore> = store.clone();

        Self {
            portfolio: Arc::new(PortfolioService::new(
                dyn_store.clone(),
                quotes.clone(),
                broadcaster.clone(),
            )),
            accounts: Arc::new(AccountService::new(dyn_store.clone())),
            price_sync: Arc::new(PriceSyncJob::new(
                dyn_store,
                quotes.clone(),
                broadcaster.clone(),
            )),
            store,
            provider,
            quotes,
            broadcaster,
        }
    }

    pub fn user(&self) -> Uuid {
        let user_id = Uuid::new_v4();
        self.store.register_user(user_id);
        user_id
    }

    /// Starts tracking `symbol` at `price` without going through the provider.
    pub async fn track(&self, symbol: &str, price: &str) -> Stock {
        self.store.insert_stock(stock(symbol, price)).await.unwrap()
    }
}

//! Holding lifecycle and on-demand portfolio valuation.
//!
//! Stock rows are created on first buy and garbage-collected with their last holding. All
//! writes that touch a stock or one of its holdings run under that symbol's lock, so
//! concurrent buys never lose an update and a stock cannot be collected between being
//! looked up and being referenced by a new holding.

use std::sync::Arc;
use std::time::Instant;

use bigdecimal::{BigDecimal, Zero};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    AddBuyRequest, DividendSummary, Holding, HoldingWithStock, NewStock, PortfolioResponse,
    PriceUpdate, Stock, Symbol, SymbolMatch,
};
use crate::services::broadcaster::{stock_topic, Broadcaster};
use crate::services::keyed_lock::KeyedLocks;
use crate::services::quote_client::QuoteClient;
use crate::services::valuation::{
    aggregate_portfolio, merge_buy, next_earnings_date, summarize_dividends, value_holding,
};
use crate::store::PortfolioStore;

const SEARCHABLE_TYPES: [&str; 3] = ["Common Stock", "ETP", "ETF"];
const MAX_SEARCH_RESULTS: usize = 20;

struct CachedAnalysis {
    finished_at: Instant,
    response: PortfolioResponse,
}

type AnalysisSlot = Arc<Mutex<Option<CachedAnalysis>>>;

pub struct PortfolioService {
    store: Arc<dyn PortfolioStore>,
    quotes: Arc<QuoteClient>,
    broadcaster: Broadcaster,
    symbol_locks: KeyedLocks<String>,
    analyses: DashMap<Uuid, AnalysisSlot>,
}

impl PortfolioService {
    pub fn new(
        store: Arc<dyn PortfolioStore>,
        quotes: Arc<QuoteClient>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            store,
            quotes,
            broadcaster,
            symbol_locks: KeyedLocks::new(),
            analyses: DashMap::new(),
        }
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.store.user_exists(user_id).await? {
            Ok(())
        } else {
            Err(AppError::UserNotFound(user_id))
        }
    }

    /// Records a buy, merging into the user's existing holding for the symbol if there is one.
    pub async fn add_buy(&self, request: AddBuyRequest) -> Result<Holding, AppError> {
        if request.quantity <= 0 {
            return Err(AppError::Validation(format!(
                "quantity must be positive, got {}",
                request.quantity
            )));
        }
        if request.buy_price < BigDecimal::zero() {
            return Err(AppError::Validation(format!(
                "buy price must not be negative, got {}",
                request.buy_price
            )));
        }
        let symbol = Symbol::parse(&request.symbol)?;
        self.ensure_user(request.user_id).await?;

        let _lock = self.symbol_locks.lock(symbol.to_string()).await;

        let stock = match self.store.find_stock(symbol.as_str()).await? {
            Some(stock) => stock,
            None => self.create_stock(&symbol).await?,
        };

        let mut holding = match self
            .store
            .find_user_holding(request.user_id, stock.id)
            .await?
        {
            Some(mut existing) => {
                existing.quantity.checked_add(request.quantity).ok_or_else(|| {
                    AppError::Validation(format!("quantity overflow for {}", symbol))
                })?;
                let merged = merge_buy(
                    existing.quantity,
                    &existing.total_invested,
                    request.quantity,
                    &request.buy_price,
                );
                existing.apply_position(merged);
                existing
            }
            None => {
                let opened = merge_buy(0, &BigDecimal::zero(), request.quantity, &request.buy_price);
                Holding::open(request.user_id, stock.id, opened)
            }
        };

        if let Some(price) = &stock.current_price {
            holding.apply_valuation(value_holding(
                holding.quantity,
                &holding.total_invested,
                price,
            ));
        }
        self.store.save_holding(&holding).await?;

        info!(
            "Recorded buy of {} {} @ {} for user {} (holding {}, qty {})",
            request.quantity, symbol, request.buy_price, request.user_id, holding.id, holding.quantity
        );
        Ok(holding)
    }

    /// Bootstraps a stock row. Only the quote is mandatory; enrichment failures degrade.
    async fn create_stock(&self, symbol: &Symbol) -> Result<Stock, AppError> {
        let quote = self.quotes.fetch_quote_for(symbol).await.map_err(|e| {
            AppError::StockCreationFailed {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            }
        })?;
        let today = quote.timestamp.date_naive();

        let company_name = match self.quotes.company_name(symbol).await {
            Ok(Some(name)) => name,
            Ok(None) => symbol.to_string(),
            Err(e) => {
                warn!("Profile lookup failed for {}, using symbol as name: {}", symbol, e);
                symbol.to_string()
            }
        };

        let dividends = match self.quotes.dividend_history(symbol, today).await {
            Ok(records) => {
                let payouts: Vec<_> = records.into_iter().map(|r| (r.date, r.amount)).collect();
                summarize_dividends(&payouts, &quote.current_price, today)
            }
            Err(e) => {
                warn!("Dividend lookup failed for {}: {}", symbol, e);
                DividendSummary::default()
            }
        };

        let next_earnings = match self.quotes.earnings_dates(symbol).await {
            Ok(dates) => next_earnings_date(&dates, today),
            Err(e) => {
                warn!("Earnings lookup failed for {}: {}", symbol, e);
                None
            }
        };

        let stock = Stock::from_new(
            Uuid::new_v4(),
            NewStock {
                symbol: symbol.to_string(),
                company_name,
                quote,
                dividends,
                next_earnings_date: next_earnings,
            },
        );
        let stored = self.store.insert_stock(stock).await?;
        info!("📈 Tracking new stock {} ({})", stored.symbol, stored.company_name);
        Ok(stored)
    }

    /// Holdings valued at their stock's latest stored price.
    pub async fn list_holdings(&self, user_id: Uuid) -> Result<Vec<HoldingWithStock>, AppError> {
        self.ensure_user(user_id).await?;
        let mut lines = self.store.list_user_holdings(user_id).await?;
        for line in &mut lines {
            if let Some(price) = &line.stock.current_price {
                line.holding.apply_valuation(value_holding(
                    line.holding.quantity,
                    &line.holding.total_invested,
                    price,
                ));
            }
        }
        Ok(lines)
    }

    /// Refreshes every holding's quote, revalues and persists it, and aggregates the result.
    ///
    /// A caller that had to wait behind an analysis of the same user which finished after it
    /// arrived gets that analysis back instead of starting another round of quote calls.
    pub async fn get_portfolio_analysis(&self, user_id: Uuid) -> Result<PortfolioResponse, AppError> {
        self.ensure_user(user_id).await?;

        let requested_at = Instant::now();
        let slot = self.analyses.entry(user_id).or_default().clone();

        let outcome = {
            let mut cached = slot.lock().await;
            match cached.as_ref() {
                Some(previous) if previous.finished_at >= requested_at => {
                    debug!("Reusing in-flight portfolio analysis for user {}", user_id);
                    Ok(previous.response.clone())
                }
                _ => {
                    let analysis = self.analyze(user_id).await;
                    if let Ok(response) = &analysis {
                        *cached = Some(CachedAnalysis {
                            finished_at: Instant::now(),
                            response: response.clone(),
                        });
                    }
                    analysis
                }
            }
        };

        // Only the map and this call still hold the slot once no one is waiting on it
        self.analyses
            .remove_if(&user_id, |_, held| Arc::strong_count(held) <= 2);
        outcome
    }

    async fn analyze(&self, user_id: Uuid) -> Result<PortfolioResponse, AppError> {
        let lines = self.store.list_user_holdings(user_id).await?;
        let mut valued = Vec::with_capacity(lines.len());

        for HoldingWithStock { holding, mut stock } in lines {
            let fresh = self.refresh_quote(&stock.symbol).await;

            let _lock = self.symbol_locks.lock(stock.symbol.clone()).await;
            // The holding may have been merged into or removed while the quote was in flight
            let Some(mut holding) = self.store.find_holding(holding.id).await? else {
                continue;
            };
            if let Some(update) = &fresh {
                stock.apply_quote(update);
            }
            if let Some(price) = &stock.current_price {
                holding.apply_valuation(value_holding(
                    holding.quantity,
                    &holding.total_invested,
                    price,
                ));
                self.store.save_holding(&holding).await?;
            }
            valued.push(HoldingWithStock { holding, stock });
        }

        let totals = aggregate_portfolio(&valued);
        Ok(PortfolioResponse {
            holdings: valued,
            total_invested: totals.total_invested,
            total_current_value: totals.total_current_value,
            total_profit_loss: totals.total_profit_loss,
            total_profit_loss_percentage: totals.total_profit_loss_percent,
            average_dividend_yield: totals.average_dividend_yield,
        })
    }

    /// Quote refresh used during analysis. Failures fall back to the stored price.
    async fn refresh_quote(&self, symbol: &str) -> Option<PriceUpdate> {
        match self.persist_and_publish(symbol).await {
            Ok(update) => Some(update),
            Err(e) => {
                warn!("Valuing {} at its stored price: {}", symbol, e);
                None
            }
        }
    }

    async fn persist_and_publish(&self, symbol: &str) -> Result<PriceUpdate, AppError> {
        let update = self.quotes.fetch_quote(symbol).await?;
        self.store.update_stock_quote(&update).await?;
        self.broadcaster.publish(&stock_topic(&update.symbol), &update);
        Ok(update)
    }

    /// On-demand single quote: persisted if the symbol is tracked, always published.
    pub async fn fetch_and_broadcast(&self, raw_symbol: &str) -> Result<PriceUpdate, AppError> {
        self.persist_and_publish(raw_symbol).await
    }

    /// Deletes a holding, and its stock too when no other holding references it.
    pub async fn remove_stock(&self, holding_id: Uuid) -> Result<(), AppError> {
        let holding = self
            .store
            .find_holding(holding_id)
            .await?
            .ok_or(AppError::HoldingNotFound(holding_id))?;

        let stock = self.store.find_stock_by_id(holding.stock_id).await?;
        let _lock = match &stock {
            Some(stock) => Some(self.symbol_locks.lock(stock.symbol.clone()).await),
            None => None,
        };

        if !self.store.delete_holding(holding_id).await? {
            return Err(AppError::HoldingNotFound(holding_id));
        }
        info!("🗑️ Removed holding {}", holding_id);

        if let Some(stock) = stock {
            if self.store.count_stock_holdings(stock.id).await? == 0 {
                self.store.delete_stock(stock.id).await?;
                info!("🗑️ Stopped tracking {} (no holdings left)", stock.symbol);
            }
        }
        Ok(())
    }

    pub async fn get_stock(&self, raw_symbol: &str) -> Result<Stock, AppError> {
        let symbol = Symbol::parse(raw_symbol)?;
        self.store
            .find_stock(symbol.as_str())
            .await?
            .ok_or_else(|| AppError::StockNotFound(symbol.to_string()))
    }

    /// Provider symbol search narrowed to equity-like instruments. Never fails.
    pub async fn search_symbols(&self, query: &str) -> Vec<SymbolMatch> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        match self.quotes.search(query).await {
            Ok(hits) => hits
                .into_iter()
                .filter(|hit| SEARCHABLE_TYPES.contains(&hit.kind.as_str()))
                .take(MAX_SEARCH_RESULTS)
                .map(|hit| SymbolMatch {
                    symbol: hit.symbol,
                    name: hit.description,
                    kind: hit.kind,
                })
                .collect(),
            Err(e) => {
                warn!("Symbol search for {:?} failed: {}", query, e);
                Vec::new()
            }
        }
    }
}

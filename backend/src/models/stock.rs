use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::PriceUpdate;

// A tracked instrument, shared by every holding that references it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Stock {
    pub id: Uuid,
    pub symbol: String,
    pub company_name: String,
    pub current_price: Option<BigDecimal>,
    pub price_change: Option<BigDecimal>,
    pub price_change_percent: Option<BigDecimal>,
    pub dividend_yield: Option<BigDecimal>,
    pub annual_dividend: Option<BigDecimal>,
    pub next_dividend_date: Option<NaiveDate>,
    pub next_earnings_date: Option<NaiveDate>,
    pub last_updated: DateTime<Utc>,
}

/// Everything known about an instrument at the moment it is first referenced.
#[derive(Debug, Clone)]
pub struct NewStock {
    pub symbol: String,
    pub company_name: String,
    pub quote: PriceUpdate,
    pub dividends: DividendSummary,
    pub next_earnings_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DividendSummary {
    pub annual_dividend: Option<BigDecimal>,
    pub dividend_yield: Option<BigDecimal>,
    pub next_dividend_date: Option<NaiveDate>,
}

impl Stock {
    pub fn from_new(id: Uuid, new: NewStock) -> Self {
        Self {
            id,
            symbol: new.symbol,
            company_name: new.company_name,
            current_price: Some(new.quote.current_price),
            price_change: Some(new.quote.change),
            price_change_percent: Some(new.quote.change_percent),
            dividend_yield: new.dividends.dividend_yield,
            annual_dividend: new.dividends.annual_dividend,
            next_dividend_date: new.dividends.next_dividend_date,
            next_earnings_date: new.next_earnings_date,
            last_updated: new.quote.timestamp,
        }
    }

    pub fn apply_quote(&mut self, update: &PriceUpdate) {
        self.current_price = Some(update.current_price.clone());
        self.price_change = Some(update.change.clone());
        self.price_change_percent = Some(update.change_percent.clone());
        self.last_updated = update.timestamp;
    }
}

/// A provider search hit, already filtered to equity-like instrument types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolMatch {
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

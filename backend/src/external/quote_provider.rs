use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::Symbol;

/// Raw quote fields as returned by the provider, before any sentinel handling.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderQuote {
    pub current: BigDecimal,
    pub change: Option<BigDecimal>,
    pub change_percent: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompanyProfile {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DividendRecord {
    pub date: NaiveDate,
    pub amount: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSearchHit {
    pub symbol: String,
    pub description: String,
    pub kind: String,
}

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("quote unavailable for {0} (unknown symbol or unsupported exchange)")]
    Unavailable(String),

    #[error("transport error for {symbol}: {message}")]
    Transport { symbol: String, message: String },

    #[error("unparseable provider response for {symbol}: {message}")]
    Parse { symbol: String, message: String },
}

impl QuoteError {
    pub fn transport(symbol: impl Into<String>, message: impl ToString) -> Self {
        QuoteError::Transport {
            symbol: symbol.into(),
            message: message.to_string(),
        }
    }

    pub fn parse(symbol: impl Into<String>, message: impl ToString) -> Self {
        QuoteError::Parse {
            symbol: symbol.into(),
            message: message.to_string(),
        }
    }
}

/// One call per method, no retries. Every failure surfaces immediately.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn quote(&self, symbol: &Symbol) -> Result<ProviderQuote, QuoteError>;

    async fn company_profile(&self, symbol: &Symbol) -> Result<CompanyProfile, QuoteError>;

    async fn dividends(
        &self,
        symbol: &Symbol,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DividendRecord>, QuoteError>;

    async fn earnings_calendar(&self, symbol: &Symbol) -> Result<Vec<NaiveDate>, QuoteError>;

    async fn search(&self, query: &str) -> Result<Vec<SymbolSearchHit>, QuoteError>;
}

use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Number;
use tracing::debug;

use crate::config::QuoteConfig;
use crate::external::quote_provider::{
    CompanyProfile, DividendRecord, ProviderQuote, QuoteError, QuoteProvider, SymbolSearchHit,
};
use crate::models::Symbol;

pub struct FinnhubProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl FinnhubProvider {
    pub fn new(config: &QuoteConfig) -> Result<Self, QuoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| QuoteError::transport("*", e))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        subject: &str,
        params: &[(&str, &str)],
    ) -> Result<T, QuoteError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} ({})", url, subject);

        let resp = self
            .client
            .get(&url)
            .query(params)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    QuoteError::transport(subject, format!("timed out after {:?}", self.timeout))
                } else {
                    QuoteError::transport(subject, e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(QuoteError::transport(subject, format!("HTTP {}", status)));
        }

        resp.json::<T>()
            .await
            .map_err(|e| QuoteError::parse(subject, e))
    }
}

#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    c: Option<Number>,
    d: Option<Number>,
    dp: Option<Number>,
}

#[derive(Debug, Deserialize)]
struct FinnhubProfile {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FinnhubDividend {
    date: String,
    amount: Number,
}

#[derive(Debug, Deserialize)]
struct FinnhubEarningsResponse {
    #[serde(rename = "earningsCalendar", default)]
    earnings_calendar: Vec<FinnhubEarning>,
}

#[derive(Debug, Deserialize)]
struct FinnhubEarning {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FinnhubSearchResponse {
    #[serde(default)]
    result: Vec<FinnhubSearchResult>,
}

#[derive(Debug, Deserialize)]
struct FinnhubSearchResult {
    symbol: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type", default)]
    kind: String,
}

fn decimal(subject: &str, value: &Number) -> Result<BigDecimal, QuoteError> {
    value
        .to_string()
        .parse::<BigDecimal>()
        .map_err(|e| QuoteError::parse(subject, e))
}

fn date(subject: &str, value: &str) -> Result<NaiveDate, QuoteError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| QuoteError::parse(subject, e))
}

fn into_provider_quote(symbol: &str, raw: FinnhubQuote) -> Result<ProviderQuote, QuoteError> {
    let current = raw
        .c
        .as_ref()
        .ok_or_else(|| QuoteError::parse(symbol, "missing current price `c`"))?;

    Ok(ProviderQuote {
        current: decimal(symbol, current)?,
        change: raw.d.as_ref().map(|d| decimal(symbol, d)).transpose()?,
        change_percent: raw.dp.as_ref().map(|dp| decimal(symbol, dp)).transpose()?,
    })
}

#[async_trait]
impl QuoteProvider for FinnhubProvider {
    async fn quote(&self, symbol: &Symbol) -> Result<ProviderQuote, QuoteError> {
        let raw: FinnhubQuote = self
            .get_json("/quote", symbol.as_str(), &[("symbol", symbol.as_str())])
            .await?;
        into_provider_quote(symbol.as_str(), raw)
    }

    async fn company_profile(&self, symbol: &Symbol) -> Result<CompanyProfile, QuoteError> {
        let raw: FinnhubProfile = self
            .get_json("/stock/profile2", symbol.as_str(), &[("symbol", symbol.as_str())])
            .await?;
        Ok(CompanyProfile {
            name: raw.name.filter(|name| !name.trim().is_empty()),
        })
    }

    async fn dividends(
        &self,
        symbol: &Symbol,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DividendRecord>, QuoteError> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        let raw: Vec<FinnhubDividend> = self
            .get_json(
                "/stock/dividend",
                symbol.as_str(),
                &[
                    ("symbol", symbol.as_str()),
                    ("from", from.as_str()),
                    ("to", to.as_str()),
                ],
            )
            .await?;

        raw.into_iter()
            .map(|d| {
                Ok(DividendRecord {
                    date: date(symbol.as_str(), &d.date)?,
                    amount: decimal(symbol.as_str(), &d.amount)?,
                })
            })
            .collect()
    }

    async fn earnings_calendar(&self, symbol: &Symbol) -> Result<Vec<NaiveDate>, QuoteError> {
        let raw: FinnhubEarningsResponse = self
            .get_json("/calendar/earnings", symbol.as_str(), &[("symbol", symbol.as_str())])
            .await?;

        raw.earnings_calendar
            .into_iter()
            .filter_map(|e| e.date)
            .map(|d| date(symbol.as_str(), &d))
            .collect()
    }

    async fn search(&self, query: &str) -> Result<Vec<SymbolSearchHit>, QuoteError> {
        let raw: FinnhubSearchResponse = self.get_json("/search", query, &[("q", query)]).await?;

        Ok(raw
            .result
            .into_iter()
            .map(|r| SymbolSearchHit {
                symbol: r.symbol,
                description: r.description,
                kind: r.kind,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dec, quote_config};
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts one connection and answers with `reply`, or never answers when it is `None`.
    async fn serve_once(reply: Option<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            match reply {
                Some(response) => {
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
                None => tokio::time::sleep(Duration::from_secs(30)).await,
            }
        });
        format!("http://{}", addr)
    }

    fn provider_at(base_url: String, timeout: Duration) -> FinnhubProvider {
        let mut config = quote_config();
        config.base_url = base_url;
        config.timeout = timeout;
        FinnhubProvider::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_server_error_status_is_a_transport_error() {
        let base_url = serve_once(Some(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        ))
        .await;
        let provider = provider_at(base_url, Duration::from_secs(5));

        let err = provider
            .quote(&Symbol::parse("AAPL").unwrap())
            .await
            .unwrap_err();
        match err {
            QuoteError::Transport { symbol, message } => {
                assert_eq!(symbol, "AAPL");
                assert!(message.contains("500"), "unexpected message: {}", message);
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_silent_server_trips_the_timeout() {
        let base_url = serve_once(None).await;
        let provider = provider_at(base_url, Duration::from_millis(200));

        let started = Instant::now();
        let err = provider
            .quote(&Symbol::parse("AAPL").unwrap())
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(3));
        match err {
            QuoteError::Transport { message, .. } => {
                assert!(message.contains("timed out"), "unexpected message: {}", message);
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[test]
    fn test_quote_body_keeps_decimal_text() {
        let raw: FinnhubQuote =
            serde_json::from_str(r#"{"c":150.12,"d":-1.3,"dp":-0.8586,"h":151,"l":148.5}"#)
                .unwrap();
        let quote = into_provider_quote("AAPL", raw).unwrap();
        assert_eq!(quote.current.to_string(), "150.12");
        assert_eq!(quote.change, Some(dec("-1.3")));
        assert_eq!(quote.change_percent, Some(dec("-0.8586")));
    }

    #[test]
    fn test_unknown_symbol_body_parses_to_zero_with_null_changes() {
        let raw: FinnhubQuote =
            serde_json::from_str(r#"{"c":0,"d":null,"dp":null,"h":0,"l":0,"o":0,"pc":0,"t":0}"#)
                .unwrap();
        let quote = into_provider_quote("NOPE", raw).unwrap();
        assert_eq!(quote.current, dec("0"));
        assert_eq!(quote.change, None);
    }

    #[test]
    fn test_missing_current_price_is_a_parse_error() {
        let raw: FinnhubQuote = serde_json::from_str(r#"{"d":1}"#).unwrap();
        let err = into_provider_quote("AAPL", raw).unwrap_err();
        assert!(matches!(err, QuoteError::Parse { .. }));
    }

    #[test]
    fn test_earnings_body_tolerates_missing_calendar() {
        let raw: FinnhubEarningsResponse = serde_json::from_str("{}").unwrap();
        assert!(raw.earnings_calendar.is_empty());
    }
}

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single quote observation, handed to the broadcaster and never stored as history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub symbol: String,
    pub current_price: BigDecimal,
    pub change: BigDecimal,
    pub change_percent: BigDecimal,
    pub timestamp: DateTime<Utc>,
}

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::models::HoldingWithStock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioResponse {
    pub holdings: Vec<HoldingWithStock>,
    pub total_invested: BigDecimal,
    pub total_current_value: BigDecimal,
    pub total_profit_loss: BigDecimal,
    pub total_profit_loss_percentage: BigDecimal,
    pub average_dividend_yield: BigDecimal,
}

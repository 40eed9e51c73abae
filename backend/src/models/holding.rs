use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::Stock;
use crate::services::valuation::{HoldingValuation, MergedPosition};

// A user's position in one stock. One row per (user, stock) pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Holding {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stock_id: Uuid,
    pub quantity: i32,
    pub average_buy_price: BigDecimal,
    pub total_invested: BigDecimal,
    pub current_value: Option<BigDecimal>,
    pub profit_loss: Option<BigDecimal>,
    pub profit_loss_percentage: Option<BigDecimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    pub fn open(user_id: Uuid, stock_id: Uuid, position: MergedPosition) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            stock_id,
            quantity: position.quantity,
            average_buy_price: position.average_buy_price,
            total_invested: position.total_invested,
            current_value: None,
            profit_loss: None,
            profit_loss_percentage: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_position(&mut self, position: MergedPosition) {
        self.quantity = position.quantity;
        self.average_buy_price = position.average_buy_price;
        self.total_invested = position.total_invested;
        self.updated_at = Utc::now();
    }

    pub fn apply_valuation(&mut self, valuation: HoldingValuation) {
        self.current_value = Some(valuation.current_value);
        self.profit_loss = Some(valuation.profit_loss);
        self.profit_loss_percentage = Some(valuation.profit_loss_percent);
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingWithStock {
    #[serde(flatten)]
    pub holding: Holding,
    pub stock: Stock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBuyRequest {
    pub user_id: Uuid,
    pub symbol: String,
    pub quantity: i32,
    pub buy_price: BigDecimal,
}

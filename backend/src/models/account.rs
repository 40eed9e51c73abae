use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Per-user rollup. The stored figures are a display cache; they are recomputed on every read.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_deposits: BigDecimal,
    pub current_value: BigDecimal,
    pub total_profit_loss: BigDecimal,
    pub daily_profit_loss: BigDecimal,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            total_deposits: BigDecimal::zero(),
            current_value: BigDecimal::zero(),
            total_profit_loss: BigDecimal::zero(),
            daily_profit_loss: BigDecimal::zero(),
            last_updated: now,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub current_value: BigDecimal,
    pub total_deposits: BigDecimal,
    pub total_profit_loss: BigDecimal,
    pub total_profit_loss_percentage: BigDecimal,
    pub daily_profit_loss: BigDecimal,
    pub daily_profit_loss_percentage: BigDecimal,
}

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Cash contributed by a user. Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Deposit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub description: Option<String>,
    pub deposit_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRequest {
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub description: Option<String>,
}

impl Deposit {
    pub fn new(user_id: Uuid, amount: BigDecimal, description: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount,
            description,
            deposit_date: Utc::now(),
        }
    }
}

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Account;

const ACCOUNT_COLUMNS: &str = "id, user_id, total_deposits, current_value, total_profit_loss, \
     daily_profit_loss, last_updated, created_at";

pub async fn fetch_or_create(pool: &PgPool, user_id: Uuid) -> Result<Account, sqlx::Error> {
    let fresh = Account::new(user_id);
    sqlx::query(&format!(
        "INSERT INTO accounts ({})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (user_id) DO NOTHING",
        ACCOUNT_COLUMNS
    ))
    .bind(fresh.id)
    .bind(fresh.user_id)
    .bind(&fresh.total_deposits)
    .bind(&fresh.current_value)
    .bind(&fresh.total_profit_loss)
    .bind(&fresh.daily_profit_loss)
    .bind(fresh.last_updated)
    .bind(fresh.created_at)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Account>(&format!(
        "SELECT {} FROM accounts WHERE user_id = $1",
        ACCOUNT_COLUMNS
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn update(pool: &PgPool, account: &Account) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE accounts
         SET total_deposits = $2, current_value = $3, total_profit_loss = $4,
             daily_profit_loss = $5, last_updated = $6
         WHERE user_id = $1",
    )
    .bind(account.user_id)
    .bind(&account.total_deposits)
    .bind(&account.current_value)
    .bind(&account.total_profit_loss)
    .bind(&account.daily_profit_loss)
    .bind(account.last_updated)
    .execute(pool)
    .await?;
    Ok(())
}

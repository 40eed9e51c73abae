use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Holding;

const HOLDING_COLUMNS: &str = "id, user_id, stock_id, quantity, average_buy_price, \
     total_invested, current_value, profit_loss, profit_loss_percentage, created_at, updated_at";

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(&format!(
        "SELECT {} FROM holdings WHERE id = $1",
        HOLDING_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_for_user_and_stock(
    pool: &PgPool,
    user_id: Uuid,
    stock_id: Uuid,
) -> Result<Option<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(&format!(
        "SELECT {} FROM holdings WHERE user_id = $1 AND stock_id = $2",
        HOLDING_COLUMNS
    ))
    .bind(user_id)
    .bind(stock_id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_all_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(&format!(
        "SELECT {} FROM holdings WHERE user_id = $1 ORDER BY created_at ASC",
        HOLDING_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn upsert(pool: &PgPool, holding: &Holding) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "INSERT INTO holdings ({})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         ON CONFLICT (id) DO UPDATE SET
            quantity = EXCLUDED.quantity,
            average_buy_price = EXCLUDED.average_buy_price,
            total_invested = EXCLUDED.total_invested,
            current_value = EXCLUDED.current_value,
            profit_loss = EXCLUDED.profit_loss,
            profit_loss_percentage = EXCLUDED.profit_loss_percentage,
            updated_at = EXCLUDED.updated_at",
        HOLDING_COLUMNS
    ))
    .bind(holding.id)
    .bind(holding.user_id)
    .bind(holding.stock_id)
    .bind(holding.quantity)
    .bind(&holding.average_buy_price)
    .bind(&holding.total_invested)
    .bind(&holding.current_value)
    .bind(&holding.profit_loss)
    .bind(&holding.profit_loss_percentage)
    .bind(holding.created_at)
    .bind(holding.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM holdings WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_for_stock(pool: &PgPool, stock_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM holdings WHERE stock_id = $1")
        .bind(stock_id)
        .fetch_one(pool)
        .await
}

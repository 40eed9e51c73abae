use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{PriceUpdate, Stock};

const STOCK_COLUMNS: &str = "id, symbol, company_name, current_price, price_change, \
     price_change_percent, dividend_yield, annual_dividend, next_dividend_date, \
     next_earnings_date, last_updated";

pub async fn list_symbols(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT symbol FROM stocks ORDER BY symbol ASC")
        .fetch_all(pool)
        .await
}

pub async fn fetch_by_symbol(pool: &PgPool, symbol: &str) -> Result<Option<Stock>, sqlx::Error> {
    sqlx::query_as::<_, Stock>(&format!(
        "SELECT {} FROM stocks WHERE symbol = $1",
        STOCK_COLUMNS
    ))
    .bind(symbol)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Stock>, sqlx::Error> {
    sqlx::query_as::<_, Stock>(&format!("SELECT {} FROM stocks WHERE id = $1", STOCK_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Stock>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, Stock>(&format!(
        "SELECT {} FROM stocks WHERE id = ANY($1)",
        STOCK_COLUMNS
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
}

/// Concurrent creators of the same symbol all get the row that won the insert.
pub async fn insert_or_get(pool: &PgPool, stock: &Stock) -> Result<Stock, sqlx::Error> {
    sqlx::query_as::<_, Stock>(&format!(
        "INSERT INTO stocks ({cols})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         ON CONFLICT (symbol) DO UPDATE SET symbol = EXCLUDED.symbol
         RETURNING {cols}",
        cols = STOCK_COLUMNS
    ))
    .bind(stock.id)
    .bind(&stock.symbol)
    .bind(&stock.company_name)
    .bind(&stock.current_price)
    .bind(&stock.price_change)
    .bind(&stock.price_change_percent)
    .bind(&stock.dividend_yield)
    .bind(&stock.annual_dividend)
    .bind(stock.next_dividend_date)
    .bind(stock.next_earnings_date)
    .bind(stock.last_updated)
    .fetch_one(pool)
    .await
}

pub async fn update_quote(pool: &PgPool, update: &PriceUpdate) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE stocks
         SET current_price = $2, price_change = $3, price_change_percent = $4, last_updated = $5
         WHERE symbol = $1",
    )
    .bind(&update.symbol)
    .bind(&update.current_price)
    .bind(&update.change)
    .bind(&update.change_percent)
    .bind(update.timestamp)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM stocks WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

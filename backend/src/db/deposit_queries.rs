use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Deposit;

pub async fn insert(pool: &PgPool, deposit: &Deposit) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO deposits (id, user_id, amount, description, deposit_date)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(deposit.id)
    .bind(deposit.user_id)
    .bind(&deposit.amount)
    .bind(&deposit.description)
    .bind(deposit.deposit_date)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn fetch_all_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Deposit>, sqlx::Error> {
    sqlx::query_as::<_, Deposit>(
        "SELECT id, user_id, amount, description, deposit_date
         FROM deposits
         WHERE user_id = $1
         ORDER BY deposit_date DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn total_for_user(pool: &PgPool, user_id: Uuid) -> Result<BigDecimal, sqlx::Error> {
    sqlx::query_scalar::<_, BigDecimal>(
        "SELECT COALESCE(SUM(amount), 0) FROM deposits WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

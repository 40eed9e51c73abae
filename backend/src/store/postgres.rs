use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::models::{Account, Deposit, Holding, HoldingWithStock, PriceUpdate, Stock};
use crate::store::{PortfolioStore, StoreError};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;
        info!("✓ Database migrations applied");

        Ok(Self { pool })
    }
}

#[async_trait]
impl PortfolioStore for PgStore {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(db::user_queries::exists(&self.pool, user_id).await?)
    }

    async fn list_symbols(&self) -> Result<Vec<String>, StoreError> {
        Ok(db::stock_queries::list_symbols(&self.pool).await?)
    }

    async fn find_stock(&self, symbol: &str) -> Result<Option<Stock>, StoreError> {
        Ok(db::stock_queries::fetch_by_symbol(&self.pool, symbol).await?)
    }

    async fn find_stock_by_id(&self, id: Uuid) -> Result<Option<Stock>, StoreError> {
        Ok(db::stock_queries::fetch_by_id(&self.pool, id).await?)
    }

    async fn insert_stock(&self, stock: Stock) -> Result<Stock, StoreError> {
        Ok(db::stock_queries::insert_or_get(&self.pool, &stock).await?)
    }

    async fn update_stock_quote(&self, update: &PriceUpdate) -> Result<bool, StoreError> {
        Ok(db::stock_queries::update_quote(&self.pool, update).await?)
    }

    async fn delete_stock(&self, id: Uuid) -> Result<(), StoreError> {
        db::stock_queries::delete(&self.pool, id).await?;
        Ok(())
    }

    async fn find_holding(&self, id: Uuid) -> Result<Option<Holding>, StoreError> {
        Ok(db::holding_queries::fetch_one(&self.pool, id).await?)
    }

    async fn find_user_holding(
        &self,
        user_id: Uuid,
        stock_id: Uuid,
    ) -> Result<Option<Holding>, StoreError> {
        Ok(db::holding_queries::fetch_for_user_and_stock(&self.pool, user_id, stock_id).await?)
    }

    async fn list_user_holdings(&self, user_id: Uuid) -> Result<Vec<HoldingWithStock>, StoreError> {
        let holdings = db::holding_queries::fetch_all_for_user(&self.pool, user_id).await?;
        let stock_ids: Vec<Uuid> = holdings.iter().map(|h| h.stock_id).collect();
        let stocks: HashMap<Uuid, Stock> = db::stock_queries::fetch_many(&self.pool, &stock_ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        Ok(holdings
            .into_iter()
            .filter_map(|holding| {
                let stock = stocks.get(&holding.stock_id).cloned()?;
                Some(HoldingWithStock { holding, stock })
            })
            .collect())
    }

    async fn save_holding(&self, holding: &Holding) -> Result<(), StoreError> {
        db::holding_queries::upsert(&self.pool, holding)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    StoreError::Conflict(format!(
                        "user {} already holds stock {}",
                        holding.user_id, holding.stock_id
                    ))
                }
                _ => StoreError::Database(e),
            })
    }

    async fn delete_holding(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(db::holding_queries::delete(&self.pool, id).await? > 0)
    }

    async fn count_stock_holdings(&self, stock_id: Uuid) -> Result<i64, StoreError> {
        Ok(db::holding_queries::count_for_stock(&self.pool, stock_id).await?)
    }

    async fn find_or_create_account(&self, user_id: Uuid) -> Result<Account, StoreError> {
        Ok(db::account_queries::fetch_or_create(&self.pool, user_id).await?)
    }

    async fn save_account(&self, account: &Account) -> Result<(), StoreError> {
        Ok(db::account_queries::update(&self.pool, account).await?)
    }

    async fn insert_deposit(&self, deposit: &Deposit) -> Result<(), StoreError> {
        Ok(db::deposit_queries::insert(&self.pool, deposit).await?)
    }

    async fn list_deposits(&self, user_id: Uuid) -> Result<Vec<Deposit>, StoreError> {
        Ok(db::deposit_queries::fetch_all_for_user(&self.pool, user_id).await?)
    }

    async fn total_deposits(&self, user_id: Uuid) -> Result<BigDecimal, StoreError> {
        Ok(db::deposit_queries::total_for_user(&self.pool, user_id).await?)
    }
}

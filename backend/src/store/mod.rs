//! Persistence seam. The engine only ever talks to `PortfolioStore`.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Account, Deposit, Holding, HoldingWithStock, PriceUpdate, Stock};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("conflicting write: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, StoreError>;

    /// Every tracked symbol, in a stable (alphabetical) order.
    async fn list_symbols(&self) -> Result<Vec<String>, StoreError>;

    async fn find_stock(&self, symbol: &str) -> Result<Option<Stock>, StoreError>;

    async fn find_stock_by_id(&self, id: Uuid) -> Result<Option<Stock>, StoreError>;

    /// Inserts the stock unless its symbol is already tracked, returning the stored row either way.
    async fn insert_stock(&self, stock: Stock) -> Result<Stock, StoreError>;

    /// Overwrites price fields of a tracked stock. Returns `false` when the symbol is not tracked.
    async fn update_stock_quote(&self, update: &PriceUpdate) -> Result<bool, StoreError>;

    async fn delete_stock(&self, id: Uuid) -> Result<(), StoreError>;

    async fn find_holding(&self, id: Uuid) -> Result<Option<Holding>, StoreError>;

    async fn find_user_holding(
        &self,
        user_id: Uuid,
        stock_id: Uuid,
    ) -> Result<Option<Holding>, StoreError>;

    async fn list_user_holdings(&self, user_id: Uuid) -> Result<Vec<HoldingWithStock>, StoreError>;

    /// Inserts or fully replaces the holding with the same id.
    async fn save_holding(&self, holding: &Holding) -> Result<(), StoreError>;

    async fn delete_holding(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn count_stock_holdings(&self, stock_id: Uuid) -> Result<i64, StoreError>;

    async fn find_or_create_account(&self, user_id: Uuid) -> Result<Account, StoreError>;

    async fn save_account(&self, account: &Account) -> Result<(), StoreError>;

    async fn insert_deposit(&self, deposit: &Deposit) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_deposits(&self, user_id: Uuid) -> Result<Vec<Deposit>, StoreError>;

    async fn total_deposits(&self, user_id: Uuid) -> Result<BigDecimal, StoreError>;
}

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::models::{Account, Deposit, Holding, HoldingWithStock, PriceUpdate, Stock};
use crate::store::{PortfolioStore, StoreError};

#[derive(Default)]
struct State {
    users: HashSet<Uuid>,
    // keyed by symbol so enumeration is alphabetical
    stocks: BTreeMap<String, Stock>,
    holdings: HashMap<Uuid, Holding>,
    accounts: HashMap<Uuid, Account>,
    deposits: Vec<Deposit>,
}

impl State {
    fn stock_by_id(&self, id: Uuid) -> Option<&Stock> {
        self.stocks.values().find(|s| s.id == id)
    }
}

/// In-process store with the same row semantics as the Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_user(&self, user_id: Uuid) {
        self.state.write().users.insert(user_id);
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state.read().users.contains(&user_id))
    }

    async fn list_symbols(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.state.read().stocks.keys().cloned().collect())
    }

    async fn find_stock(&self, symbol: &str) -> Result<Option<Stock>, StoreError> {
        Ok(self.state.read().stocks.get(symbol).cloned())
    }

    async fn find_stock_by_id(&self, id: Uuid) -> Result<Option<Stock>, StoreError> {
        Ok(self.state.read().stock_by_id(id).cloned())
    }

    async fn insert_stock(&self, stock: Stock) -> Result<Stock, StoreError> {
        let mut state = self.state.write();
        let stored = state
            .stocks
            .entry(stock.symbol.clone())
            .or_insert(stock);
        Ok(stored.clone())
    }

    async fn update_stock_quote(&self, update: &PriceUpdate) -> Result<bool, StoreError> {
        let mut state = self.state.write();
        match state.stocks.get_mut(&update.symbol) {
            Some(stock) => {
                stock.apply_quote(update);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_stock(&self, id: Uuid) -> Result<(), StoreError> {
        self.state.write().stocks.retain(|_, s| s.id != id);
        Ok(())
    }

    async fn find_holding(&self, id: Uuid) -> Result<Option<Holding>, StoreError> {
        Ok(self.state.read().holdings.get(&id).cloned())
    }

    async fn find_user_holding(
        &self,
        user_id: Uuid,
        stock_id: Uuid,
    ) -> Result<Option<Holding>, StoreError> {
        Ok(self
            .state
            .read()
            .holdings
            .values()
            .find(|h| h.user_id == user_id && h.stock_id == stock_id)
            .cloned())
    }

    async fn list_user_holdings(&self, user_id: Uuid) -> Result<Vec<HoldingWithStock>, StoreError> {
        let state = self.state.read();
        let mut lines: Vec<HoldingWithStock> = state
            .holdings
            .values()
            .filter(|h| h.user_id == user_id)
            .filter_map(|h| {
                state.stock_by_id(h.stock_id).map(|stock| HoldingWithStock {
                    holding: h.clone(),
                    stock: stock.clone(),
                })
            })
            .collect();
        lines.sort_by(|a, b| a.holding.created_at.cmp(&b.holding.created_at));
        Ok(lines)
    }

    async fn save_holding(&self, holding: &Holding) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let duplicate = state.holdings.values().any(|h| {
            h.id != holding.id && h.user_id == holding.user_id && h.stock_id == holding.stock_id
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "user {} already holds stock {}",
                holding.user_id, holding.stock_id
            )));
        }
        state.holdings.insert(holding.id, holding.clone());
        Ok(())
    }

    async fn delete_holding(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state.write().holdings.remove(&id).is_some())
    }

    async fn count_stock_holdings(&self, stock_id: Uuid) -> Result<i64, StoreError> {
        let count = self
            .state
            .read()
            .holdings
            .values()
            .filter(|h| h.stock_id == stock_id)
            .count();
        Ok(count as i64)
    }

    async fn find_or_create_account(&self, user_id: Uuid) -> Result<Account, StoreError> {
        let mut state = self.state.write();
        let account = state
            .accounts
            .entry(user_id)
            .or_insert_with(|| Account::new(user_id));
        Ok(account.clone())
    }

    async fn save_account(&self, account: &Account) -> Result<(), StoreError> {
        self.state
            .write()
            .accounts
            .insert(account.user_id, account.clone());
        Ok(())
    }

    async fn insert_deposit(&self, deposit: &Deposit) -> Result<(), StoreError> {
        self.state.write().deposits.push(deposit.clone());
        Ok(())
    }

    async fn list_deposits(&self, user_id: Uuid) -> Result<Vec<Deposit>, StoreError> {
        let mut deposits: Vec<Deposit> = self
            .state
            .read()
            .deposits
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        deposits.sort_by(|a, b| b.deposit_date.cmp(&a.deposit_date));
        Ok(deposits)
    }

    async fn total_deposits(&self, user_id: Uuid) -> Result<BigDecimal, StoreError> {
        Ok(self
            .state
            .read()
            .deposits
            .iter()
            .filter(|d| d.user_id == user_id)
            .fold(BigDecimal::zero(), |acc, d| acc + &d.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dec, price_update, stock};

    #[tokio::test]
    async fn test_insert_stock_keeps_first_row_for_symbol() {
        let store = MemoryStore::new();
        let first = store.insert_stock(stock("AAPL", "150")).await.unwrap();
        let second = store.insert_stock(stock("AAPL", "999")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.current_price, Some(dec("150")));
    }

    #[tokio::test]
    async fn test_update_quote_on_untracked_symbol_reports_false() {
        let store = MemoryStore::new();
        let updated = store
            .update_stock_quote(&price_update("MSFT", "410.5"))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_symbols_enumerate_alphabetically() {
        let store = MemoryStore::new();
        for symbol in ["MSFT", "AAPL", "GOOG"] {
            store.insert_stock(stock(symbol, "1")).await.unwrap();
        }
        assert_eq!(
            store.list_symbols().await.unwrap(),
            vec!["AAPL", "GOOG", "MSFT"]
        );
    }

    #[tokio::test]
    async fn test_second_holding_for_same_pair_conflicts() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let stock = store.insert_stock(stock("AAPL", "1")).await.unwrap();
        let position = crate::services::valuation::merge_buy(0, &BigDecimal::zero(), 1, &dec("1"));

        store
            .save_holding(&Holding::open(user, stock.id, position.clone()))
            .await
            .unwrap();
        let err = store
            .save_holding(&Holding::open(user, stock.id, position))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}

use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{AccountSummary, Deposit, DepositRequest};
use crate::services::valuation::{summarize_account, value_holding};
use crate::store::PortfolioStore;

pub struct AccountService {
    store: Arc<dyn PortfolioStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn PortfolioStore>) -> Self {
        Self { store }
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.store.user_exists(user_id).await? {
            Ok(())
        } else {
            Err(AppError::UserNotFound(user_id))
        }
    }

    /// Recomputes the account rollup from holdings and deposits.
    ///
    /// The stored account row only caches the figures for display; it is never read back
    /// as an input.
    pub async fn get_account_summary(&self, user_id: Uuid) -> Result<AccountSummary, AppError> {
        self.ensure_user(user_id).await?;
        let mut account = self.store.find_or_create_account(user_id).await?;

        let lines = self.store.list_user_holdings(user_id).await?;
        let mut current_value = BigDecimal::zero();
        let mut daily_profit_loss = BigDecimal::zero();
        for line in &lines {
            // Holding rows only cache the last valuation; the stock price may have moved since
            match &line.stock.current_price {
                Some(price) => {
                    current_value +=
                        value_holding(line.holding.quantity, &line.holding.total_invested, price)
                            .current_value;
                }
                None => {
                    if let Some(value) = &line.holding.current_value {
                        current_value += value;
                    }
                }
            }
            if let Some(change) = &line.stock.price_change {
                daily_profit_loss += change * BigDecimal::from(i64::from(line.holding.quantity));
            }
        }
        let total_deposits = self.store.total_deposits(user_id).await?;

        let summary = summarize_account(current_value, total_deposits, daily_profit_loss);

        account.current_value = summary.current_value.clone();
        account.total_deposits = summary.total_deposits.clone();
        account.total_profit_loss = summary.total_profit_loss.clone();
        account.daily_profit_loss = summary.daily_profit_loss.clone();
        account.last_updated = Utc::now();
        self.store.save_account(&account).await?;

        Ok(summary)
    }

    pub async fn add_deposit(&self, request: DepositRequest) -> Result<Deposit, AppError> {
        if request.amount <= BigDecimal::zero() {
            return Err(AppError::Validation(format!(
                "deposit amount must be positive, got {}",
                request.amount
            )));
        }
        self.ensure_user(request.user_id).await?;

        let deposit = Deposit::new(request.user_id, request.amount, request.description);
        self.store.insert_deposit(&deposit).await?;
        info!("💵 Deposit of {} recorded for user {}", deposit.amount, deposit.user_id);
        Ok(deposit)
    }

    pub async fn list_deposits(&self, user_id: Uuid) -> Result<Vec<Deposit>, AppError> {
        self.ensure_user(user_id).await?;
        Ok(self.store.list_deposits(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AddBuyRequest;
    use crate::test_support::{dec, Harness};

    fn deposit(user_id: Uuid, amount: &str) -> DepositRequest {
        DepositRequest {
            user_id,
            amount: dec(amount),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_summary_reference_scenario() {
        let harness = Harness::new();
        let user = harness.user();
        harness.provider.set_quote_with_change("XYZ", "120.00", "2.00", "1.6949");

        harness
            .accounts
            .add_deposit(deposit(user, "1000.00"))
            .await
            .unwrap();
        harness
            .portfolio
            .add_buy(AddBuyRequest {
                user_id: user,
                symbol: "XYZ".into(),
                quantity: 10,
                buy_price: dec("100.00"),
            })
            .await
            .unwrap();

        let summary = harness.accounts.get_account_summary(user).await.unwrap();
        assert_eq!(summary.current_value, dec("1200.00"));
        assert_eq!(summary.total_deposits, dec("1000.00"));
        assert_eq!(summary.total_profit_loss, dec("200.00"));
        assert_eq!(summary.total_profit_loss_percentage.to_string(), "20.0000");
        // 10 shares * 2.00 change, against a previous value of 1180.00
        assert_eq!(summary.daily_profit_loss, dec("20.00"));
        assert_eq!(summary.daily_profit_loss_percentage.to_string(), "1.6949");

        let cached = harness.store.find_or_create_account(user).await.unwrap();
        assert_eq!(cached.total_profit_loss, dec("200.00"));
    }

    #[tokio::test]
    async fn test_summary_values_holdings_at_the_synced_price() {
        let harness = Harness::new();
        let user = harness.user();
        harness.provider.set_quote("XYZ", "100.00");
        harness
            .portfolio
            .add_buy(AddBuyRequest {
                user_id: user,
                symbol: "XYZ".into(),
                quantity: 10,
                buy_price: dec("100.00"),
            })
            .await
            .unwrap();

        harness
            .provider
            .set_quote_with_change("XYZ", "150.00", "50.00", "50.0000");
        harness.price_sync.run_tick().await.unwrap();

        let summary = harness.accounts.get_account_summary(user).await.unwrap();
        assert_eq!(summary.current_value, dec("1500.00"));
        assert_eq!(summary.daily_profit_loss, dec("500.00"));
        assert_eq!(summary.daily_profit_loss_percentage.to_string(), "50.0000");

        let lines = harness.portfolio.list_holdings(user).await.unwrap();
        assert_eq!(lines[0].holding.current_value, Some(dec("1500.00")));
        assert_eq!(lines[0].holding.profit_loss, Some(dec("500.00")));
    }

    #[tokio::test]
    async fn test_summary_for_fresh_user_is_all_zero() {
        let harness = Harness::new();
        let user = harness.user();

        let summary = harness.accounts.get_account_summary(user).await.unwrap();
        assert!(summary.current_value.is_zero());
        assert!(summary.total_profit_loss_percentage.is_zero());
        assert!(summary.daily_profit_loss_percentage.is_zero());
    }

    #[tokio::test]
    async fn test_deposits_are_validated_and_listed_newest_first() {
        let harness = Harness::new();
        let user = harness.user();

        let err = harness
            .accounts
            .add_deposit(deposit(user, "0"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = harness
            .accounts
            .add_deposit(deposit(Uuid::new_v4(), "10"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UserNotFound(_)));

        let first = harness.accounts.add_deposit(deposit(user, "10")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = harness.accounts.add_deposit(deposit(user, "25")).await.unwrap();

        let listed = harness.accounts.list_deposits(user).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(harness.store.total_deposits(user).await.unwrap(), dec("35"));
    }
}

use std::sync::Arc;

use crate::services::account_service::AccountService;
use crate::services::broadcaster::Broadcaster;
use crate::services::portfolio_service::PortfolioService;
use crate::services::quote_client::QuoteClient;

#[derive(Clone)]
pub struct AppState {
    pub portfolio: Arc<PortfolioService>,
    pub accounts: Arc<AccountService>,
    pub quotes: Arc<QuoteClient>,
    pub broadcaster: Broadcaster,
}

pub mod account_queries;
pub mod deposit_queries;
pub mod holding_queries;
pub mod stock_queries;
pub mod user_queries;

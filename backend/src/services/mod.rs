pub mod account_service;
pub mod broadcaster;
pub mod job_scheduler_service;
pub mod keyed_lock;
pub mod portfolio_service;
pub mod quote_client;
pub mod rate_limiter;
pub mod valuation;

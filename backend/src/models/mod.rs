mod account;
mod deposit;
mod holding;
mod portfolio;
mod price_update;
mod stock;
mod symbol;

pub use account::{Account, AccountSummary};
pub use deposit::{Deposit, DepositRequest};
pub use holding::{AddBuyRequest, Holding, HoldingWithStock};
pub use portfolio::PortfolioResponse;
pub use price_update::PriceUpdate;
pub use stock::{DividendSummary, NewStock, Stock, SymbolMatch};
pub use symbol::{InvalidSymbol, Symbol};

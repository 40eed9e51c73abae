pub(crate) mod accounts;
pub(crate) mod health;
pub(crate) mod portfolio;
pub(crate) mod stocks;
pub(crate) mod topics;

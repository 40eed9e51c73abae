//! Background jobs driven by the job scheduler service.

pub mod price_sync_job;

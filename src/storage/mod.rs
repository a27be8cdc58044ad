mod queries;
mod repository;
mod unit;

pub use repository::*;
pub use unit::*;

/// SQL migration for accounts, credentials and the transaction ledger
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration for services and service payments
pub const MIGRATION_002_SERVICES: &str = include_str!("migrations/002_services.sql");

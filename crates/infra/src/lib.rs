//! Infrastructure layer: persistence, configuration, and the service that
//! runs ledger operations against storage.

pub mod config;
pub mod ledger_service;
pub mod repository;

pub use config::{AppConfig, ConfigError, DatabaseConfig};
pub use ledger_service::{LedgerService, LedgerServiceError, LedgerUpdate};
pub use repository::{
    InMemoryLedgerRepository, LedgerRepository, PostgresLedgerRepository, RepositoryError,
    RepositoryResult,
};

use std::sync::Arc;

use anyhow::Context;

use fleetops_infra::{
    AppConfig, InMemoryLedgerRepository, LedgerRepository, LedgerService, PostgresLedgerRepository,
};

pub type DynLedgerService = LedgerService<Arc<dyn LedgerRepository>>;

/// Shared state behind every protected route.
pub struct AppServices {
    pub ledgers: DynLedgerService,
}

impl AppServices {
    pub fn new(repository: Arc<dyn LedgerRepository>) -> Self {
        Self {
            ledgers: LedgerService::new(repository),
        }
    }

    /// Services over process-local storage (dev and tests).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryLedgerRepository::new()))
    }
}

/// Pick storage from configuration: Postgres when `DATABASE_URL` is set,
/// otherwise in-memory.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let Some(database) = &config.database else {
        tracing::info!("DATABASE_URL not set; cargo ledgers are kept in memory");
        return Ok(AppServices::in_memory());
    };

    let repository = PostgresLedgerRepository::connect(&database.url, database.max_connections)
        .await
        .context("failed to connect to Postgres")?;
    repository
        .migrate()
        .await
        .context("failed to apply cargo ledger schema")?;

    tracing::info!(
        max_connections = database.max_connections,
        "cargo ledgers are persisted in Postgres"
    );
    Ok(AppServices::new(Arc::new(repository)))
}

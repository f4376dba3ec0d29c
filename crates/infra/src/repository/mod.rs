//! Ledger persistence.
//!
//! The ledger core never touches storage; services load a ledger, run the
//! operation in memory, then hand the result to a [`LedgerRepository`].

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use fleetops_cargo::{CargoId, CargoLedger};
use fleetops_core::{ExpectedVersion, TenantId};

pub use in_memory::InMemoryLedgerRepository;
pub use postgres::PostgresLedgerRepository;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Stored version did not match the caller's expectation.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// Stored state does not form a valid ledger.
    #[error("stored ledger is corrupt: {0}")]
    Corrupt(String),

    #[error("database error in {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Tenant-isolated ledger storage.
///
/// `save_ledger` replaces the stored ledger (row + all line items) atomically
/// and only if the stored version matches `expected`; `Exact(0)` means the
/// ledger must not exist yet.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn load_ledger(&self, tenant_id: TenantId, id: &CargoId) -> RepositoryResult<Option<CargoLedger>>;

    /// All ledgers of a tenant, ordered by id.
    async fn list_ledgers(&self, tenant_id: TenantId) -> RepositoryResult<Vec<CargoLedger>>;

    async fn save_ledger(
        &self,
        tenant_id: TenantId,
        ledger: &CargoLedger,
        expected: ExpectedVersion,
    ) -> RepositoryResult<()>;

    /// Returns `false` when there was nothing to delete.
    async fn delete_ledger(&self, tenant_id: TenantId, id: &CargoId) -> RepositoryResult<bool>;
}

#[async_trait]
impl<R> LedgerRepository for Arc<R>
where
    R: LedgerRepository + ?Sized,
{
    async fn load_ledger(&self, tenant_id: TenantId, id: &CargoId) -> RepositoryResult<Option<CargoLedger>> {
        (**self).load_ledger(tenant_id, id).await
    }

    async fn list_ledgers(&self, tenant_id: TenantId) -> RepositoryResult<Vec<CargoLedger>> {
        (**self).list_ledgers(tenant_id).await
    }

    async fn save_ledger(
        &self,
        tenant_id: TenantId,
        ledger: &CargoLedger,
        expected: ExpectedVersion,
    ) -> RepositoryResult<()> {
        (**self).save_ledger(tenant_id, ledger, expected).await
    }

    async fn delete_ledger(&self, tenant_id: TenantId, id: &CargoId) -> RepositoryResult<bool> {
        (**self).delete_ledger(tenant_id, id).await
    }
}

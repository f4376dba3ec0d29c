//! Ledger operations against storage.
//!
//! ```text
//! request
//!   ↓
//! 1. acquire the per-ledger lock (tenant + ledger id)
//!   ↓
//! 2. load the ledger from the repository
//!   ↓
//! 3. run the operation in memory (ledger checks its own invariants)
//!   ↓
//! 4. save with an exact expected version
//!   ↓
//! 5. release the lock
//! ```
//!
//! If step 3 or 4 fails the mutated copy is dropped, so stored state only
//! ever reflects complete operations. Operations on different ledgers do not
//! contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, error, info};

use fleetops_cargo::{CargoError, CargoEvent, CargoId, CargoLedger};
use fleetops_core::{AggregateRoot, ExpectedVersion, TenantId};
use fleetops_events::Event;

use crate::repository::{LedgerRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum LedgerServiceError {
    /// The ledger rejected the operation.
    #[error(transparent)]
    Cargo(#[from] CargoError),

    #[error("cargo ledger '{0}' not found")]
    NotFound(CargoId),

    #[error("cargo ledger '{0}' already exists")]
    AlreadyExists(CargoId),

    /// Another writer changed the ledger between load and save.
    #[error("concurrent modification: {0}")]
    Conflict(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for LedgerServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Concurrency(msg) => LedgerServiceError::Conflict(msg),
            other => LedgerServiceError::Repository(other),
        }
    }
}

/// Partial update of a ledger's header fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerUpdate {
    pub owner_label: Option<String>,
    pub capacity: Option<f64>,
}

type LockKey = (TenantId, CargoId);
type LockRegistry = Mutex<HashMap<LockKey, Arc<tokio::sync::Mutex<()>>>>;

/// A claim on one registry entry, held while an operation waits for or
/// holds the ledger lock. Dropping the last claim removes the entry, also
/// when the operation's future is cancelled mid-flight.
struct LockLease<'a> {
    registry: &'a LockRegistry,
    key: LockKey,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for LockLease<'_> {
    fn drop(&mut self) {
        if let Ok(mut locks) = self.registry.lock() {
            // One reference lives in the registry, one here.
            if Arc::strong_count(&self.lock) == 2 {
                locks.remove(&self.key);
            }
        }
    }
}

/// Runs ledger operations one at a time per ledger.
#[derive(Debug)]
pub struct LedgerService<R> {
    repository: R,
    locks: LockRegistry,
}

impl<R> LedgerService<R>
where
    R: LedgerRepository,
{
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Create a ledger. A generated UUIDv7 id is used when `id` is `None`.
    pub async fn open_ledger(
        &self,
        tenant_id: TenantId,
        id: Option<CargoId>,
        owner_label: impl Into<String>,
        capacity: f64,
    ) -> Result<CargoLedger, LedgerServiceError> {
        let id = id.unwrap_or_else(CargoId::generate);
        let owner_label = owner_label.into();

        self.with_lock(tenant_id, &id, async {
            let (ledger, events) = match CargoLedger::open(id.clone(), owner_label, capacity) {
                Ok(opened) => opened,
                Err(e) => {
                    debug!(tenant_id = %tenant_id, ledger_id = %id, error = %e, "ledger open rejected");
                    return Err(e.into());
                }
            };

            match self
                .repository
                .save_ledger(tenant_id, &ledger, ExpectedVersion::Exact(0))
                .await
            {
                Ok(()) => {}
                Err(RepositoryError::Concurrency(_)) => {
                    debug!(tenant_id = %tenant_id, ledger_id = %id, "ledger id already taken");
                    return Err(LedgerServiceError::AlreadyExists(id.clone()));
                }
                Err(e) => return Err(repository_failure(tenant_id, &id, "open_ledger", e)),
            }

            log_committed(tenant_id, &events);
            Ok(ledger)
        })
        .await
    }

    pub async fn get_ledger(&self, tenant_id: TenantId, id: &CargoId) -> Result<CargoLedger, LedgerServiceError> {
        self.repository
            .load_ledger(tenant_id, id)
            .await
            .map_err(|e| repository_failure(tenant_id, id, "get_ledger", e))?
            .ok_or_else(|| LedgerServiceError::NotFound(id.clone()))
    }

    pub async fn list_ledgers(&self, tenant_id: TenantId) -> Result<Vec<CargoLedger>, LedgerServiceError> {
        self.repository.list_ledgers(tenant_id).await.map_err(|e| {
            error!(tenant_id = %tenant_id, operation = "list_ledgers", error = %e, "ledger repository failure");
            LedgerServiceError::from(e)
        })
    }

    pub async fn add_item(
        &self,
        tenant_id: TenantId,
        id: &CargoId,
        name: &str,
        amount: i64,
        unit_weight: f64,
    ) -> Result<CargoLedger, LedgerServiceError> {
        self.mutate(tenant_id, id, "add_item", |ledger| {
            ledger.add_item(name, amount, unit_weight)
        })
        .await
    }

    pub async fn remove_item(
        &self,
        tenant_id: TenantId,
        id: &CargoId,
        name: &str,
        amount: i64,
        unit_weight: f64,
    ) -> Result<CargoLedger, LedgerServiceError> {
        self.mutate(tenant_id, id, "remove_item", |ledger| {
            ledger.remove_item(name, amount, unit_weight)
        })
        .await
    }

    /// Apply a relabel and/or resize as one operation; if the resize is
    /// rejected the relabel is not stored either.
    pub async fn update_ledger(
        &self,
        tenant_id: TenantId,
        id: &CargoId,
        update: LedgerUpdate,
    ) -> Result<CargoLedger, LedgerServiceError> {
        self.mutate(tenant_id, id, "update_ledger", move |ledger| {
            let mut events = Vec::new();
            if let Some(owner_label) = update.owner_label {
                events.extend(ledger.relabel_owner(owner_label)?);
            }
            if let Some(capacity) = update.capacity {
                events.extend(ledger.resize_capacity(capacity)?);
            }
            Ok(events)
        })
        .await
    }

    pub async fn delete_ledger(&self, tenant_id: TenantId, id: &CargoId) -> Result<(), LedgerServiceError> {
        self.with_lock(tenant_id, id, async {
            let deleted = self
                .repository
                .delete_ledger(tenant_id, id)
                .await
                .map_err(|e| repository_failure(tenant_id, id, "delete_ledger", e))?;
            if !deleted {
                return Err(LedgerServiceError::NotFound(id.clone()));
            }
            info!(tenant_id = %tenant_id, ledger_id = %id, "cargo ledger deleted");
            Ok(())
        })
        .await
    }

    async fn mutate<F>(
        &self,
        tenant_id: TenantId,
        id: &CargoId,
        operation: &'static str,
        op: F,
    ) -> Result<CargoLedger, LedgerServiceError>
    where
        F: FnOnce(&mut CargoLedger) -> Result<Vec<CargoEvent>, CargoError> + Send,
    {
        self.with_lock(tenant_id, id, async {
            let mut ledger = self
                .repository
                .load_ledger(tenant_id, id)
                .await
                .map_err(|e| repository_failure(tenant_id, id, operation, e))?
                .ok_or_else(|| LedgerServiceError::NotFound(id.clone()))?;
            let expected = ExpectedVersion::Exact(ledger.version());

            let events = match op(&mut ledger) {
                Ok(events) => events,
                Err(e) => {
                    debug!(
                        tenant_id = %tenant_id,
                        ledger_id = %id,
                        operation,
                        code = e.code(),
                        error = %e,
                        "ledger operation rejected"
                    );
                    return Err(e.into());
                }
            };

            if events.is_empty() {
                return Ok(ledger);
            }

            self.repository
                .save_ledger(tenant_id, &ledger, expected)
                .await
                .map_err(|e| repository_failure(tenant_id, id, operation, e))?;

            log_committed(tenant_id, &events);
            Ok(ledger)
        })
        .await
    }

    async fn with_lock<T, Fut>(&self, tenant_id: TenantId, id: &CargoId, fut: Fut) -> Result<T, LedgerServiceError>
    where
        Fut: Future<Output = Result<T, LedgerServiceError>>,
    {
        let lease = self.lease((tenant_id, id.clone()))?;
        let _guard = lease.lock.lock().await;
        fut.await
    }

    fn lease(&self, key: LockKey) -> Result<LockLease<'_>, LedgerServiceError> {
        let mut locks = self.locks.lock().map_err(|_| {
            LedgerServiceError::Repository(RepositoryError::Unavailable(
                "ledger lock registry poisoned".to_string(),
            ))
        })?;
        let lock = locks.entry(key.clone()).or_default().clone();
        Ok(LockLease {
            registry: &self.locks,
            key,
            lock,
        })
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}

fn log_committed(tenant_id: TenantId, events: &[CargoEvent]) {
    for event in events {
        info!(
            tenant_id = %tenant_id,
            ledger_id = event.stream_id(),
            event_type = event.event_type(),
            "cargo ledger event committed"
        );
    }
}

fn repository_failure(
    tenant_id: TenantId,
    id: &CargoId,
    operation: &'static str,
    err: RepositoryError,
) -> LedgerServiceError {
    error!(tenant_id = %tenant_id, ledger_id = %id, operation, error = %err, "ledger repository failure");
    err.into()
}

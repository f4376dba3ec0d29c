use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use fleetops_cargo::{CargoId, CargoLedger, LedgerSnapshot};
use fleetops_core::{AggregateRoot, ExpectedVersion, TenantId};

use super::{LedgerRepository, RepositoryError, RepositoryResult};

/// In-memory ledger storage for tests/dev.
///
/// Stores snapshots, so ledgers handed out are always independent copies.
#[derive(Debug, Default)]
pub struct InMemoryLedgerRepository {
    inner: RwLock<HashMap<(TenantId, CargoId), LedgerSnapshot>>,
}

impl InMemoryLedgerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Unavailable("in-memory ledger store lock poisoned".to_string())
}

fn restore(snapshot: LedgerSnapshot) -> RepositoryResult<CargoLedger> {
    CargoLedger::restore(snapshot).map_err(|e| RepositoryError::Corrupt(e.to_string()))
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn load_ledger(&self, tenant_id: TenantId, id: &CargoId) -> RepositoryResult<Option<CargoLedger>> {
        let snapshot = {
            let map = self.inner.read().map_err(|_| poisoned())?;
            map.get(&(tenant_id, id.clone())).cloned()
        };
        snapshot.map(restore).transpose()
    }

    async fn list_ledgers(&self, tenant_id: TenantId) -> RepositoryResult<Vec<CargoLedger>> {
        let mut snapshots: Vec<LedgerSnapshot> = {
            let map = self.inner.read().map_err(|_| poisoned())?;
            map.iter()
                .filter(|((t, _), _)| *t == tenant_id)
                .map(|(_, s)| s.clone())
                .collect()
        };
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots.into_iter().map(restore).collect()
    }

    async fn save_ledger(
        &self,
        tenant_id: TenantId,
        ledger: &CargoLedger,
        expected: ExpectedVersion,
    ) -> RepositoryResult<()> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let key = (tenant_id, ledger.id().clone());

        let current = map.get(&key).map(|s| s.version).unwrap_or(0);
        expected
            .check(current)
            .map_err(|e| RepositoryError::Concurrency(e.to_string()))?;

        map.insert(key, ledger.snapshot());
        Ok(())
    }

    async fn delete_ledger(&self, tenant_id: TenantId, id: &CargoId) -> RepositoryResult<bool> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        Ok(map.remove(&(tenant_id, id.clone())).is_some())
    }
}

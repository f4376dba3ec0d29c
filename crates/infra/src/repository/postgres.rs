//! Postgres-backed ledger repository.
//!
//! Layout: one `cargo_ledgers` row per ledger and one `cargo_line_items` row
//! per line item (see `migrations/0001_cargo_ledgers.sql`). Every query is
//! scoped by `tenant_id`.
//!
//! Reads run in a `REPEATABLE READ, READ ONLY` transaction so the ledger row
//! and its line items come from the same committed save.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError |
//! |------------|----------------------|-----------------|
//! | Database (unique violation) | `23505` | `Concurrency` (two creates raced) |
//! | anything else | | `Database` |

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use fleetops_cargo::{CargoId, CargoLedger, LedgerSnapshot, LineItem};
use fleetops_core::{AggregateRoot, ExpectedVersion, TenantId};

use super::{LedgerRepository, RepositoryError, RepositoryResult};

const SCHEMA: &str = include_str!("../../migrations/0001_cargo_ledgers.sql");

/// Postgres ledger repository.
///
/// Uses the SQLx connection pool, which is `Send + Sync`; saving a ledger
/// runs in a single transaction.
#[derive(Debug, Clone)]
pub struct PostgresLedgerRepository {
    pool: Arc<PgPool>,
}

impl PostgresLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a connection pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> RepositoryResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(|e| db_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the ledger tables if they do not exist yet.
    pub async fn migrate(&self) -> RepositoryResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("migrate", e))?;
        Ok(())
    }

    async fn stored_version(
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: TenantId,
        id: &CargoId,
    ) -> RepositoryResult<u64> {
        let row = sqlx::query(
            r#"
            SELECT version
            FROM cargo_ledgers
            WHERE tenant_id = $1 AND id = $2
            FOR UPDATE
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(id.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| db_error("select_version", e))?;

        match row {
            Some(row) => {
                let version: i64 = row.try_get("version").map_err(|e| db_error("select_version", e))?;
                version_from_db(version)
            }
            None => Ok(0),
        }
    }

    async fn begin_snapshot(&self) -> RepositoryResult<Transaction<'static, Postgres>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin_transaction", e))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("set_isolation", e))?;
        Ok(tx)
    }

    async fn select_ledger_row(
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: TenantId,
        id: &CargoId,
    ) -> RepositoryResult<Option<PgRow>> {
        sqlx::query(
            r#"
            SELECT id, owner_label, capacity, used_capacity, version
            FROM cargo_ledgers
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(id.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| db_error("load_ledger", e))
    }

    async fn select_line_items(
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: TenantId,
        id: &CargoId,
    ) -> RepositoryResult<Vec<LineItem>> {
        let rows = sqlx::query(
            r#"
            SELECT ledger_id, name, amount
            FROM cargo_line_items
            WHERE tenant_id = $1 AND ledger_id = $2
            ORDER BY position ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(id.as_str())
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| db_error("load_line_items", e))?;

        rows.iter().map(line_item_from_row).collect()
    }
}

#[async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    #[instrument(skip(self), fields(tenant_id = %tenant_id, ledger_id = %id), err)]
    async fn load_ledger(&self, tenant_id: TenantId, id: &CargoId) -> RepositoryResult<Option<CargoLedger>> {
        let mut tx = self.begin_snapshot().await?;

        let Some(row) = Self::select_ledger_row(&mut tx, tenant_id, id).await? else {
            tx.commit().await.map_err(|e| db_error("commit_transaction", e))?;
            return Ok(None);
        };
        let items = Self::select_line_items(&mut tx, tenant_id, id).await?;
        tx.commit().await.map_err(|e| db_error("commit_transaction", e))?;

        ledger_from_row(&row, items).map(Some)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn list_ledgers(&self, tenant_id: TenantId) -> RepositoryResult<Vec<CargoLedger>> {
        let mut tx = self.begin_snapshot().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, owner_label, capacity, used_capacity, version
            FROM cargo_ledgers
            WHERE tenant_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| db_error("list_ledgers", e))?;

        let item_rows = sqlx::query(
            r#"
            SELECT ledger_id, name, amount
            FROM cargo_line_items
            WHERE tenant_id = $1
            ORDER BY ledger_id ASC, position ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| db_error("list_line_items", e))?;
        tx.commit().await.map_err(|e| db_error("commit_transaction", e))?;

        let mut items_by_ledger: HashMap<String, Vec<LineItem>> = HashMap::new();
        for row in &item_rows {
            let ledger_id: String = row.try_get("ledger_id").map_err(|e| db_error("list_line_items", e))?;
            items_by_ledger
                .entry(ledger_id)
                .or_default()
                .push(line_item_from_row(row)?);
        }

        let mut ledgers = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id").map_err(|e| db_error("list_ledgers", e))?;
            let items = items_by_ledger.remove(&id).unwrap_or_default();
            ledgers.push(ledger_from_row(row, items)?);
        }
        Ok(ledgers)
    }

    #[instrument(
        skip(self, ledger),
        fields(tenant_id = %tenant_id, ledger_id = %ledger.id(), expected = ?expected),
        err
    )]
    async fn save_ledger(
        &self,
        tenant_id: TenantId,
        ledger: &CargoLedger,
        expected: ExpectedVersion,
    ) -> RepositoryResult<()> {
        let snapshot = ledger.snapshot();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin_transaction", e))?;

        let current = Self::stored_version(&mut tx, tenant_id, &snapshot.id).await?;
        if !expected.matches(current) {
            tx.rollback().await.map_err(|e| db_error("rollback", e))?;
            return Err(RepositoryError::Concurrency(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        let statement = if current == 0 {
            r#"
            INSERT INTO cargo_ledgers (tenant_id, id, owner_label, capacity, used_capacity, version)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#
        } else {
            r#"
            UPDATE cargo_ledgers
            SET owner_label = $3, capacity = $4, used_capacity = $5, version = $6, updated_at = now()
            WHERE tenant_id = $1 AND id = $2
            "#
        };

        sqlx::query(statement)
            .bind(tenant_id.as_uuid())
            .bind(snapshot.id.as_str())
            .bind(&snapshot.owner_label)
            .bind(snapshot.capacity)
            .bind(snapshot.used_capacity)
            .bind(snapshot.version as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    RepositoryError::Concurrency(format!("ledger '{}' was created concurrently", snapshot.id))
                } else {
                    db_error("write_ledger", e)
                }
            })?;

        sqlx::query("DELETE FROM cargo_line_items WHERE tenant_id = $1 AND ledger_id = $2")
            .bind(tenant_id.as_uuid())
            .bind(snapshot.id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("clear_line_items", e))?;

        for (position, item) in snapshot.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cargo_line_items (tenant_id, ledger_id, position, name, amount)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(snapshot.id.as_str())
            .bind(position as i32)
            .bind(&item.name)
            .bind(item.amount)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("insert_line_item", e))?;
        }

        tx.commit().await.map_err(|e| db_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, ledger_id = %id), err)]
    async fn delete_ledger(&self, tenant_id: TenantId, id: &CargoId) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM cargo_ledgers WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(id.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("delete_ledger", e))?;
        Ok(result.rows_affected() > 0)
    }
}

fn ledger_from_row(row: &PgRow, items: Vec<LineItem>) -> RepositoryResult<CargoLedger> {
    let read = |e| db_error("decode_ledger", e);

    let id: String = row.try_get("id").map_err(read)?;
    let version = version_from_db(row.try_get("version").map_err(read)?)?;
    let snapshot = LedgerSnapshot {
        id: id
            .parse()
            .map_err(|e: fleetops_core::DomainError| RepositoryError::Corrupt(e.to_string()))?,
        owner_label: row.try_get("owner_label").map_err(read)?,
        capacity: row.try_get("capacity").map_err(read)?,
        used_capacity: row.try_get("used_capacity").map_err(read)?,
        items,
        version,
    };

    CargoLedger::restore(snapshot).map_err(|e| RepositoryError::Corrupt(e.to_string()))
}

fn version_from_db(version: i64) -> RepositoryResult<u64> {
    u64::try_from(version).map_err(|_| RepositoryError::Corrupt(format!("negative version {version}")))
}

fn line_item_from_row(row: &PgRow) -> RepositoryResult<LineItem> {
    let name: String = row.try_get("name").map_err(|e| db_error("decode_line_item", e))?;
    let amount: i64 = row.try_get("amount").map_err(|e| db_error("decode_line_item", e))?;
    Ok(LineItem::new(name, amount))
}

fn db_error(operation: &'static str, source: sqlx::Error) -> RepositoryError {
    RepositoryError::Database { operation, source }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

//! # BillRunRepository
//!
//! Reads bill runs and moves them between statuses.
//!
//! Status updates are compare-and-set: the update only applies while the row
//! still has the status the caller read. A second cancel racing the first one
//! therefore loses instead of starting a second deletion.

use abstraction_billing_domain::bill_run::{BillRun, BillRunId, BillRunStatus, ExternalId};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::InfraError;

#[async_trait]
pub trait BillRunRepository: Send + Sync {
    async fn find_by_id(&self, id: &BillRunId) -> Result<Option<BillRun>, InfraError>;

    /// Sets the status to `to` if it is still `from`
    ///
    /// Returns `false` when the bill run is gone or its status has changed.
    async fn update_status(
        &self,
        id: &BillRunId,
        from: BillRunStatus,
        to: BillRunStatus,
    ) -> Result<bool, InfraError>;
}

/// PostgreSQL implementation of [`BillRunRepository`]
#[derive(Debug, Clone)]
pub struct PostgresBillRunRepository {
    pool: PgPool,
}

impl PostgresBillRunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bill_run_from_row(row: &PgRow) -> Result<BillRun, InfraError> {
    let id: Uuid = row.try_get("id")?;
    let external_id: Option<Uuid> = row.try_get("external_id")?;
    let status: String = row.try_get("status")?;

    let status =
        BillRunStatus::parse(&status).map_err(|e| InfraError::unexpected(e.to_string()))?;

    Ok(BillRun::new(
        BillRunId::from_uuid(id),
        external_id.map(ExternalId::from_uuid),
        status,
    ))
}

#[async_trait]
impl BillRunRepository for PostgresBillRunRepository {
    async fn find_by_id(&self, id: &BillRunId) -> Result<Option<BillRun>, InfraError> {
        let row = sqlx::query(
            r#"
            SELECT id, external_id, status
            FROM bill_runs
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(bill_run_from_row).transpose()
    }

    async fn update_status(
        &self,
        id: &BillRunId,
        from: BillRunStatus,
        to: BillRunStatus,
    ) -> Result<bool, InfraError> {
        let from: &'static str = from.into();
        let to: &'static str = to.into();

        let result = sqlx::query(
            r#"
            UPDATE bill_runs
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

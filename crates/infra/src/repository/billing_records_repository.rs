//! # BillingRecordsRepository
//!
//! Delete statements for the finalized billing records of a bill run.
//!
//! ```text
//! bill_runs ─┬─ bills ── bill_licences ── transactions
//!            ├─ bill_run_charge_version_years
//!            └─ bill_run_volumes
//! ```
//!
//! `transactions` has no `bill_run_id`; it is reached through `bill_licences`
//! and `bills`. On a large bill run that statement runs for tens of minutes.

use abstraction_billing_domain::bill_run::BillRunId;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::InfraError;

#[async_trait]
pub trait BillingRecordsRepository: Send + Sync {
    async fn delete_transactions(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError>;

    async fn delete_bill_licences(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError>;

    async fn delete_bills(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError>;

    async fn delete_charge_version_years(&self, bill_run_id: &BillRunId)
    -> Result<u64, InfraError>;

    async fn delete_volumes(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError>;

    /// Deletes the `bill_runs` row itself
    async fn delete_bill_run(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError>;
}

/// PostgreSQL implementation of [`BillingRecordsRepository`]
#[derive(Debug, Clone)]
pub struct PostgresBillingRecordsRepository {
    pool: PgPool,
}

impl PostgresBillingRecordsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn delete_by_bill_run(&self, sql: &str, bill_run_id: &BillRunId) -> Result<u64, InfraError> {
        let result = sqlx::query(sql)
            .bind(bill_run_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BillingRecordsRepository for PostgresBillingRecordsRepository {
    async fn delete_transactions(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError> {
        self.delete_by_bill_run(
            r#"
            DELETE FROM transactions t
            USING bill_licences bl, bills b
            WHERE t.bill_licence_id = bl.id
              AND bl.bill_id = b.id
              AND b.bill_run_id = $1
            "#,
            bill_run_id,
        )
        .await
    }

    async fn delete_bill_licences(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError> {
        self.delete_by_bill_run(
            r#"
            DELETE FROM bill_licences bl
            USING bills b
            WHERE bl.bill_id = b.id
              AND b.bill_run_id = $1
            "#,
            bill_run_id,
        )
        .await
    }

    async fn delete_bills(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError> {
        self.delete_by_bill_run("DELETE FROM bills WHERE bill_run_id = $1", bill_run_id)
            .await
    }

    async fn delete_charge_version_years(
        &self,
        bill_run_id: &BillRunId,
    ) -> Result<u64, InfraError> {
        self.delete_by_bill_run(
            "DELETE FROM bill_run_charge_version_years WHERE bill_run_id = $1",
            bill_run_id,
        )
        .await
    }

    async fn delete_volumes(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError> {
        self.delete_by_bill_run(
            "DELETE FROM bill_run_volumes WHERE bill_run_id = $1",
            bill_run_id,
        )
        .await
    }

    async fn delete_bill_run(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError> {
        self.delete_by_bill_run("DELETE FROM bill_runs WHERE id = $1", bill_run_id)
            .await
    }
}

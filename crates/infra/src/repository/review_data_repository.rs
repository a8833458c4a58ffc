//! # ReviewDataRepository
//!
//! Delete statements for two-part-tariff review staging data.
//!
//! Every statement is scoped by [`ReviewScope`]: the bill run, optionally
//! narrowed to one licence. Rows are reached through their owning
//! `review_licences` row:
//!
//! ```text
//! review_licences ─┬─ review_charge_versions ── review_charge_references ── review_charge_elements
//!                  └─ review_returns ── review_charge_element_returns
//! ```
//!
//! The statements only remove rows; ordering them is the caller's job
//! (see `deletion::ReviewDataDeleter`).

use abstraction_billing_domain::{bill_run::BillRunId, review::ReviewScope};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

#[async_trait]
pub trait ReviewDataRepository: Send + Sync {
    async fn delete_charge_element_returns(&self, scope: &ReviewScope) -> Result<u64, InfraError>;

    async fn delete_charge_elements(&self, scope: &ReviewScope) -> Result<u64, InfraError>;

    async fn delete_charge_references(&self, scope: &ReviewScope) -> Result<u64, InfraError>;

    async fn delete_charge_versions(&self, scope: &ReviewScope) -> Result<u64, InfraError>;

    async fn delete_returns(&self, scope: &ReviewScope) -> Result<u64, InfraError>;

    async fn delete_licences(&self, scope: &ReviewScope) -> Result<u64, InfraError>;

    /// Number of review licences left in the bill run
    async fn count_licences(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError>;
}

/// PostgreSQL implementation of [`ReviewDataRepository`]
#[derive(Debug, Clone)]
pub struct PostgresReviewDataRepository {
    pool: PgPool,
}

impl PostgresReviewDataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs a delete whose `$1` is the bill run and `$2` the optional licence
    async fn delete_scoped(&self, sql: &str, scope: &ReviewScope) -> Result<u64, InfraError> {
        let licence_id: Option<Uuid> = scope.licence_id.map(|id| *id.as_uuid());

        let result = sqlx::query(sql)
            .bind(scope.bill_run_id.as_uuid())
            .bind(licence_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ReviewDataRepository for PostgresReviewDataRepository {
    async fn delete_charge_element_returns(&self, scope: &ReviewScope) -> Result<u64, InfraError> {
        self.delete_scoped(
            r#"
            DELETE FROM review_charge_element_returns rcer
            USING review_returns rr, review_licences rl
            WHERE rcer.review_return_id = rr.id
              AND rr.review_licence_id = rl.id
              AND rl.bill_run_id = $1
              AND ($2::uuid IS NULL OR rl.licence_id = $2)
            "#,
            scope,
        )
        .await
    }

    async fn delete_charge_elements(&self, scope: &ReviewScope) -> Result<u64, InfraError> {
        self.delete_scoped(
            r#"
            DELETE FROM review_charge_elements rce
            USING review_charge_references rcr, review_charge_versions rcv, review_licences rl
            WHERE rce.review_charge_reference_id = rcr.id
              AND rcr.review_charge_version_id = rcv.id
              AND rcv.review_licence_id = rl.id
              AND rl.bill_run_id = $1
              AND ($2::uuid IS NULL OR rl.licence_id = $2)
            "#,
            scope,
        )
        .await
    }

    async fn delete_charge_references(&self, scope: &ReviewScope) -> Result<u64, InfraError> {
        self.delete_scoped(
            r#"
            DELETE FROM review_charge_references rcr
            USING review_charge_versions rcv, review_licences rl
            WHERE rcr.review_charge_version_id = rcv.id
              AND rcv.review_licence_id = rl.id
              AND rl.bill_run_id = $1
              AND ($2::uuid IS NULL OR rl.licence_id = $2)
            "#,
            scope,
        )
        .await
    }

    async fn delete_charge_versions(&self, scope: &ReviewScope) -> Result<u64, InfraError> {
        self.delete_scoped(
            r#"
            DELETE FROM review_charge_versions rcv
            USING review_licences rl
            WHERE rcv.review_licence_id = rl.id
              AND rl.bill_run_id = $1
              AND ($2::uuid IS NULL OR rl.licence_id = $2)
            "#,
            scope,
        )
        .await
    }

    async fn delete_returns(&self, scope: &ReviewScope) -> Result<u64, InfraError> {
        self.delete_scoped(
            r#"
            DELETE FROM review_returns rr
            USING review_licences rl
            WHERE rr.review_licence_id = rl.id
              AND rl.bill_run_id = $1
              AND ($2::uuid IS NULL OR rl.licence_id = $2)
            "#,
            scope,
        )
        .await
    }

    async fn delete_licences(&self, scope: &ReviewScope) -> Result<u64, InfraError> {
        self.delete_scoped(
            r#"
            DELETE FROM review_licences
            WHERE bill_run_id = $1
              AND ($2::uuid IS NULL OR licence_id = $2)
            "#,
            scope,
        )
        .await
    }

    async fn count_licences(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM review_licences WHERE bill_run_id = $1")
                .bind(bill_run_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}

//! # BillingRecordsDeleter
//!
//! Removes the finalized billing records of a bill run and then the bill run
//! row itself.
//!
//! transactions → bill_licences → (bills | bill_run_charge_version_years |
//! bill_run_volumes) → bill_runs
//!
//! ## FK constraints
//!
//! - transactions.bill_licence_id → bill_licences(id)
//! - bill_licences.bill_id → bills(id)
//! - bills / bill_run_charge_version_years / bill_run_volumes.bill_run_id → bill_runs(id)
//!
//! Statements are not wrapped in a transaction: the transactions delete can run
//! for tens of minutes on a large bill run. Stopping part way leaves a smaller
//! bill run behind, and running the deleter again finishes the job.

use std::sync::Arc;

use abstraction_billing_domain::bill_run::{BillRun, BillRunId};
use async_trait::async_trait;

use super::{BillRunDeleter, DeletionError, DeletionResult};
use crate::{error::InfraError, repository::BillingRecordsRepository};

pub struct BillingRecordsDeleter {
    repository: Arc<dyn BillingRecordsRepository>,
}

impl BillingRecordsDeleter {
    pub fn new(repository: Arc<dyn BillingRecordsRepository>) -> Self {
        Self { repository }
    }

    async fn cascade(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError> {
        let repository = &self.repository;

        let transactions = repository.delete_transactions(bill_run_id).await?;
        let bill_licences = repository.delete_bill_licences(bill_run_id).await?;

        let (bills, charge_version_years, volumes) = tokio::try_join!(
            repository.delete_bills(bill_run_id),
            repository.delete_charge_version_years(bill_run_id),
            repository.delete_volumes(bill_run_id),
        )?;

        let bill_runs = repository.delete_bill_run(bill_run_id).await?;

        Ok(transactions + bill_licences + bills + charge_version_years + volumes + bill_runs)
    }
}

#[async_trait]
impl BillRunDeleter for BillingRecordsDeleter {
    fn name(&self) -> &'static str {
        "postgres:billing_records"
    }

    #[tracing::instrument(skip_all, fields(bill_run_id = %bill_run.id()))]
    async fn delete(&self, bill_run: &BillRun) -> Result<DeletionResult, DeletionError> {
        let deleted_count = self
            .cascade(bill_run.id())
            .await
            .map_err(|source| DeletionError {
                deleter: self.name(),
                bill_run_id: *bill_run.id(),
                source,
            })?;

        tracing::debug!(deleted_count, "billing records deleted");
        Ok(DeletionResult { deleted_count })
    }
}

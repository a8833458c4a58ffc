//! Bill run use cases: cancel (and delete) a bill run, and remove a licence
//! from a bill run under two-part-tariff review.

use std::sync::Arc;

use abstraction_billing_domain::{
    DomainError,
    bill_run::{BillRun, BillRunId, BillRunStatus},
    licence::LicenceId,
    review::ReviewScope,
};
use abstraction_billing_infra::{
    deletion::ReviewDataDeleter,
    repository::{BillRunRepository, ReviewDataRepository},
};
use tokio::task::JoinHandle;

use super::DeleteBillRunUseCase;
use crate::error::ServiceError;

/// Cancelled bill run and the task deleting it
pub struct CancelledBillRun {
    pub bill_run: BillRun,
    pub deletion: JoinHandle<()>,
}

/// Result of removing a licence from a bill run under review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedReviewLicence {
    /// The bill run had no licence left and was moved to `empty`
    pub bill_run_empty: bool,
}

pub struct BillRunUseCaseImpl {
    bill_run_repository: Arc<dyn BillRunRepository>,
    review_repository:   Arc<dyn ReviewDataRepository>,
    review_deleter:      ReviewDataDeleter,
    deletion:            Arc<DeleteBillRunUseCase>,
}

impl BillRunUseCaseImpl {
    pub fn new(
        bill_run_repository: Arc<dyn BillRunRepository>,
        review_repository: Arc<dyn ReviewDataRepository>,
        deletion: Arc<DeleteBillRunUseCase>,
    ) -> Self {
        Self {
            bill_run_repository,
            review_deleter: ReviewDataDeleter::new(review_repository.clone()),
            review_repository,
            deletion,
        }
    }

    async fn find(&self, id: &BillRunId) -> Result<BillRun, ServiceError> {
        self.bill_run_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound {
                    entity_type: "BillRun",
                    id:          id.to_string(),
                }
                .into()
            })
    }

    /// Cancels the bill run and starts deleting it in the background
    ///
    /// The status moves to `cancel` with a compare-and-set, so of two
    /// concurrent cancels only one starts a deletion; the other gets a
    /// conflict.
    pub async fn cancel(&self, id: &BillRunId) -> Result<CancelledBillRun, ServiceError> {
        let bill_run = self.find(id).await?;
        let previous = bill_run.status();
        let cancelled = bill_run.cancelled()?;

        let updated = self
            .bill_run_repository
            .update_status(id, previous, BillRunStatus::Cancel)
            .await?;
        if !updated {
            return Err(ServiceError::Conflict(format!(
                "bill run {id} changed status while being cancelled"
            )));
        }

        tracing::info!(bill_run_id = %id, from = %previous, "bill run cancelled, deleting");
        let deletion = self.deletion.clone().spawn(cancelled.clone());

        Ok(CancelledBillRun {
            bill_run: cancelled,
            deletion,
        })
    }

    /// Removes one licence's review data from a bill run under review
    ///
    /// When no review licence is left the bill run moves to `empty`.
    pub async fn remove_review_licence(
        &self,
        bill_run_id: &BillRunId,
        licence_id: &LicenceId,
    ) -> Result<RemovedReviewLicence, ServiceError> {
        let bill_run = self.find(bill_run_id).await?;
        if bill_run.status() != BillRunStatus::Review {
            return Err(DomainError::InvalidStateTransition {
                entity_type: "BillRun",
                id:          bill_run_id.to_string(),
                status:      bill_run.status().to_string(),
                action:      "remove a licence from",
            }
            .into());
        }

        self.review_deleter
            .delete_scope(&ReviewScope::licence(*bill_run_id, *licence_id))
            .await
            .map_err(|e| ServiceError::Infra(e.source))?;

        let remaining = self.review_repository.count_licences(bill_run_id).await?;
        if remaining > 0 {
            return Ok(RemovedReviewLicence {
                bill_run_empty: false,
            });
        }

        let emptied = self
            .bill_run_repository
            .update_status(bill_run_id, BillRunStatus::Review, bill_run.emptied().status())
            .await?;
        if !emptied {
            return Err(ServiceError::Conflict(format!(
                "bill run {bill_run_id} left review while its last licence was removed"
            )));
        }

        Ok(RemovedReviewLicence {
            bill_run_empty: true,
        })
    }
}

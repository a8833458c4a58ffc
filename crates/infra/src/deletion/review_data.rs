//! # ReviewDataDeleter
//!
//! Removes two-part-tariff review staging data, for a whole bill run or for a
//! single licence within it.
//!
//! ## Order
//!
//! 1. `review_charge_element_returns`, alongside
//!    `review_charge_elements` then `review_charge_references`
//! 2. `review_charge_versions` and `review_returns`, side by side
//! 3. `review_licences`
//!
//! ## FK constraints
//!
//! - review_charge_elements.review_charge_reference_id → review_charge_references(id)
//! - review_charge_references.review_charge_version_id → review_charge_versions(id)
//! - review_charge_versions.review_licence_id → review_licences(id)
//! - review_returns.review_licence_id → review_licences(id)
//! - review_charge_element_returns.review_return_id → review_returns(id)
//!
//! A bill run that never went through review has no rows here; the delete is
//! then a series of zero-row statements.

use std::sync::Arc;

use abstraction_billing_domain::{bill_run::BillRun, review::ReviewScope};
use async_trait::async_trait;

use super::{BillRunDeleter, DeletionError, DeletionResult};
use crate::{error::InfraError, repository::ReviewDataRepository};

pub struct ReviewDataDeleter {
    repository: Arc<dyn ReviewDataRepository>,
}

impl ReviewDataDeleter {
    pub fn new(repository: Arc<dyn ReviewDataRepository>) -> Self {
        Self { repository }
    }

    /// Deletes the review data in `scope`
    #[tracing::instrument(skip(self), fields(bill_run_id = %scope.bill_run_id))]
    pub async fn delete_scope(&self, scope: &ReviewScope) -> Result<DeletionResult, DeletionError> {
        let deleted_count = self.cascade(scope).await.map_err(|source| DeletionError {
            deleter: self.name(),
            bill_run_id: scope.bill_run_id,
            source,
        })?;

        tracing::debug!(deleted_count, "review data deleted");
        Ok(DeletionResult { deleted_count })
    }

    async fn cascade(&self, scope: &ReviewScope) -> Result<u64, InfraError> {
        let repository = &self.repository;

        let (element_returns, (elements, references)) = tokio::try_join!(
            repository.delete_charge_element_returns(scope),
            async {
                let elements = repository.delete_charge_elements(scope).await?;
                let references = repository.delete_charge_references(scope).await?;
                Ok::<_, InfraError>((elements, references))
            },
        )?;

        let (versions, returns) = tokio::try_join!(
            repository.delete_charge_versions(scope),
            repository.delete_returns(scope),
        )?;

        let licences = repository.delete_licences(scope).await?;

        Ok(element_returns + elements + references + versions + returns + licences)
    }
}

#[async_trait]
impl BillRunDeleter for ReviewDataDeleter {
    fn name(&self) -> &'static str {
        "postgres:review_data"
    }

    async fn delete(&self, bill_run: &BillRun) -> Result<DeletionResult, DeletionError> {
        self.delete_scope(&ReviewScope::bill_run(*bill_run.id()))
            .await
    }
}

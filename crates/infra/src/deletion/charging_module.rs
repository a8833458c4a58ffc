//! # ChargingModuleBillRunDeleter
//!
//! Asks the charging module to delete its mirror of the bill run.
//!
//! Fails when the bill run has no external id (the charging module never
//! mirrored it, or the descriptor is incomplete) or when the charging module
//! answers with a failure. The registry treats that like any other failed
//! deleter: the local deletes still run, and an orphaned remote record is left
//! for manual clean up.

use std::sync::Arc;

use abstraction_billing_domain::bill_run::BillRun;
use async_trait::async_trait;

use super::{BillRunDeleter, DeletionError, DeletionResult};
use crate::{charging_module::ChargingModuleClient, error::InfraError};

pub struct ChargingModuleBillRunDeleter {
    client: Arc<dyn ChargingModuleClient>,
}

impl ChargingModuleBillRunDeleter {
    pub fn new(client: Arc<dyn ChargingModuleClient>) -> Self {
        Self { client }
    }

    async fn delete_remote(&self, bill_run: &BillRun) -> Result<(), InfraError> {
        let external_id = bill_run.external_id().ok_or_else(|| {
            InfraError::invalid_input(format!("bill run {} has no external id", bill_run.id()))
        })?;

        let result = self.client.delete_bill_run(external_id).await?;
        if !result.succeeded {
            return Err(result.into_error("delete bill run"));
        }
        Ok(())
    }
}

#[async_trait]
impl BillRunDeleter for ChargingModuleBillRunDeleter {
    fn name(&self) -> &'static str {
        "charging_module:bill_run"
    }

    #[tracing::instrument(skip_all, fields(bill_run_id = %bill_run.id()))]
    async fn delete(&self, bill_run: &BillRun) -> Result<DeletionResult, DeletionError> {
        self.delete_remote(bill_run)
            .await
            .map_err(|source| DeletionError {
                deleter: self.name(),
                bill_run_id: *bill_run.id(),
                source,
            })?;

        Ok(DeletionResult { deleted_count: 1 })
    }
}

#[cfg(test)]
mod tests {
    use abstraction_billing_domain::bill_run::{BillRunId, BillRunStatus, ExternalId};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{InfraErrorKind, mock::MockChargingModuleClient};

    #[tokio::test]
    async fn test_delete_requests_remote_delete_by_external_id() {
        let client = Arc::new(MockChargingModuleClient::succeeding());
        let external_id = ExternalId::new();
        let bill_run = BillRun::new(BillRunId::new(), Some(external_id), BillRunStatus::Cancel);
        let sut = ChargingModuleBillRunDeleter::new(client.clone());

        let result = sut.delete(&bill_run).await.unwrap();

        assert_eq!(result.deleted_count, 1);
        assert_eq!(client.deleted(), vec![external_id]);
    }

    #[tokio::test]
    async fn test_remote_failure_is_a_deletion_error() {
        let client = Arc::new(MockChargingModuleClient::failing(500));
        let bill_run = BillRun::new(BillRunId::new(), Some(ExternalId::new()), BillRunStatus::Cancel);
        let sut = ChargingModuleBillRunDeleter::new(client);

        let err = sut.delete(&bill_run).await.unwrap_err();

        assert_eq!(err.deleter, "charging_module:bill_run");
        assert!(matches!(err.source.kind(), InfraErrorKind::ExternalService(_)));
    }

    #[tokio::test]
    async fn test_missing_external_id_fails_without_calling_the_charging_module() {
        let client = Arc::new(MockChargingModuleClient::succeeding());
        let bill_run = BillRun::new(BillRunId::new(), None, BillRunStatus::Cancel);
        let sut = ChargingModuleBillRunDeleter::new(client.clone());

        let err = sut.delete(&bill_run).await.unwrap_err();

        assert!(matches!(err.source.kind(), InfraErrorKind::InvalidInput(_)));
        assert!(client.deleted().is_empty());
    }
}

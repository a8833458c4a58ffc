//! # DeletionRegistry
//!
//! Holds every [`BillRunDeleter`] and runs them together for one bill run.

use std::{collections::HashMap, sync::Arc};

use abstraction_billing_domain::bill_run::BillRun;
use futures::future::join_all;

use super::{
    BillRunDeleter,
    BillingRecordsDeleter,
    ChargingModuleBillRunDeleter,
    DeletionReport,
    ReviewDataDeleter,
};
use crate::{
    charging_module::ChargingModuleClient,
    repository::{BillingRecordsRepository, ReviewDataRepository},
};

/// Bill run deletion registry
pub struct DeletionRegistry {
    deleters: Vec<Box<dyn BillRunDeleter>>,
}

impl Default for DeletionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeletionRegistry {
    pub fn new() -> Self {
        Self {
            deleters: Vec::new(),
        }
    }

    pub fn register(&mut self, deleter: Box<dyn BillRunDeleter>) {
        self.deleters.push(deleter);
    }

    /// Registry with the remote delete and both local cascades
    ///
    /// The three share no rows, so no order is implied between them.
    pub fn with_all_deleters(
        charging_module: Arc<dyn ChargingModuleClient>,
        review_data: Arc<dyn ReviewDataRepository>,
        billing_records: Arc<dyn BillingRecordsRepository>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ChargingModuleBillRunDeleter::new(charging_module)));
        registry.register(Box::new(ReviewDataDeleter::new(review_data)));
        registry.register(Box::new(BillingRecordsDeleter::new(billing_records)));
        registry
    }

    /// Deleter names [`with_all_deleters`](Self::with_all_deleters) registers
    pub fn expected_deleter_names() -> Vec<&'static str> {
        vec![
            "charging_module:bill_run",
            "postgres:review_data",
            "postgres:billing_records",
        ]
    }

    pub fn registered_names(&self) -> Vec<&'static str> {
        self.deleters.iter().map(|d| d.name()).collect()
    }

    /// Runs every deleter concurrently and waits for all of them to settle
    ///
    /// A failing deleter neither cancels nor skips the others.
    pub async fn delete_all(&self, bill_run: &BillRun) -> DeletionReport {
        let outcomes = join_all(self.deleters.iter().map(|d| d.delete(bill_run))).await;

        let mut succeeded = HashMap::new();
        let mut failed = Vec::new();

        for (deleter, outcome) in self.deleters.iter().zip(outcomes) {
            match outcome {
                Ok(result) => {
                    succeeded.insert(deleter.name(), result);
                }
                Err(error) => {
                    tracing::warn!(
                        deleter = deleter.name(),
                        error = %error,
                        "bill run deleter failed"
                    );
                    failed.push(error);
                }
            }
        }

        DeletionReport { succeeded, failed }
    }
}

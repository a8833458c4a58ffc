//! # Bill run deletion
//!
//! Destroying a bill run touches three independent places:
//!
//! - the charging module's mirror of the bill run (remote)
//! - the two-part-tariff review staging data (local)
//! - the finalized billing records, ending with the bill run row (local)
//!
//! Each is a [`BillRunDeleter`]. The [`DeletionRegistry`] runs them side by side
//! and waits for every one to settle, collecting a [`DeletionReport`].
//!
//! The schema has no `ON DELETE CASCADE`; the local deleters remove rows leaves
//! first and fail on the first statement that errors.

mod billing_records;
mod charging_module;
mod registry;
mod review_data;

use std::collections::HashMap;

use abstraction_billing_domain::bill_run::{BillRun, BillRunId};
use async_trait::async_trait;
pub use billing_records::BillingRecordsDeleter;
pub use charging_module::ChargingModuleBillRunDeleter;
pub use registry::DeletionRegistry;
pub use review_data::ReviewDataDeleter;
use thiserror::Error;

use crate::error::InfraError;

/// Outcome of a successful deleter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionResult {
    /// Rows (or remote records) removed
    pub deleted_count: u64,
}

/// A deleter that failed, and why
#[derive(Debug, Error)]
#[error("{deleter} failed for bill run {bill_run_id}: {source}")]
pub struct DeletionError {
    pub deleter:     &'static str,
    pub bill_run_id: BillRunId,
    #[source]
    pub source:      InfraError,
}

/// Outcome of running every registered deleter
///
/// Deleters that failed do not stop the others; successes and failures are
/// reported separately. `failed` keeps registration order.
#[derive(Debug)]
pub struct DeletionReport {
    pub succeeded: HashMap<&'static str, DeletionResult>,
    pub failed:    Vec<DeletionError>,
}

impl DeletionReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Failure of the earliest registered deleter that failed
    pub fn first_failure(&self) -> Option<&DeletionError> {
        self.failed.first()
    }

    /// Total rows removed by the deleters that succeeded
    pub fn deleted_count(&self) -> u64 {
        self.succeeded.values().map(|r| r.deleted_count).sum()
    }
}

/// One branch of a bill run deletion
#[async_trait]
pub trait BillRunDeleter: Send + Sync {
    /// Name of this deleter (e.g. `"postgres:billing_records"`)
    fn name(&self) -> &'static str;

    async fn delete(&self, bill_run: &BillRun) -> Result<DeletionResult, DeletionError>;
}

//! # Bill run deletion orchestrator
//!
//! Removes every trace of a cancelled bill run: the charging module's mirror,
//! the review staging data and the billing records. The outcome is reported
//! through the [`Notifier`] only; callers never see an error.
//!
//! ```text
//! execute(bill_run)
//!   ├── charging_module:bill_run   ┐
//!   ├── postgres:review_data       ├ settle all
//!   └── postgres:billing_records   ┘
//!          ↓
//!   "Bill run deletion complete" (info) | "Bill run deletion failed" (error)
//! ```

use std::{panic::AssertUnwindSafe, sync::Arc, time::Instant};

use abstraction_billing_domain::bill_run::BillRun;
use abstraction_billing_infra::{Notifier, deletion::DeletionRegistry};
use futures::FutureExt;
use serde_json::json;
use tokio::task::JoinHandle;

pub struct DeleteBillRunUseCase {
    registry: DeletionRegistry,
    notifier: Arc<dyn Notifier>,
}

/// Error handed to the notifier when a spawned deletion panics
#[derive(Debug, thiserror::Error)]
#[error("bill run deletion panicked: {0}")]
struct DeletionPanicked(String);

impl DeleteBillRunUseCase {
    pub fn new(registry: DeletionRegistry, notifier: Arc<dyn Notifier>) -> Self {
        Self { registry, notifier }
    }

    /// Deletes the bill run and logs the outcome
    ///
    /// Waits for every deleter to settle, so a failed remote delete still lets
    /// the local records go.
    #[tracing::instrument(skip_all, fields(bill_run_id = %bill_run.id()))]
    pub async fn execute(&self, bill_run: &BillRun) {
        let started = Instant::now();

        let report = self.registry.delete_all(bill_run).await;

        match report.first_failure() {
            None => {
                let elapsed = started.elapsed();
                self.notifier.info(
                    "Bill run deletion complete",
                    json!({
                        "bill_run": bill_run,
                        "deleted_count": report.deleted_count(),
                        "time_taken_ms": u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                        "time_taken_s": elapsed.as_secs(),
                    }),
                );
            }
            Some(first) => {
                let failed: Vec<_> = report.failed.iter().map(|e| e.deleter).collect();
                self.notifier.error(
                    "Bill run deletion failed",
                    json!({
                        "bill_run": bill_run,
                        "failed_deleters": failed,
                    }),
                    first,
                );
            }
        }
    }

    /// Starts the deletion on a detached task
    ///
    /// The caller may drop the handle. A panic inside the deletion is caught
    /// and logged instead of being left to the runtime.
    pub fn spawn(self: Arc<Self>, bill_run: BillRun) -> JoinHandle<()> {
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(self.execute(&bill_run))
                .catch_unwind()
                .await;

            if let Err(panic) = outcome {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                self.notifier.error(
                    "Bill run deletion failed",
                    json!({ "bill_run": bill_run }),
                    &DeletionPanicked(message),
                );
            }
        })
    }
}

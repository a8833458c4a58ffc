//! # Use case layer
//!
//! Business flows of the billing service. Repositories and clients are
//! injected as `Arc<dyn Trait>`; handlers stay thin and delegate here.

pub mod bill_run;
pub mod delete_bill_run;

pub use bill_run::{BillRunUseCaseImpl, CancelledBillRun, RemovedReviewLicence};
pub use delete_bill_run::DeleteBillRunUseCase;

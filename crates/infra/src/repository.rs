//! # Repositories
//!
//! PostgreSQL data access. Each repository is a trait with a `Postgres...`
//! implementation, so use cases and the cascade deletes can be tested against
//! the in-memory store in [`crate::mock`].
//!
//! Queries are built at runtime with `sqlx::query` and explicit `USING` joins:
//! the rows removed by a cascade step are usually owned by the bill run through
//! one to three intermediate tables.

pub mod bill_run_repository;
pub mod billing_records_repository;
pub mod review_data_repository;

pub use bill_run_repository::{BillRunRepository, PostgresBillRunRepository};
pub use billing_records_repository::{BillingRecordsRepository, PostgresBillingRecordsRepository};
pub use review_data_repository::{PostgresReviewDataRepository, ReviewDataRepository};

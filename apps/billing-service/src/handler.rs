//! # HTTP handlers
//!
//! One submodule per resource, re-exported here for the router.

pub mod address;
pub mod bill_run;
pub mod health;

pub use address::{AddressState, lookup_address};
pub use bill_run::{BillRunState, cancel_bill_run, remove_review_licence};
pub use health::health_check;

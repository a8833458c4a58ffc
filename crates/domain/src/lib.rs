//! # Domain layer
//!
//! Bill run model for two-part-tariff review and cleanup.
//!
//! ## Dependency direction
//!
//! ```text
//! billing-service → infra → domain
//!                      ↘      ↓
//!                        shared
//! ```
//!
//! The domain layer knows nothing about the database or external services.
//!
//! ## Modules
//!
//! - [`bill_run`] - bill run identity, status and lifecycle
//! - [`licence`] - licence identifier
//! - [`review`] - scope of two-part-tariff review staging data
//! - [`error`] - domain errors

#[macro_use]
mod macros;

pub mod bill_run;
pub mod error;
pub mod licence;
pub mod review;

pub use error::DomainError;

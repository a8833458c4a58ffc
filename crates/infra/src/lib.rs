//! # Infrastructure layer
//!
//! Everything that talks to the outside world: PostgreSQL, the charging
//! module, the address facade and the logging sink.
//!
//! ## Modules
//!
//! - [`db`] - PostgreSQL pool and migrations
//! - [`request`] - retrying outbound HTTP request client
//! - [`charging_module`] - charging module API client and access tokens
//! - [`address_facade`] - address lookup client
//! - [`repository`] - bill run, review data and billing records repositories
//! - [`deletion`] - bill run cascade deletes and the deletion registry
//! - [`notifier`] - info/error logging collaborator
//! - [`error`] - infrastructure errors
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use abstraction_billing_infra::{
//!     db,
//!     notifier::TracingNotifier,
//!     request::{RequestClient, RequestConfig},
//! };
//!
//! async fn setup() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::create_pool("postgres://localhost/billing").await?;
//!     let request = RequestClient::new(RequestConfig::default(), Arc::new(TracingNotifier))?;
//!     Ok(())
//! }
//! ```

pub mod address_facade;
pub mod charging_module;
pub mod db;
pub mod deletion;
pub mod error;
pub mod notifier;
pub mod repository;
pub mod request;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use error::{InfraError, InfraErrorKind};
pub use notifier::{Notifier, TracingNotifier};

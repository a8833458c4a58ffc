//! # Shared utilities
//!
//! Helpers used by every crate in the workspace.
//!
//! ## Guidelines
//!
//! - Depended on by `domain`, `infra` and the service app
//! - No business logic, only plain utilities
//! - Keep external dependencies to a minimum

pub mod error_response;
pub mod health;
pub mod observability;

pub use error_response::ErrorResponse;
pub use health::HealthResponse;

//! # Billing service library
//!
//! Use cases, handlers and the router of the billing service, exposed so the
//! integration tests can drive the router without a network listener.

pub mod app;
pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;

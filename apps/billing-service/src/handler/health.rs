//! # Health check
//!
//! `GET /health`, used by the load balancer and container health checks.

use abstraction_billing_shared::HealthResponse;
use axum::Json;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(env!("CARGO_PKG_VERSION")))
}

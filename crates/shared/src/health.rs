//! # Health check response

use serde::Serialize;

/// Body returned by `GET /health`
///
/// ```
/// use abstraction_billing_shared::HealthResponse;
///
/// let response = HealthResponse::healthy("0.1.0");
/// assert_eq!(response.status, "healthy");
/// ```
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `"healthy"` or `"unhealthy"`
    pub status:  String,
    /// Crate version from Cargo.toml
    pub version: String,
}

impl HealthResponse {
    pub fn healthy(version: impl Into<String>) -> Self {
        Self {
            status:  "healthy".to_string(),
            version: version.into(),
        }
    }
}

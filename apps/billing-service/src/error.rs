//! # Billing service errors
//!
//! Service errors and their conversion into RFC 9457 problem responses.

use abstraction_billing_domain::DomainError;
use abstraction_billing_infra::InfraError;
use abstraction_billing_shared::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors surfaced by the billing service handlers
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// The bill run is in a status that does not allow the operation, or a
    /// concurrent request changed it first
    #[error("conflict: {0}")]
    Conflict(String),

    /// An external service failed
    #[error("bad gateway: {0}")]
    BadGateway(String),

    #[error("infrastructure error: {0}")]
    Infra(#[from] InfraError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for ServiceError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation(message) => Self::BadRequest(message),
            e @ DomainError::NotFound { .. } => Self::NotFound(e.to_string()),
            e @ DomainError::InvalidStateTransition { .. } => Self::Conflict(e.to_string()),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = match &self {
            ServiceError::NotFound(message) => ErrorResponse::not_found(message),
            ServiceError::BadRequest(message) => ErrorResponse::bad_request(message),
            ServiceError::Conflict(message) => ErrorResponse::conflict(message),
            ServiceError::BadGateway(message) => {
                tracing::warn!("external service failure: {}", message);
                ErrorResponse::bad_gateway(message)
            }
            ServiceError::Infra(e) => {
                tracing::error!(span_trace = %e.span_trace(), "infrastructure error: {}", e);
                ErrorResponse::internal_error()
            }
            ServiceError::Internal(message) => {
                tracing::error!("internal error: {}", message);
                ErrorResponse::internal_error()
            }
        };

        let status = StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

//! # Infrastructure errors
//!
//! Errors raised while talking to PostgreSQL or an external service.
//!
//! ## Structure
//!
//! Same struct + enum split as `std::io::Error`:
//! - [`InfraError`]: wraps an [`InfraErrorKind`] together with the [`SpanTrace`]
//!   captured when the error was created
//! - [`InfraErrorKind`]: what went wrong (database, serialization, external
//!   service...)
//!
//! `From` impls and the convenience constructors capture the span trace, so a
//! cascade step that fails deep inside a deletion still reports which bill run
//! span it was running under.

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// Infrastructure error
///
/// Match on [`kind()`](InfraError::kind) to branch on the cause:
///
/// ```ignore
/// match error.kind() {
///     InfraErrorKind::ExternalService(message) => { /* remote failure */ }
///     _ => { /* everything else */ }
/// }
/// ```
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// Kind of infrastructure error
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// Query failure, connection failure, constraint violation...
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// JSON (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// An external service (charging module, token endpoint, address facade)
    /// answered with a failure or could not be reached
    #[error("external service error: {0}")]
    ExternalService(String),

    /// The caller supplied something unusable, e.g. a bill run without an
    /// external id
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Anything else
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl InfraError {
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    pub fn into_parts(self) -> (InfraErrorKind, SpanTrace) {
        (self.kind, self.span_trace)
    }

    // ===== Convenience constructors =====

    pub fn external_service(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::ExternalService(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::InvalidInput(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Unexpected(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

// ===== From impls (capture the span trace) =====

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        Self {
            kind:       InfraErrorKind::Database(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(source: serde_json::Error) -> Self {
        Self {
            kind:       InfraErrorKind::Serialization(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

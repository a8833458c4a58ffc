//! # Notifier
//!
//! Logging collaborator with two channels, injected into the request client and
//! the bill run deletion instead of being looked up from global state.
//!
//! - `info`: retry notices, failed HTTP responses, completion events
//! - `error`: transport errors and aggregated deletion failures
//!
//! Every call takes a short human readable event name and a JSON context. The
//! production implementation, [`TracingNotifier`], writes `tracing` events so
//! they share the subscriber (and JSON format) configured at startup.

use serde_json::Value;

/// Info/error logging sink
///
/// Implementations must never panic: the request client and the deletion
/// orchestrator call it on their failure paths.
pub trait Notifier: Send + Sync {
    fn info(&self, event: &str, context: Value);

    fn error(&self, event: &str, context: Value, error: &(dyn std::error::Error + 'static));
}

/// [`Notifier`] writing `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn info(&self, event: &str, context: Value) {
        tracing::info!(event, context = %context, "{event}");
    }

    fn error(&self, event: &str, context: Value, error: &(dyn std::error::Error + 'static)) {
        tracing::error!(event, context = %context, error = %error, "{event}");
    }
}

//! # Tracing setup
//!
//! One subscriber per process: an `EnvFilter`, a JSON or pretty formatter
//! picked by `LOG_FORMAT`, and the `tracing-error` `ErrorLayer` that lets
//! infrastructure errors capture a `SpanTrace` where they are created.

/// Filter used when `RUST_LOG` is unset
///
/// Keeps the service's own debug events and the HTTP layer's request spans,
/// and silences sqlx statement logging.
pub const DEFAULT_LOG_FILTER: &str = "info,abstraction_billing=debug,tower_http=debug,sqlx=warn";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON lines, one event per line
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// Parses `json` or `pretty`, ignoring case and surrounding whitespace
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Tracing settings of a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub service_name:        String,
    pub log_format:          LogFormat,
    /// `LOG_FORMAT` value that was not understood; reported once the
    /// subscriber is installed
    pub rejected_log_format: Option<String>,
}

impl TracingConfig {
    /// Reads `LOG_FORMAT` from the process environment
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::from_lookup(service_name, |name| std::env::var(name).ok())
    }

    /// Reads `LOG_FORMAT` through `lookup`; an unset, blank or unknown value
    /// selects pretty output
    pub fn from_lookup(
        service_name: impl Into<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let raw = lookup("LOG_FORMAT").filter(|value| !value.trim().is_empty());
        let log_format = raw.as_deref().and_then(LogFormat::parse);

        Self {
            service_name: service_name.into(),
            log_format: log_format.unwrap_or_default(),
            rejected_log_format: raw.filter(|_| log_format.is_none()),
        }
    }
}

/// Installs the global tracing subscriber
///
/// `RUST_LOG` sets the filter, [`DEFAULT_LOG_FILTER`] otherwise. JSON output
/// flattens event fields to the top level next to `timestamp`, `level`,
/// `target` and `message`, and carries the current span.
#[cfg(feature = "observability")]
pub fn init_tracing(config: &TracingConfig) {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();

    if let Some(value) = &config.rejected_log_format {
        tracing::warn!(log_format = %value, "unknown LOG_FORMAT, using pretty output");
    }
    tracing::debug!(
        service = %config.service_name,
        log_format = ?config.log_format,
        "tracing initialized"
    );
}

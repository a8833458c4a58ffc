//! Per-request options and the retry policy

use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};

use super::ErrorCode;

/// Methods supported by the request client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
}

/// Retry policy
///
/// Only transport errors whose code is listed in `error_codes` and responses
/// whose status is listed in `status_codes` are retried, and only for methods
/// in `methods`. The defaults retry timeouts alone, twice, so a failing
/// endpoint costs at most three attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Maximum number of retries after the first attempt
    pub limit:         u32,
    pub methods:       Vec<HttpMethod>,
    pub error_codes:   Vec<ErrorCode>,
    /// Empty by default: 4xx/5xx responses are returned, not retried
    pub status_codes:  Vec<u16>,
    /// Delay before the first retry; doubles on every further retry
    pub backoff_base:  Duration,
    /// Upper bound on any single delay
    pub backoff_limit: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            limit:         2,
            methods:       vec![
                HttpMethod::Get,
                HttpMethod::Post,
                HttpMethod::Patch,
                HttpMethod::Delete,
            ],
            error_codes:   vec![ErrorCode::Timeout],
            status_codes:  Vec::new(),
            backoff_base:  Duration::from_secs(1),
            backoff_limit: Duration::from_secs(5),
        }
    }
}

impl RetryOptions {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            limit: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based)
    ///
    /// `backoff_base * 2^(attempt - 1)`, capped at `backoff_limit`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.backoff_base
            .checked_mul(1u32 << exponent)
            .map_or(self.backoff_limit, |delay| delay.min(self.backoff_limit))
    }

    pub fn retries_error(&self, method: HttpMethod, code: ErrorCode) -> bool {
        self.methods.contains(&method) && self.error_codes.contains(&code)
    }

    pub fn retries_status(&self, method: HttpMethod, status_code: u16) -> bool {
        self.methods.contains(&method) && self.status_codes.contains(&status_code)
    }

    fn log_context(&self) -> Value {
        json!({
            "limit": self.limit,
            "methods": self.methods,
            "error_codes": self.error_codes,
            "status_codes": self.status_codes,
            "backoff_limit_ms": duration_ms(self.backoff_limit),
        })
    }
}

/// Overrides for a single request
///
/// Anything left unset falls back to the client's defaults.
///
/// ```
/// use std::time::Duration;
///
/// use abstraction_billing_infra::request::RequestOptions;
///
/// let options = RequestOptions::new()
///     .with_timeout(Duration::from_secs(30))
///     .with_header("accept", "application/json")
///     .with_json(serde_json::json!({ "region": "A" }));
/// assert_eq!(options.timeout, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub retry:   Option<RetryOptions>,
    pub headers: Vec<(String, String)>,
    pub body:    Option<RequestBody>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn with_form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    /// Options as written to failure logs
    ///
    /// Header values are left out (they carry bearer tokens and basic auth
    /// credentials), and so are form values.
    pub fn log_context(&self) -> Value {
        let header_names: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        let body = match &self.body {
            Some(RequestBody::Json(value)) => value.clone(),
            Some(RequestBody::Form(fields)) => {
                json!({ "form_fields": fields.iter().map(|(name, _)| name).collect::<Vec<_>>() })
            }
            None => Value::Null,
        };

        json!({
            "timeout_ms": self.timeout.map(duration_ms),
            "retry": self.retry.as_ref().map(RetryOptions::log_context),
            "headers": header_names,
            "body": body,
        })
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

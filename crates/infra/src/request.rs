//! # Outbound request client
//!
//! Single entry point for every outbound HTTP call. The charging module and
//! address facade clients are built on top of it.
//!
//! ## Behaviour
//!
//! - **Timeout**: applied per attempt (client default, overridable per request)
//! - **Retry**: transport errors matching the retry policy are retried with
//!   exponential backoff; HTTP error statuses are not retried by default
//! - **Result**: never an `Err`. A 2xx/3xx response is a success, anything else
//!   (error status or exhausted transport retries) is a failure carried in
//!   [`RequestResult`]
//! - **Logging**: each retry is announced on the notifier's info channel before
//!   it is issued. A final failure is reported once: error statuses on the info
//!   channel, transport errors on the error channel
//!
//! ```rust,ignore
//! let result = client.get("https://example.com/health", RequestOptions::new()).await;
//! if result.succeeded {
//!     let body = result.http().map(|response| response.body.as_str());
//! }
//! ```

mod error_code;
mod options;

use std::{collections::BTreeMap, sync::Arc, time::Duration};

pub use error_code::ErrorCode;
pub use options::{HttpMethod, RequestBody, RequestOptions, RetryOptions};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use thiserror::Error;

use crate::{error::InfraError, notifier::Notifier};

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Client wide settings
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-attempt timeout used when a request does not set its own
    pub timeout: Duration,
    /// Retry policy used when a request does not set its own
    pub retry:   RetryOptions,
    /// Forward proxy every request is sent through
    pub proxy:   Option<String>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry:   RetryOptions::default(),
            proxy:   None,
        }
    }
}

/// Response received from the remote server, successful or not
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers:     BTreeMap<String, String>,
    pub body:        String,
}

impl HttpResponse {
    /// Parses the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, InfraError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// The body as a JSON value: `null` when empty, a string when not JSON
    pub fn json_value(&self) -> Value {
        if self.body.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone()))
    }
}

/// Transport level failure (no response received)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{code}: {message}")]
pub struct RequestError {
    pub code:    ErrorCode,
    pub message: String,
}

impl RequestError {
    fn from_reqwest(err: &reqwest::Error) -> Self {
        Self {
            code:    ErrorCode::classify(err),
            message: err.to_string(),
        }
    }
}

/// What a request ended with
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestResponse {
    Http(HttpResponse),
    Error(RequestError),
}

/// Outcome of a request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestResult {
    /// `true` only for a 2xx/3xx response
    pub succeeded: bool,
    pub response:  RequestResponse,
}

impl RequestResult {
    fn from_http(response: HttpResponse) -> Self {
        let succeeded = (200..400).contains(&response.status_code);
        Self {
            succeeded,
            response: RequestResponse::Http(response),
        }
    }

    fn from_error(error: RequestError) -> Self {
        Self {
            succeeded: false,
            response:  RequestResponse::Error(error),
        }
    }

    pub fn http(&self) -> Option<&HttpResponse> {
        match &self.response {
            RequestResponse::Http(response) => Some(response),
            RequestResponse::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&RequestError> {
        match &self.response {
            RequestResponse::Http(_) => None,
            RequestResponse::Error(error) => Some(error),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.http().map(|response| response.status_code)
    }
}

/// Retrying outbound request client
///
/// Cheap to share: wrap it in an `Arc` and hand it to every higher-level client.
pub struct RequestClient {
    client:   reqwest::Client,
    timeout:  Duration,
    retry:    RetryOptions,
    notifier: Arc<dyn Notifier>,
}

impl RequestClient {
    /// Builds the client
    ///
    /// Fails only when the proxy URL is unusable.
    pub fn new(config: RequestConfig, notifier: Arc<dyn Notifier>) -> Result<Self, InfraError> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| InfraError::invalid_input(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| InfraError::unexpected(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout: config.timeout,
            retry: config.retry,
            notifier,
        })
    }

    pub async fn get(&self, url: &str, options: RequestOptions) -> RequestResult {
        self.send(HttpMethod::Get, url, options).await
    }

    pub async fn post(&self, url: &str, options: RequestOptions) -> RequestResult {
        self.send(HttpMethod::Post, url, options).await
    }

    pub async fn patch(&self, url: &str, options: RequestOptions) -> RequestResult {
        self.send(HttpMethod::Patch, url, options).await
    }

    pub async fn delete(&self, url: &str, options: RequestOptions) -> RequestResult {
        self.send(HttpMethod::Delete, url, options).await
    }

    /// Sends the request, retrying according to the policy
    #[tracing::instrument(skip_all, fields(%method, %url))]
    pub async fn send(&self, method: HttpMethod, url: &str, options: RequestOptions) -> RequestResult {
        let retry = options.retry.as_ref().unwrap_or(&self.retry);
        let timeout = options.timeout.unwrap_or(self.timeout);

        let mut attempt = 0;
        let result = loop {
            let result = self.attempt(method, url, &options, timeout).await;

            let retryable = match &result.response {
                RequestResponse::Error(error) => retry.retries_error(method, error.code),
                RequestResponse::Http(response) if !result.succeeded => {
                    retry.retries_status(method, response.status_code)
                }
                RequestResponse::Http(_) => false,
            };
            if !retryable || attempt >= retry.limit {
                break result;
            }

            attempt += 1;
            self.notifier.info(
                "Retrying HTTP request",
                json!({ "method": method, "url": url, "attempt": attempt }),
            );
            tokio::time::sleep(retry.delay_for(attempt)).await;
        };

        if !result.succeeded {
            self.log_failure(method, url, &options, &result);
        }

        result
    }

    async fn attempt(
        &self,
        method: HttpMethod,
        url: &str,
        options: &RequestOptions,
        timeout: Duration,
    ) -> RequestResult {
        let mut builder = self.client.request(method.into(), url).timeout(timeout);
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &options.body {
            Some(RequestBody::Json(body)) => builder.json(body),
            Some(RequestBody::Form(fields)) => builder.form(fields),
            None => builder,
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => return RequestResult::from_error(RequestError::from_reqwest(&err)),
        };

        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        match response.text().await {
            Ok(body) => RequestResult::from_http(HttpResponse {
                status_code,
                headers,
                body,
            }),
            Err(err) => RequestResult::from_error(RequestError::from_reqwest(&err)),
        }
    }

    fn log_failure(
        &self,
        method: HttpMethod,
        url: &str,
        options: &RequestOptions,
        result: &RequestResult,
    ) {
        let context = json!({
            "method": method,
            "url": url,
            "additional_options": options.log_context(),
            "result": result,
        });

        match &result.response {
            RequestResponse::Http(_) => self.notifier.info("Http request failed", context),
            RequestResponse::Error(error) => {
                self.notifier.error("Http request errored", context, error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use wiremock::{
        Mock,
        MockServer,
        ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    use super::*;
    use crate::mock::RecordingNotifier;

    fn fast_retry() -> RetryOptions {
        RetryOptions {
            backoff_base: Duration::from_millis(10),
            backoff_limit: Duration::from_millis(20),
            ..RetryOptions::default()
        }
    }

    fn client(notifier: &Arc<RecordingNotifier>) -> RequestClient {
        let config = RequestConfig {
            timeout: Duration::from_millis(200),
            retry:   fast_retry(),
            proxy:   None,
        };
        RequestClient::new(config, notifier.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_get_success_returns_status_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-request-id", "abc")
                    .set_body_string(r#"{"ok":true}"#),
            )
            .expect(1)
            .mount(&server)
            .await;
        let notifier = Arc::new(RecordingNotifier::new());

        let result = client(&notifier)
            .get(&format!("{}/status", server.uri()), RequestOptions::new())
            .await;

        assert!(result.succeeded);
        let response = result.http().unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, r#"{"ok":true}"#);
        assert_eq!(response.headers.get("x-request-id").map(String::as_str), Some("abc"));
        assert_eq!(response.json_value(), json!({ "ok": true }));
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_http_500_is_not_retried_and_body_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(1)
            .mount(&server)
            .await;
        let notifier = Arc::new(RecordingNotifier::new());

        let result = client(&notifier)
            .get(&format!("{}/broken", server.uri()), RequestOptions::new())
            .await;

        assert!(!result.succeeded);
        assert_eq!(result.status_code(), Some(500));
        assert_eq!(result.http().unwrap().body, "upstream exploded");
        assert_eq!(notifier.count("Retrying HTTP request"), 0);
        assert_eq!(notifier.count("Http request failed"), 1);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_timeout_is_retried_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow-then-fast"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/slow-then-fast"))
            .respond_with(ResponseTemplate::new(200).set_body_string("second attempt"))
            .with_priority(2)
            .mount(&server)
            .await;
        let notifier = Arc::new(RecordingNotifier::new());

        let result = client(&notifier)
            .get(&format!("{}/slow-then-fast", server.uri()), RequestOptions::new())
            .await;

        assert!(result.succeeded);
        assert_eq!(result.http().unwrap().body, "second attempt");
        assert_eq!(notifier.count("Retrying HTTP request"), 1);
        let retry = notifier.first("Retrying HTTP request").unwrap();
        assert_eq!(retry.context["attempt"], json!(1));
        assert_eq!(retry.context["method"], json!("GET"));
        assert_eq!(notifier.count("Http request errored"), 0);
    }

    #[tokio::test]
    async fn test_exhausted_timeouts_return_error_result() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;
        let notifier = Arc::new(RecordingNotifier::new());

        let result = client(&notifier)
            .delete(&format!("{}/bill-runs/1", server.uri()), RequestOptions::new())
            .await;

        assert!(!result.succeeded);
        assert_eq!(result.error().unwrap().code, ErrorCode::Timeout);
        assert_eq!(notifier.count("Retrying HTTP request"), 2);
        assert_eq!(notifier.count("Http request errored"), 1);
        let errored = notifier.first("Http request errored").unwrap();
        assert_eq!(errored.context["method"], json!("DELETE"));
        assert_eq!(errored.context["result"]["succeeded"], json!(false));
        assert_eq!(errored.context["result"]["response"]["code"], json!("ETIMEDOUT"));
        assert!(errored.error.is_some());
    }

    #[tokio::test]
    async fn test_retry_limit_override_disables_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .expect(1)
            .mount(&server)
            .await;
        let notifier = Arc::new(RecordingNotifier::new());

        let result = client(&notifier)
            .get(
                &server.uri(),
                RequestOptions::new().with_retry(RetryOptions::none()),
            )
            .await;

        assert!(!result.succeeded);
        assert_eq!(notifier.count("Retrying HTTP request"), 0);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_configured_status_codes_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
            .with_priority(2)
            .mount(&server)
            .await;
        let notifier = Arc::new(RecordingNotifier::new());
        let retry = RetryOptions {
            status_codes: vec![503],
            ..fast_retry()
        };

        let result = client(&notifier)
            .get(&server.uri(), RequestOptions::new().with_retry(retry))
            .await;

        assert!(result.succeeded);
        assert_eq!(result.http().unwrap().body, "recovered");
        assert_eq!(notifier.count("Retrying HTTP request"), 1);
    }

    #[tokio::test]
    async fn test_post_sends_json_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calculate"))
            .and(header("authorization", "Bearer token"))
            .and(body_json(json!({ "volume": 12 })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "charge": 100 })))
            .expect(1)
            .mount(&server)
            .await;
        let notifier = Arc::new(RecordingNotifier::new());

        let result = client(&notifier)
            .post(
                &format!("{}/calculate", server.uri()),
                RequestOptions::new()
                    .with_header("authorization", "Bearer token")
                    .with_json(json!({ "volume": 12 })),
            )
            .await;

        assert!(result.succeeded);
        let body: Value = result.http().unwrap().json().unwrap();
        assert_eq!(body, json!({ "charge": 100 }));
    }

    #[tokio::test]
    async fn test_patch_failure_is_logged_without_header_values() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid"))
            .mount(&server)
            .await;
        let notifier = Arc::new(RecordingNotifier::new());

        let result = client(&notifier)
            .patch(
                &server.uri(),
                RequestOptions::new().with_header("authorization", "Bearer hidden"),
            )
            .await;

        assert!(!result.succeeded);
        let failed = notifier.first("Http request failed").unwrap();
        assert_eq!(failed.context["result"]["response"]["status_code"], json!(422));
        assert_eq!(
            failed.context["additional_options"]["headers"],
            json!(["authorization"])
        );
        assert!(!failed.context.to_string().contains("hidden"));
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let config = RequestConfig {
            proxy: Some("not a url".to_string()),
            ..RequestConfig::default()
        };

        let result = RequestClient::new(config, Arc::new(RecordingNotifier::new()));

        assert!(result.is_err());
    }

    #[test]
    fn test_redirect_status_counts_as_success() {
        let result = RequestResult::from_http(HttpResponse {
            status_code: 304,
            headers:     BTreeMap::new(),
            body:        String::new(),
        });

        assert!(result.succeeded);
        assert_eq!(result.http().unwrap().json_value(), Value::Null);
    }
}

//! # Charging module client
//!
//! The charging module is the external system that mirrors bill runs and
//! calculates charges. Only three of its endpoints are used here:
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | [`delete_bill_run`](ChargingModuleClient::delete_bill_run) | `DELETE /v3/wrls/bill-runs/{externalId}` |
//! | [`view_bill_run`](ChargingModuleClient::view_bill_run) | `GET /v3/wrls/bill-runs/{externalId}` |
//! | [`calculate_charge`](ChargingModuleClient::calculate_charge) | `POST /v3/wrls/calculate-charge` |
//!
//! Every call goes through the shared [`RequestClient`] with a bearer token
//! from a [`TokenProvider`]. Results are normalized into
//! [`ChargingModuleResult`]; nothing here returns an error for a failed call
//! except when no token can be obtained.

mod token;

use std::{sync::Arc, time::Duration};

use abstraction_billing_domain::bill_run::ExternalId;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
pub use token::{
    ClientCredentials,
    ClientCredentialsTokenProvider,
    StaticTokenProvider,
    TokenProvider,
};

use crate::{
    error::InfraError,
    request::{RequestClient, RequestOptions, RequestResponse, RequestResult},
};

/// Timeout for payload-heavy calls such as charge calculation
pub const DEFAULT_LONG_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Normalized charging module response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargingModuleResult {
    pub succeeded:   bool,
    /// `None` when no response was received
    pub status_code: Option<u16>,
    /// Parsed JSON body, or `{ "code", "message" }` for a transport error
    pub body:        Value,
}

impl From<RequestResult> for ChargingModuleResult {
    fn from(result: RequestResult) -> Self {
        match result.response {
            RequestResponse::Http(response) => Self {
                succeeded:   result.succeeded,
                status_code: Some(response.status_code),
                body:        response.json_value(),
            },
            RequestResponse::Error(error) => Self {
                succeeded:   false,
                status_code: None,
                body:        json!({ "code": error.code, "message": error.message }),
            },
        }
    }
}

impl ChargingModuleResult {
    /// Turns a failed result into an [`InfraError`] naming the operation
    pub fn into_error(self, operation: &str) -> InfraError {
        match self.status_code {
            Some(status_code) => InfraError::external_service(format!(
                "charging module {operation} responded {status_code}: {}",
                self.body
            )),
            None => InfraError::external_service(format!(
                "charging module {operation} errored: {}",
                self.body
            )),
        }
    }
}

/// Charging module operations
#[async_trait]
pub trait ChargingModuleClient: Send + Sync {
    /// Deletes the charging module's mirror of a bill run
    async fn delete_bill_run(
        &self,
        external_id: &ExternalId,
    ) -> Result<ChargingModuleResult, InfraError>;

    async fn view_bill_run(
        &self,
        external_id: &ExternalId,
    ) -> Result<ChargingModuleResult, InfraError>;

    /// Calculates a charge; the payload is passed through unchanged
    async fn calculate_charge(&self, payload: Value) -> Result<ChargingModuleResult, InfraError>;
}

/// Charging module client over HTTP
pub struct ChargingModuleClientImpl {
    base_url:     String,
    request:      Arc<RequestClient>,
    tokens:       Arc<dyn TokenProvider>,
    long_timeout: Duration,
}

impl ChargingModuleClientImpl {
    pub fn new(
        base_url: &str,
        request: Arc<RequestClient>,
        tokens: Arc<dyn TokenProvider>,
        long_timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request,
            tokens,
            long_timeout,
        }
    }

    fn bill_run_url(&self, external_id: &ExternalId) -> String {
        format!("{}/v3/wrls/bill-runs/{}", self.base_url, external_id)
    }

    async fn authorized(&self) -> Result<RequestOptions, InfraError> {
        let token = self.tokens.access_token().await?;
        Ok(RequestOptions::new()
            .with_header("authorization", format!("Bearer {token}"))
            .with_header("accept", "application/json"))
    }
}

#[async_trait]
impl ChargingModuleClient for ChargingModuleClientImpl {
    #[tracing::instrument(skip_all, fields(%external_id))]
    async fn delete_bill_run(
        &self,
        external_id: &ExternalId,
    ) -> Result<ChargingModuleResult, InfraError> {
        let options = self.authorized().await?;
        let result = self
            .request
            .delete(&self.bill_run_url(external_id), options)
            .await;
        Ok(result.into())
    }

    #[tracing::instrument(skip_all, fields(%external_id))]
    async fn view_bill_run(
        &self,
        external_id: &ExternalId,
    ) -> Result<ChargingModuleResult, InfraError> {
        let options = self.authorized().await?;
        let result = self.request.get(&self.bill_run_url(external_id), options).await;
        Ok(result.into())
    }

    #[tracing::instrument(skip_all)]
    async fn calculate_charge(&self, payload: Value) -> Result<ChargingModuleResult, InfraError> {
        let options = self
            .authorized()
            .await?
            .with_timeout(self.long_timeout)
            .with_json(payload);
        let url = format!("{}/v3/wrls/calculate-charge", self.base_url);
        let result = self.request.post(&url, options).await;
        Ok(result.into())
    }
}

//! Charging module access tokens
//!
//! The charging module accepts OAuth2 bearer tokens issued through the client
//! credentials grant. Tokens are cached and refreshed shortly before expiry.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{
    error::InfraError,
    request::{RequestClient, RequestOptions},
};

/// Tokens are refreshed this long before they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Longest a token is kept, whatever `expires_in` the identity provider sends
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Source of bearer tokens for the charging module
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, InfraError>;
}

/// Fixed token, for local development and tests
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, InfraError> {
        Ok(self.token.clone())
    }
}

/// Client credentials issued for the charging module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// Base URL of the identity provider; `/oauth2/token` is appended
    pub token_url:     String,
    pub client_id:     String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in:   u64,
}

struct CachedToken {
    value:      String,
    refresh_at: Instant,
}

/// Token provider using the OAuth2 client credentials grant
pub struct ClientCredentialsTokenProvider {
    request:     Arc<RequestClient>,
    credentials: ClientCredentials,
    cached:      Mutex<Option<CachedToken>>,
}

impl ClientCredentialsTokenProvider {
    pub fn new(request: Arc<RequestClient>, credentials: ClientCredentials) -> Self {
        Self {
            request,
            credentials,
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<TokenResponse, InfraError> {
        let basic = STANDARD.encode(format!(
            "{}:{}",
            self.credentials.client_id, self.credentials.client_secret
        ));
        let url = format!(
            "{}/oauth2/token",
            self.credentials.token_url.trim_end_matches('/')
        );
        let options = RequestOptions::new()
            .with_header("authorization", format!("Basic {basic}"))
            .with_form(vec![(
                "grant_type".to_string(),
                "client_credentials".to_string(),
            )]);

        let result = self.request.post(&url, options).await;
        match result.http() {
            Some(response) if result.succeeded => response.json(),
            Some(response) => Err(InfraError::external_service(format!(
                "token endpoint responded {}",
                response.status_code
            ))),
            None => Err(InfraError::external_service(format!(
                "token endpoint unreachable: {}",
                result
                    .error()
                    .map_or_else(|| "unknown error".to_string(), ToString::to_string)
            ))),
        }
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsTokenProvider {
    async fn access_token(&self) -> Result<String, InfraError> {
        // Held across the fetch so concurrent callers share one token request
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|token| Instant::now() < token.refresh_at) {
            return Ok(token.value.clone());
        }

        let response = self.fetch().await?;
        let lifetime = Duration::from_secs(response.expires_in)
            .min(MAX_TOKEN_LIFETIME)
            .saturating_sub(EXPIRY_MARGIN);
        tracing::debug!(expires_in = response.expires_in, "charging module token refreshed");

        // Without a representable refresh time the token is fetched again next call
        *cached = Instant::now()
            .checked_add(lifetime)
            .map(|refresh_at| CachedToken {
                value: response.access_token.clone(),
                refresh_at,
            });

        Ok(response.access_token)
    }
}

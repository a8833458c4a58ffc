//! # Billing service configuration
//!
//! Reads the service settings from environment variables. `main` loads `.env`
//! first, so local development can keep them in a file.

use std::{env, num::ParseIntError, time::Duration};

use abstraction_billing_infra::charging_module::ClientCredentials;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;
const DEFAULT_LONG_REQUEST_TIMEOUT_MS: u64 = 30000;
const DEFAULT_ADDRESS_FACADE_TIMEOUT_MS: u64 = 3000;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} is not a valid number: {source}")]
    InvalidNumber {
        name:   &'static str,
        #[source]
        source: ParseIntError,
    },
}

/// How the service authenticates against the charging module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargingModuleAuth {
    /// OAuth2 client credentials exchanged for short-lived tokens
    ClientCredentials(ClientCredentials),
    /// Fixed bearer token (local development, stubs)
    Static(String),
}

/// Billing service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Bind address
    pub host: String,
    /// Port
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Charging module API base URL
    pub charging_module_url: String,
    pub charging_module_auth: ChargingModuleAuth,
    /// Address facade base URL
    pub address_facade_url: String,
    /// Per-attempt timeout of postcode lookups
    pub address_facade_timeout: Duration,
    /// Default per-attempt timeout of outbound requests
    pub request_timeout: Duration,
    /// Timeout of payload-heavy charging module calls
    pub long_request_timeout: Duration,
    /// Forward proxy for every outbound request
    pub http_proxy: Option<String>,
}

impl ServiceConfig {
    /// Reads the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of a
    /// variable or `None` when it is unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));
        let number = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            get(name).map_or(Ok(default), |value| {
                value
                    .trim()
                    .parse()
                    .map_err(|source| ConfigError::InvalidNumber { name, source })
            })
        };

        let port = required("SERVICE_PORT")?
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidNumber {
                name: "SERVICE_PORT",
                source,
            })?;

        let charging_module_auth = match (
            get("CHARGING_MODULE_TOKEN_URL"),
            get("CHARGING_MODULE_CLIENT_ID"),
            get("CHARGING_MODULE_CLIENT_SECRET"),
        ) {
            (Some(token_url), Some(client_id), Some(client_secret)) => {
                ChargingModuleAuth::ClientCredentials(ClientCredentials {
                    token_url,
                    client_id,
                    client_secret,
                })
            }
            _ => ChargingModuleAuth::Static(required("CHARGING_MODULE_TOKEN")?),
        };

        Ok(Self {
            host: get("SERVICE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            database_url: required("DATABASE_URL")?,
            charging_module_url: required("CHARGING_MODULE_URL")?,
            charging_module_auth,
            address_facade_url: required("ADDRESS_FACADE_URL")?,
            address_facade_timeout: Duration::from_millis(number(
                "ADDRESS_FACADE_TIMEOUT_MS",
                DEFAULT_ADDRESS_FACADE_TIMEOUT_MS,
            )?),
            request_timeout: Duration::from_millis(number(
                "REQUEST_TIMEOUT_MS",
                DEFAULT_REQUEST_TIMEOUT_MS,
            )?),
            long_request_timeout: Duration::from_millis(number(
                "LONG_REQUEST_TIMEOUT_MS",
                DEFAULT_LONG_REQUEST_TIMEOUT_MS,
            )?),
            http_proxy: get("HTTP_PROXY").or_else(|| get("http_proxy")),
        })
    }
}

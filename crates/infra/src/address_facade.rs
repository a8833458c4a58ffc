//! # Address facade client
//!
//! Postcode lookups against the address facade
//! (`GET /address-service/v1/addresses/postcode`).

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::request::{RequestClient, RequestOptions};

/// Address as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub uprn:           Option<u64>,
    pub address:        String,
    pub organisation:   String,
    pub premises:       String,
    pub street_address: String,
    pub locality:       String,
    pub city:           String,
    pub postcode:       String,
    pub country:        String,
}

/// Outcome of a postcode lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressLookup {
    pub succeeded: bool,
    pub addresses: Vec<Address>,
}

impl AddressLookup {
    fn failed() -> Self {
        Self {
            succeeded: false,
            addresses: Vec::new(),
        }
    }
}

/// Address facade operations
#[async_trait]
pub trait AddressFacadeClient: Send + Sync {
    async fn lookup_postcode(&self, postcode: &str) -> AddressLookup;
}

#[derive(Debug, Deserialize)]
struct LookupBody {
    #[serde(default)]
    results: Vec<FacadeAddress>,
}

/// Raw result entry; any field may be missing or null
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FacadeAddress {
    uprn:           Option<u64>,
    address:        Option<String>,
    organisation:   Option<String>,
    premises:       Option<String>,
    street_address: Option<String>,
    locality:       Option<String>,
    city:           Option<String>,
    postcode:       Option<String>,
    country:        Option<String>,
}

impl From<FacadeAddress> for Address {
    fn from(raw: FacadeAddress) -> Self {
        Self {
            uprn:           raw.uprn,
            address:        raw.address.unwrap_or_default(),
            organisation:   raw.organisation.unwrap_or_default(),
            premises:       raw.premises.unwrap_or_default(),
            street_address: raw.street_address.unwrap_or_default(),
            locality:       raw.locality.unwrap_or_default(),
            city:           raw.city.unwrap_or_default(),
            postcode:       raw.postcode.unwrap_or_default(),
            country:        raw.country.unwrap_or_default(),
        }
    }
}

/// Address facade client over HTTP
pub struct AddressFacadeClientImpl {
    base_url: String,
    request:  Arc<RequestClient>,
    /// Per-attempt timeout of a lookup, kept short since a user is waiting
    timeout:  Duration,
}

impl AddressFacadeClientImpl {
    pub fn new(base_url: &str, request: Arc<RequestClient>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request,
            timeout,
        }
    }
}

#[async_trait]
impl AddressFacadeClient for AddressFacadeClientImpl {
    #[tracing::instrument(skip(self))]
    async fn lookup_postcode(&self, postcode: &str) -> AddressLookup {
        let url = format!(
            "{}/address-service/v1/addresses/postcode?query-string={}&key=client1",
            self.base_url,
            urlencoding::encode(postcode.trim())
        );

        let result = self
            .request
            .get(&url, RequestOptions::new().with_timeout(self.timeout))
            .await;
        let Some(response) = result.http().filter(|_| result.succeeded) else {
            return AddressLookup::failed();
        };

        match response.json::<LookupBody>() {
            Ok(body) => AddressLookup {
                succeeded: true,
                addresses: body.results.into_iter().map(Address::from).collect(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "address facade returned an unreadable body");
                AddressLookup::failed()
            }
        }
    }
}

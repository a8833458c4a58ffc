//! # Address lookup handler
//!
//! `GET /address-lookup?postcode=` proxies the address facade and returns its
//! addresses in the normalized shape.

use std::sync::Arc;

use abstraction_billing_infra::address_facade::{Address, AddressFacadeClient};
use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

pub struct AddressState {
    pub client: Arc<dyn AddressFacadeClient>,
}

#[derive(Debug, Deserialize)]
pub struct AddressLookupQuery {
    #[serde(default)]
    pub postcode: String,
}

#[derive(Debug, Serialize)]
pub struct AddressLookupResponse {
    pub addresses: Vec<Address>,
}

/// GET /address-lookup
pub async fn lookup_address(
    State(state): State<Arc<AddressState>>,
    Query(query): Query<AddressLookupQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let postcode = query.postcode.trim();
    if postcode.is_empty() {
        return Err(ServiceError::BadRequest("postcode is required".to_string()));
    }

    let lookup = state.client.lookup_postcode(postcode).await;
    if !lookup.succeeded {
        return Err(ServiceError::BadGateway(format!(
            "address lookup for {postcode} failed"
        )));
    }

    Ok(Json(AddressLookupResponse {
        addresses: lookup.addresses,
    }))
}

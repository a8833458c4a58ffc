//! # Router
//!
//! Routes of the billing service. Each resource group gets its own state,
//! applied with `with_state` before the groups are merged.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handler::{
    AddressState,
    BillRunState,
    cancel_bill_run,
    health_check,
    lookup_address,
    remove_review_licence,
};

pub fn router(bill_run_state: Arc<BillRunState>, address_state: Arc<AddressState>) -> Router {
    let bill_runs = Router::new()
        .route("/bill-runs/{bill_run_id}/cancel", post(cancel_bill_run))
        .route(
            "/bill-runs/{bill_run_id}/review/{licence_id}/remove",
            post(remove_review_licence),
        )
        .with_state(bill_run_state);

    let addresses = Router::new()
        .route("/address-lookup", get(lookup_address))
        .with_state(address_state);

    Router::new()
        .route("/health", get(health_check))
        .merge(bill_runs)
        .merge(addresses)
        .layer(TraceLayer::new_for_http())
}

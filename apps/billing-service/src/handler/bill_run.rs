//! # Bill run handlers
//!
//! ## Endpoints
//!
//! - `POST /bill-runs/{bill_run_id}/cancel` - cancel and delete a bill run
//! - `POST /bill-runs/{bill_run_id}/review/{licence_id}/remove` - drop a
//!   licence from a bill run under review

use std::sync::Arc;

use abstraction_billing_domain::{
    bill_run::{BillRunId, BillRunStatus},
    licence::LicenceId,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use crate::{error::ServiceError, usecase::BillRunUseCaseImpl};

/// Shared state of the bill run endpoints
pub struct BillRunState {
    pub usecase: BillRunUseCaseImpl,
}

#[derive(Debug, Serialize)]
pub struct CancelBillRunResponse {
    pub id:     BillRunId,
    pub status: BillRunStatus,
}

#[derive(Debug, Serialize)]
pub struct RemoveReviewLicenceResponse {
    pub bill_run_id:    BillRunId,
    pub licence_id:     LicenceId,
    pub bill_run_empty: bool,
}

/// POST /bill-runs/{bill_run_id}/cancel
///
/// Answers 202 as soon as the bill run is marked `cancel`; the deletion keeps
/// running after the response is sent.
pub async fn cancel_bill_run(
    State(state): State<Arc<BillRunState>>,
    Path(bill_run_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id: BillRunId = bill_run_id.parse()?;

    let cancelled = state.usecase.cancel(&id).await?;

    let response = CancelBillRunResponse {
        id:     *cancelled.bill_run.id(),
        status: cancelled.bill_run.status(),
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// POST /bill-runs/{bill_run_id}/review/{licence_id}/remove
pub async fn remove_review_licence(
    State(state): State<Arc<BillRunState>>,
    Path((bill_run_id, licence_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServiceError> {
    let bill_run_id: BillRunId = bill_run_id.parse()?;
    let licence_id: LicenceId = licence_id.parse()?;

    let removed = state
        .usecase
        .remove_review_licence(&bill_run_id, &licence_id)
        .await?;

    Ok(Json(RemoveReviewLicenceResponse {
        bill_run_id,
        licence_id,
        bill_run_empty: removed.bill_run_empty,
    }))
}

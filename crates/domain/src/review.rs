//! # Two-part-tariff review scope
//!
//! Review staging data is owned by a bill run through `review_licences`. It is
//! removed either for the whole bill run (cancel) or for a single licence
//! (licence removed from the bill run during review).

use serde::Serialize;

use crate::{bill_run::BillRunId, licence::LicenceId};

/// Rows of review staging data targeted by a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewScope {
    pub bill_run_id: BillRunId,
    /// `None` targets every licence in the bill run
    pub licence_id:  Option<LicenceId>,
}

impl ReviewScope {
    pub fn bill_run(bill_run_id: BillRunId) -> Self {
        Self {
            bill_run_id,
            licence_id: None,
        }
    }

    pub fn licence(bill_run_id: BillRunId, licence_id: LicenceId) -> Self {
        Self {
            bill_run_id,
            licence_id: Some(licence_id),
        }
    }
}

//! # Bill run
//!
//! A bill run is a batch computation producing bills for a set of licences over
//! a billing period. Two-part-tariff bill runs pass through a manual `review`
//! status before bills are finalized.
//!
//! The charging module keeps its own mirror of every bill run. The mirror is
//! addressed by [`ExternalId`], which is assigned once the charging module has
//! created its copy and never changes afterwards.
//!
//! ## Lifecycle
//!
//! ```text
//! queued → processing → review → ready → sent
//!                   ↘        ↘      ↘
//!                    empty / error / cancel
//! ```
//!
//! The only transition handled here is `cancel`, which marks the bill run for
//! total destruction. Moving to `cancel` is what stops a second deletion from
//! being started for the same bill run.

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::DomainError;

define_uuid_id! {
    /// Bill run ID
    pub struct BillRunId;
}

define_uuid_id! {
    /// ID of the bill run's mirror in the charging module
    pub struct ExternalId;
}

/// Bill run status
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BillRunStatus {
    Queued,
    Processing,
    Review,
    Ready,
    Sent,
    Cancel,
    Error,
    Empty,
}

impl BillRunStatus {
    /// Parses a stored status, rejecting unknown values as a validation error
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        value.parse().map_err(|_: strum::ParseError| {
            DomainError::Validation(format!("unknown bill run status: {value}"))
        })
    }
}

/// Bill run
///
/// Only the attributes the cleanup workflow needs are modelled. The serialized
/// form (`{ "id", "external_id", "status" }`) is the descriptor written to
/// deletion log events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillRun {
    id:          BillRunId,
    external_id: Option<ExternalId>,
    status:      BillRunStatus,
}

impl BillRun {
    pub fn new(id: BillRunId, external_id: Option<ExternalId>, status: BillRunStatus) -> Self {
        Self {
            id,
            external_id,
            status,
        }
    }

    pub fn id(&self) -> &BillRunId {
        &self.id
    }

    /// `None` until the charging module has mirrored the bill run
    pub fn external_id(&self) -> Option<&ExternalId> {
        self.external_id.as_ref()
    }

    pub fn status(&self) -> BillRunStatus {
        self.status
    }

    /// Whether the bill run may be cancelled and deleted
    ///
    /// Bill runs still being built (`processing`), already sent to billing, or
    /// already cancelled cannot be.
    pub fn is_deletable(&self) -> bool {
        !matches!(
            self.status,
            BillRunStatus::Processing | BillRunStatus::Sent | BillRunStatus::Cancel
        )
    }

    /// Moves the bill run to `cancel`
    pub fn cancelled(self) -> Result<Self, DomainError> {
        if !self.is_deletable() {
            return Err(DomainError::InvalidStateTransition {
                entity_type: "BillRun",
                id:          self.id.to_string(),
                status:      self.status.to_string(),
                action:      "cancel",
            });
        }

        Ok(Self {
            status: BillRunStatus::Cancel,
            ..self
        })
    }

    /// Moves the bill run to `empty`, used when review removes its last licence
    pub fn emptied(self) -> Self {
        Self {
            status: BillRunStatus::Empty,
            ..self
        }
    }
}

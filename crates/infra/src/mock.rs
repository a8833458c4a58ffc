//! # In-memory test doubles
//!
//! In-memory implementations of the repositories, clients and notifier, used by
//! the cascade and use case tests. Enabled in other crates through the
//! `test-utils` feature.
//!
//! ```toml
//! [dev-dependencies]
//! abstraction-billing-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! [`MockBillingStore`] enforces the same foreign keys as the migrations, so
//! deleting a parent while children still reference it fails the way
//! PostgreSQL would. It also records the order in which delete statements ran.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use abstraction_billing_domain::{
    bill_run::{BillRun, BillRunId, BillRunStatus, ExternalId},
    licence::LicenceId,
    review::ReviewScope,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    address_facade::{Address, AddressFacadeClient, AddressLookup},
    charging_module::{ChargingModuleClient, ChargingModuleResult},
    error::InfraError,
    notifier::Notifier,
    repository::{BillRunRepository, BillingRecordsRepository, ReviewDataRepository},
};

// ===== RecordingNotifier =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct NotifiedEvent {
    pub level:   NotifyLevel,
    pub event:   String,
    pub context: Value,
    /// Display form of the error passed to the error channel
    pub error:   Option<String>,
}

/// Notifier keeping every event for later assertions
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotifiedEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotifiedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event == event)
            .count()
    }

    pub fn first(&self, event: &str) -> Option<NotifiedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.event == event)
            .cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn info(&self, event: &str, context: Value) {
        self.events.lock().unwrap().push(NotifiedEvent {
            level: NotifyLevel::Info,
            event: event.to_string(),
            context,
            error: None,
        });
    }

    fn error(&self, event: &str, context: Value, error: &(dyn std::error::Error + 'static)) {
        self.events.lock().unwrap().push(NotifiedEvent {
            level: NotifyLevel::Error,
            event: event.to_string(),
            context,
            error: Some(error.to_string()),
        });
    }
}

// ===== MockBillingStore =====

/// Tables held by [`MockBillingStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    BillRuns,
    Bills,
    BillLicences,
    Transactions,
    BillRunChargeVersionYears,
    BillRunVolumes,
    ReviewLicences,
    ReviewChargeVersions,
    ReviewChargeReferences,
    ReviewChargeElements,
    ReviewReturns,
    ReviewChargeElementReturns,
}

impl Table {
    /// Table owning this one through `parent_id`
    fn owner(self) -> Option<Self> {
        match self {
            Self::BillRuns => None,
            Self::Bills
            | Self::BillRunChargeVersionYears
            | Self::BillRunVolumes
            | Self::ReviewLicences => Some(Self::BillRuns),
            Self::BillLicences => Some(Self::Bills),
            Self::Transactions => Some(Self::BillLicences),
            Self::ReviewChargeVersions | Self::ReviewReturns => Some(Self::ReviewLicences),
            Self::ReviewChargeReferences => Some(Self::ReviewChargeVersions),
            Self::ReviewChargeElements => Some(Self::ReviewChargeReferences),
            Self::ReviewChargeElementReturns => Some(Self::ReviewReturns),
        }
    }

    /// Whether `parent_id` is backed by a foreign key (see the migrations)
    fn enforces_owner(self) -> bool {
        !matches!(self, Self::BillRuns | Self::ReviewLicences)
    }

    const ALL: [Self; 12] = [
        Self::BillRuns,
        Self::Bills,
        Self::BillLicences,
        Self::Transactions,
        Self::BillRunChargeVersionYears,
        Self::BillRunVolumes,
        Self::ReviewLicences,
        Self::ReviewChargeVersions,
        Self::ReviewChargeReferences,
        Self::ReviewChargeElements,
        Self::ReviewReturns,
        Self::ReviewChargeElementReturns,
    ];
}

#[derive(Debug, Clone)]
struct MockRow {
    id:        Uuid,
    parent_id: Uuid,
    /// `licence_id` of a review licence, `review_charge_element_id` of a join row
    other_id:  Option<Uuid>,
}

#[derive(Debug, Default)]
struct StoreState {
    bill_runs:  Vec<BillRun>,
    rows:       HashMap<Table, Vec<MockRow>>,
    operations: Vec<Table>,
    failing:    HashSet<Table>,
}

impl StoreState {
    fn ids(&self, table: Table) -> HashSet<Uuid> {
        if table == Table::BillRuns {
            return self.bill_runs.iter().map(|b| *b.id().as_uuid()).collect();
        }
        self.rows
            .get(&table)
            .map(|rows| rows.iter().map(|r| r.id).collect())
            .unwrap_or_default()
    }

    fn children(&self, table: Table, parents: &HashSet<Uuid>) -> HashSet<Uuid> {
        self.rows
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| parents.contains(&r.parent_id))
                    .map(|r| r.id)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn review_licences(&self, scope: &ReviewScope) -> HashSet<Uuid> {
        let bill_run = *scope.bill_run_id.as_uuid();
        let licence = scope.licence_id.map(|id| *id.as_uuid());
        self.rows
            .get(&Table::ReviewLicences)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.parent_id == bill_run)
                    .filter(|r| licence.is_none() || r.other_id == licence)
                    .map(|r| r.id)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn bills(&self, bill_run_id: &BillRunId) -> HashSet<Uuid> {
        self.children(Table::Bills, &HashSet::from([*bill_run_id.as_uuid()]))
    }

    /// Removes `targets` from `table` like a DELETE statement would
    fn delete(&mut self, table: Table, targets: &HashSet<Uuid>) -> Result<u64, InfraError> {
        if self.failing.contains(&table) {
            return Err(InfraError::unexpected(format!(
                "injected failure deleting from {table}"
            )));
        }

        for child in Table::ALL {
            if child.owner() != Some(table) || !child.enforces_owner() {
                continue;
            }
            let referenced = self
                .rows
                .get(&child)
                .is_some_and(|rows| rows.iter().any(|r| targets.contains(&r.parent_id)));
            if referenced {
                return Err(InfraError::unexpected(format!(
                    "delete on table \"{table}\" violates foreign key constraint on table \"{child}\""
                )));
            }
        }

        let deleted = if table == Table::BillRuns {
            let before = self.bill_runs.len();
            self.bill_runs
                .retain(|b| !targets.contains(b.id().as_uuid()));
            before - self.bill_runs.len()
        } else {
            let rows = self.rows.entry(table).or_default();
            let before = rows.len();
            rows.retain(|r| !targets.contains(&r.id));
            before - rows.len()
        };

        self.operations.push(table);
        Ok(deleted as u64)
    }
}

/// In-memory bill run, review data and billing records store
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MockBillingStore {
    state: Arc<Mutex<StoreState>>,
}

impl MockBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bill_run(&self, bill_run: BillRun) {
        self.state.lock().unwrap().bill_runs.push(bill_run);
    }

    pub fn bill_run(&self, id: &BillRunId) -> Option<BillRun> {
        self.state
            .lock()
            .unwrap()
            .bill_runs
            .iter()
            .find(|b| b.id() == id)
            .cloned()
    }

    /// Inserts a row owned by `parent_id`, checking the owner exists when a
    /// foreign key backs the relationship
    pub fn insert(&self, table: Table, id: Uuid, parent_id: Uuid) {
        self.insert_row(table, MockRow {
            id,
            parent_id,
            other_id: None,
        });
    }

    pub fn insert_review_licence(&self, id: Uuid, bill_run_id: &BillRunId, licence_id: &LicenceId) {
        self.insert_row(Table::ReviewLicences, MockRow {
            id,
            parent_id: *bill_run_id.as_uuid(),
            other_id: Some(*licence_id.as_uuid()),
        });
    }

    pub fn insert_charge_element_return(&self, id: Uuid, element_id: Uuid, return_id: Uuid) {
        self.insert_row(Table::ReviewChargeElementReturns, MockRow {
            id,
            parent_id: return_id,
            other_id: Some(element_id),
        });
    }

    fn insert_row(&self, table: Table, row: MockRow) {
        let mut state = self.state.lock().unwrap();
        if let Some(owner) = table.owner().filter(|_| table.enforces_owner()) {
            assert!(
                state.ids(owner).contains(&row.parent_id),
                "insert into {table} references a missing {owner} row"
            );
        }
        state.rows.entry(table).or_default().push(row);
    }

    pub fn count(&self, table: Table) -> usize {
        self.state.lock().unwrap().ids(table).len()
    }

    /// Makes every later delete against `table` fail
    pub fn fail_on(&self, table: Table) {
        self.state.lock().unwrap().failing.insert(table);
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failing.clear();
    }

    /// Tables in the order their delete statements succeeded
    pub fn operations(&self) -> Vec<Table> {
        self.state.lock().unwrap().operations.clone()
    }

    async fn delete_with(
        &self,
        table: Table,
        targets: impl FnOnce(&StoreState) -> HashSet<Uuid>,
    ) -> Result<u64, InfraError> {
        // Every statement is a suspension point, as with a real connection
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        let targets = targets(&state);
        state.delete(table, &targets)
    }
}

#[async_trait]
impl BillRunRepository for MockBillingStore {
    async fn find_by_id(&self, id: &BillRunId) -> Result<Option<BillRun>, InfraError> {
        Ok(self.bill_run(id))
    }

    async fn update_status(
        &self,
        id: &BillRunId,
        from: BillRunStatus,
        to: BillRunStatus,
    ) -> Result<bool, InfraError> {
        let mut state = self.state.lock().unwrap();
        let Some(bill_run) = state
            .bill_runs
            .iter_mut()
            .find(|b| b.id() == id && b.status() == from)
        else {
            return Ok(false);
        };
        *bill_run = BillRun::new(*bill_run.id(), bill_run.external_id().copied(), to);
        Ok(true)
    }
}

#[async_trait]
impl ReviewDataRepository for MockBillingStore {
    async fn delete_charge_element_returns(&self, scope: &ReviewScope) -> Result<u64, InfraError> {
        self.delete_with(Table::ReviewChargeElementReturns, |s| {
            let returns = s.children(Table::ReviewReturns, &s.review_licences(scope));
            s.children(Table::ReviewChargeElementReturns, &returns)
        })
        .await
    }

    async fn delete_charge_elements(&self, scope: &ReviewScope) -> Result<u64, InfraError> {
        self.delete_with(Table::ReviewChargeElements, |s| {
            let versions = s.children(Table::ReviewChargeVersions, &s.review_licences(scope));
            let references = s.children(Table::ReviewChargeReferences, &versions);
            s.children(Table::ReviewChargeElements, &references)
        })
        .await
    }

    async fn delete_charge_references(&self, scope: &ReviewScope) -> Result<u64, InfraError> {
        self.delete_with(Table::ReviewChargeReferences, |s| {
            let versions = s.children(Table::ReviewChargeVersions, &s.review_licences(scope));
            s.children(Table::ReviewChargeReferences, &versions)
        })
        .await
    }

    async fn delete_charge_versions(&self, scope: &ReviewScope) -> Result<u64, InfraError> {
        self.delete_with(Table::ReviewChargeVersions, |s| {
            s.children(Table::ReviewChargeVersions, &s.review_licences(scope))
        })
        .await
    }

    async fn delete_returns(&self, scope: &ReviewScope) -> Result<u64, InfraError> {
        self.delete_with(Table::ReviewReturns, |s| {
            s.children(Table::ReviewReturns, &s.review_licences(scope))
        })
        .await
    }

    async fn delete_licences(&self, scope: &ReviewScope) -> Result<u64, InfraError> {
        self.delete_with(Table::ReviewLicences, |s| s.review_licences(scope))
            .await
    }

    async fn count_licences(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError> {
        let state = self.state.lock().unwrap();
        Ok(state.review_licences(&ReviewScope::bill_run(*bill_run_id)).len() as u64)
    }
}

#[async_trait]
impl BillingRecordsRepository for MockBillingStore {
    async fn delete_transactions(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError> {
        self.delete_with(Table::Transactions, |s| {
            let bill_licences = s.children(Table::BillLicences, &s.bills(bill_run_id));
            s.children(Table::Transactions, &bill_licences)
        })
        .await
    }

    async fn delete_bill_licences(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError> {
        self.delete_with(Table::BillLicences, |s| {
            s.children(Table::BillLicences, &s.bills(bill_run_id))
        })
        .await
    }

    async fn delete_bills(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError> {
        self.delete_with(Table::Bills, |s| s.bills(bill_run_id))
            .await
    }

    async fn delete_charge_version_years(
        &self,
        bill_run_id: &BillRunId,
    ) -> Result<u64, InfraError> {
        self.delete_with(Table::BillRunChargeVersionYears, |s| {
            s.children(
                Table::BillRunChargeVersionYears,
                &HashSet::from([*bill_run_id.as_uuid()]),
            )
        })
        .await
    }

    async fn delete_volumes(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError> {
        self.delete_with(Table::BillRunVolumes, |s| {
            s.children(Table::BillRunVolumes, &HashSet::from([*bill_run_id.as_uuid()]))
        })
        .await
    }

    async fn delete_bill_run(&self, bill_run_id: &BillRunId) -> Result<u64, InfraError> {
        self.delete_with(Table::BillRuns, |_| HashSet::from([*bill_run_id.as_uuid()]))
            .await
    }
}

// ===== MockChargingModuleClient =====

/// Charging module double answering every call with a fixed result
#[derive(Debug)]
pub struct MockChargingModuleClient {
    result:  ChargingModuleResult,
    deleted: Mutex<Vec<ExternalId>>,
}

impl MockChargingModuleClient {
    pub fn succeeding() -> Self {
        Self::with_result(ChargingModuleResult {
            succeeded:   true,
            status_code: Some(204),
            body:        Value::Null,
        })
    }

    /// Responds with an error status
    pub fn failing(status_code: u16) -> Self {
        Self::with_result(ChargingModuleResult {
            succeeded:   false,
            status_code: Some(status_code),
            body:        json!({ "statusCode": status_code, "message": "mock failure" }),
        })
    }

    pub fn with_result(result: ChargingModuleResult) -> Self {
        Self {
            result,
            deleted: Mutex::new(Vec::new()),
        }
    }

    /// External ids the bill run delete was requested for
    pub fn deleted(&self) -> Vec<ExternalId> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChargingModuleClient for MockChargingModuleClient {
    async fn delete_bill_run(
        &self,
        external_id: &ExternalId,
    ) -> Result<ChargingModuleResult, InfraError> {
        self.deleted.lock().unwrap().push(*external_id);
        Ok(self.result.clone())
    }

    async fn view_bill_run(
        &self,
        _external_id: &ExternalId,
    ) -> Result<ChargingModuleResult, InfraError> {
        Ok(self.result.clone())
    }

    async fn calculate_charge(&self, _payload: Value) -> Result<ChargingModuleResult, InfraError> {
        Ok(self.result.clone())
    }
}

// ===== MockAddressFacadeClient =====

#[derive(Debug, Clone)]
pub struct MockAddressFacadeClient {
    lookup: AddressLookup,
}

impl MockAddressFacadeClient {
    pub fn with_addresses(addresses: Vec<Address>) -> Self {
        Self {
            lookup: AddressLookup {
                succeeded: true,
                addresses,
            },
        }
    }

    pub fn failing() -> Self {
        Self {
            lookup: AddressLookup {
                succeeded: false,
                addresses: Vec::new(),
            },
        }
    }
}

#[async_trait]
impl AddressFacadeClient for MockAddressFacadeClient {
    async fn lookup_postcode(&self, _postcode: &str) -> AddressLookup {
        self.lookup.clone()
    }
}

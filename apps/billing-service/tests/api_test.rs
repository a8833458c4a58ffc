//! Router tests driving the billing service through `tower::ServiceExt::oneshot`
//! against in-memory stores.

use std::sync::Arc;

use abstraction_billing_domain::{
    bill_run::{BillRun, BillRunId, BillRunStatus, ExternalId},
    licence::LicenceId,
};
use abstraction_billing_infra::{
    address_facade::Address,
    deletion::DeletionRegistry,
    mock::{
        MockAddressFacadeClient,
        MockBillingStore,
        MockChargingModuleClient,
        RecordingNotifier,
        Table,
    },
};
use abstraction_billing_service::{
    app,
    handler::{AddressState, BillRunState},
    usecase::{BillRunUseCaseImpl, DeleteBillRunUseCase},
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router:   Router,
    store:    MockBillingStore,
    notifier: Arc<RecordingNotifier>,
}

fn test_app(address_facade: MockAddressFacadeClient) -> TestApp {
    let store = MockBillingStore::new();
    let notifier = Arc::new(RecordingNotifier::new());
    let registry = DeletionRegistry::with_all_deleters(
        Arc::new(MockChargingModuleClient::succeeding()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    );
    let deletion = Arc::new(DeleteBillRunUseCase::new(registry, notifier.clone()));
    let bill_run_state = Arc::new(BillRunState {
        usecase: BillRunUseCaseImpl::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            deletion,
        ),
    });
    let address_state = Arc::new(AddressState {
        client: Arc::new(address_facade),
    });

    TestApp {
        router: app::router(bill_run_state, address_state),
        store,
        notifier,
    }
}

async fn send(router: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn add_bill_run(store: &MockBillingStore, status: BillRunStatus) -> BillRun {
    let bill_run = BillRun::new(BillRunId::new(), Some(ExternalId::new()), status);
    store.add_bill_run(bill_run.clone());
    bill_run
}

/// Waits for the detached deletion started by a cancel request
async fn wait_for_deletion(notifier: &RecordingNotifier) {
    for _ in 0..100 {
        if !notifier.events().is_empty() {
            return;
        }
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("bill run deletion did not finish");
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app(MockAddressFacadeClient::with_addresses(vec![]));

    let (status, body) = send(&app.router, Method::GET, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_cancel_accepts_and_deletes_in_background() {
    let app = test_app(MockAddressFacadeClient::with_addresses(vec![]));
    let bill_run = add_bill_run(&app.store, BillRunStatus::Ready);
    let bill = Uuid::now_v7();
    app.store.insert(Table::Bills, bill, *bill_run.id().as_uuid());

    let (status, body) = send(
        &app.router,
        Method::POST,
        &format!("/bill-runs/{}/cancel", bill_run.id()),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({ "id": bill_run.id().to_string(), "status": "cancel" }));

    wait_for_deletion(&app.notifier).await;
    assert_eq!(app.notifier.count("Bill run deletion complete"), 1);
    assert_eq!(app.store.count(Table::Bills), 0);
    assert!(app.store.bill_run(bill_run.id()).is_none());
}

#[tokio::test]
async fn test_cancel_sent_bill_run_is_a_conflict() {
    let app = test_app(MockAddressFacadeClient::with_addresses(vec![]));
    let bill_run = add_bill_run(&app.store, BillRunStatus::Sent);

    let (status, body) = send(
        &app.router,
        Method::POST,
        &format!("/bill-runs/{}/cancel", bill_run.id()),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
    assert!(app.notifier.events().is_empty());
}

#[tokio::test]
async fn test_cancel_unknown_bill_run_is_not_found() {
    let app = test_app(MockAddressFacadeClient::with_addresses(vec![]));

    let (status, _) = send(
        &app.router,
        Method::POST,
        &format!("/bill-runs/{}/cancel", BillRunId::new()),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_with_malformed_id_is_a_bad_request() {
    let app = test_app(MockAddressFacadeClient::with_addresses(vec![]));

    let (status, body) = send(&app.router, Method::POST, "/bill-runs/not-a-uuid/cancel").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["title"], "Bad Request");
}

#[tokio::test]
async fn test_remove_last_review_licence_empties_bill_run() {
    let app = test_app(MockAddressFacadeClient::with_addresses(vec![]));
    let bill_run = add_bill_run(&app.store, BillRunStatus::Review);
    let licence_id = LicenceId::new();
    app.store
        .insert_review_licence(Uuid::now_v7(), bill_run.id(), &licence_id);

    let (status, body) = send(
        &app.router,
        Method::POST,
        &format!("/bill-runs/{}/review/{}/remove", bill_run.id(), licence_id),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "bill_run_id": bill_run.id().to_string(),
            "licence_id": licence_id.to_string(),
            "bill_run_empty": true,
        })
    );
    assert_eq!(
        app.store.bill_run(bill_run.id()).unwrap().status(),
        BillRunStatus::Empty
    );
}

#[tokio::test]
async fn test_address_lookup_returns_addresses() {
    let address = Address {
        uprn: Some(340116),
        address: "1 HORSE GUARDS ROAD, LONDON, SW1A 2HQ".to_string(),
        postcode: "SW1A 2HQ".to_string(),
        ..Address::default()
    };
    let app = test_app(MockAddressFacadeClient::with_addresses(vec![address]));

    let (status, body) = send(&app.router, Method::GET, "/address-lookup?postcode=SW1A%202HQ").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["addresses"][0]["uprn"], 340116);
    assert_eq!(body["addresses"][0]["postcode"], "SW1A 2HQ");
}

#[tokio::test]
async fn test_address_lookup_without_postcode_is_a_bad_request() {
    let app = test_app(MockAddressFacadeClient::with_addresses(vec![]));

    let (status, _) = send(&app.router, Method::GET, "/address-lookup").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_address_lookup_failure_is_a_bad_gateway() {
    let app = test_app(MockAddressFacadeClient::failing());

    let (status, body) = send(&app.router, Method::GET, "/address-lookup?postcode=BS1%205AH").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["status"], 502);
}

//! Shared fixtures for the PostgreSQL integration tests
//!
//! Each test file is compiled as its own crate, so helpers unused by one file
//! would warn there.

#![allow(dead_code)]

use abstraction_billing_domain::{
    bill_run::{BillRunId, BillRunStatus, ExternalId},
    licence::LicenceId,
};
use sqlx::PgPool;
use uuid::Uuid;

/// Identifiers of a bill run created by [`seed_bill_run`]
pub struct SeededBillRun {
    pub id:          BillRunId,
    pub external_id: ExternalId,
    pub licence_id:  LicenceId,
}

async fn insert(pool: &PgPool, sql: &str, ids: &[Uuid]) {
    let mut query = sqlx::query(sql);
    for id in ids {
        query = query.bind(*id);
    }
    query.execute(pool).await.expect("failed to seed test data");
}

/// Creates a bill run with 2 bills, 3 bill licences, 5 transactions, a charge
/// version year, a volume and one licence's full review chain
pub async fn seed_bill_run(pool: &PgPool, status: BillRunStatus) -> SeededBillRun {
    let id = BillRunId::new();
    let external_id = ExternalId::new();
    let licence_id = LicenceId::new();
    let status: &'static str = status.into();

    sqlx::query("INSERT INTO bill_runs (id, external_id, status) VALUES ($1, $2, $3)")
        .bind(id.as_uuid())
        .bind(external_id.as_uuid())
        .bind(status)
        .execute(pool)
        .await
        .expect("failed to seed bill run");
    let bill_run = *id.as_uuid();

    let bills = [Uuid::now_v7(), Uuid::now_v7()];
    for bill in bills {
        insert(pool, "INSERT INTO bills (id, bill_run_id) VALUES ($1, $2)", &[bill, bill_run]).await;
    }

    let bill_licences = [Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7()];
    for (bill_licence, bill) in bill_licences.iter().zip([bills[0], bills[0], bills[1]]) {
        insert(
            pool,
            "INSERT INTO bill_licences (id, bill_id, licence_id) VALUES ($1, $2, $3)",
            &[*bill_licence, bill, Uuid::now_v7()],
        )
        .await;
    }

    for owner in [0, 0, 1, 2, 2] {
        insert(
            pool,
            "INSERT INTO transactions (id, bill_licence_id) VALUES ($1, $2)",
            &[Uuid::now_v7(), bill_licences[owner]],
        )
        .await;
    }

    insert(
        pool,
        "INSERT INTO bill_run_charge_version_years (id, bill_run_id, charge_version_id, financial_year) \
         VALUES ($1, $2, $3, 2024)",
        &[Uuid::now_v7(), bill_run, Uuid::now_v7()],
    )
    .await;
    insert(
        pool,
        "INSERT INTO bill_run_volumes (id, bill_run_id, charge_reference_id, financial_year) \
         VALUES ($1, $2, $3, 2024)",
        &[Uuid::now_v7(), bill_run, Uuid::now_v7()],
    )
    .await;

    seed_review_licence(pool, &id, &licence_id).await;

    SeededBillRun {
        id,
        external_id,
        licence_id,
    }
}

/// Review chain for one licence: version → reference → 2 elements, and one
/// return joined to both elements
pub async fn seed_review_licence(pool: &PgPool, bill_run_id: &BillRunId, licence_id: &LicenceId) {
    let review_licence = Uuid::now_v7();
    let version = Uuid::now_v7();
    let reference = Uuid::now_v7();
    let elements = [Uuid::now_v7(), Uuid::now_v7()];
    let review_return = Uuid::now_v7();

    insert(
        pool,
        "INSERT INTO review_licences (id, bill_run_id, licence_id) VALUES ($1, $2, $3)",
        &[review_licence, *bill_run_id.as_uuid(), *licence_id.as_uuid()],
    )
    .await;
    insert(
        pool,
        "INSERT INTO review_charge_versions (id, review_licence_id, charge_version_id) VALUES ($1, $2, $3)",
        &[version, review_licence, Uuid::now_v7()],
    )
    .await;
    insert(
        pool,
        "INSERT INTO review_charge_references (id, review_charge_version_id, charge_reference_id) \
         VALUES ($1, $2, $3)",
        &[reference, version, Uuid::now_v7()],
    )
    .await;
    for element in elements {
        insert(
            pool,
            "INSERT INTO review_charge_elements (id, review_charge_reference_id, charge_element_id) \
             VALUES ($1, $2, $3)",
            &[element, reference, Uuid::now_v7()],
        )
        .await;
    }
    sqlx::query("INSERT INTO review_returns (id, review_licence_id, return_id) VALUES ($1, $2, 'v1:1:01/123:1')")
        .bind(review_return)
        .bind(review_licence)
        .execute(pool)
        .await
        .expect("failed to seed review return");
    for element in elements {
        insert(
            pool,
            "INSERT INTO review_charge_element_returns (id, review_charge_element_id, review_return_id) \
             VALUES ($1, $2, $3)",
            &[Uuid::now_v7(), element, review_return],
        )
        .await;
    }
}

/// Rows left in `table`, filtered by `bill_run_id` directly or through owners
pub async fn count_for_bill_run(pool: &PgPool, table: &str, bill_run_id: &BillRunId) -> i64 {
    let sql = match table {
        "bill_runs" => "SELECT COUNT(*) FROM bill_runs WHERE id = $1",
        "bills" => "SELECT COUNT(*) FROM bills WHERE bill_run_id = $1",
        "bill_licences" => {
            "SELECT COUNT(*) FROM bill_licences bl JOIN bills b ON bl.bill_id = b.id \
             WHERE b.bill_run_id = $1"
        }
        "transactions" => {
            "SELECT COUNT(*) FROM transactions t \
             JOIN bill_licences bl ON t.bill_licence_id = bl.id \
             JOIN bills b ON bl.bill_id = b.id WHERE b.bill_run_id = $1"
        }
        "bill_run_charge_version_years" => {
            "SELECT COUNT(*) FROM bill_run_charge_version_years WHERE bill_run_id = $1"
        }
        "bill_run_volumes" => "SELECT COUNT(*) FROM bill_run_volumes WHERE bill_run_id = $1",
        "review_licences" => "SELECT COUNT(*) FROM review_licences WHERE bill_run_id = $1",
        other => panic!("no count query for {other}"),
    };

    sqlx::query_scalar(sql)
        .bind(bill_run_id.as_uuid())
        .fetch_one(pool)
        .await
        .expect("count query failed")
}

/// Rows left in a review table regardless of bill run
pub async fn count_all(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count query failed")
}

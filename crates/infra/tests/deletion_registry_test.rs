//! Checks the list of deleters a bill run deletion runs
//!
//! ```bash
//! cargo test -p abstraction-billing-infra --test deletion_registry_test
//! ```

use std::collections::HashSet;

use abstraction_billing_infra::deletion::DeletionRegistry;

#[test]
fn test_expected_names_are_unique() {
    let expected = DeletionRegistry::expected_deleter_names();

    let unique: HashSet<&&str> = expected.iter().collect();
    assert_eq!(expected.len(), unique.len(), "duplicate deleter names: {expected:?}");
}

#[test]
fn test_expected_names_cover_remote_and_local_stores() {
    let expected = DeletionRegistry::expected_deleter_names();

    assert!(expected.iter().any(|n| n.starts_with("charging_module:")));
    assert_eq!(expected.iter().filter(|n| n.starts_with("postgres:")).count(), 2);
}

#[test]
fn test_expected_names_are_exactly_the_three_branches() {
    let expected: HashSet<&str> = DeletionRegistry::expected_deleter_names()
        .into_iter()
        .collect();

    assert_eq!(
        expected,
        HashSet::from([
            "charging_module:bill_run",
            "postgres:review_data",
            "postgres:billing_records",
        ])
    );
}

//! Architectural Contract Test: Fail Closed
//!
//! This test verifies that the updater refuses to touch records it does not
//! fully understand, and that a refusal for one family blocks the whole run.
//!
//! Constraints verified:
//! - Multi-value record → error, zero submissions for EITHER family
//! - Ambiguous listing → error, zero submissions
//! - No owning zone → error before any record lookup
//! - Records moved during the run (recheck enabled) → error, zero submissions
//!
//! If this test fails, someone has added:
//! - "Best effort" partial updates
//! - Silent overwrites of records managed by someone else

mod common;

use common::*;
use r53ddns_core::Error;
use r53ddns_core::traits::{RecordType, Zone};

#[tokio::test]
async fn multi_value_record_blocks_both_families() {
    let provider = MockDnsProvider::new()
        .with_record(RecordType::A, 60, &["198.51.100.1"])
        .with_record(RecordType::Aaaa, 60, &["2001:db8::1", "2001:db8::2"]);

    let result = updater(&provider, dual_stack("203.0.113.5", "2001:db8::5"), config())
        .run_with_shutdown(std::future::pending())
        .await;

    match result {
        Err(Error::MultiValueRecord {
            record_type, count, ..
        }) => {
            assert_eq!(record_type, "AAAA");
            assert_eq!(count, 2);
        }
        other => panic!("expected MultiValueRecord, got {:?}", other),
    }
    assert_eq!(
        provider.submission_count(),
        0,
        "CONTRACT VIOLATION: the A record was updated although AAAA was refused"
    );
}

#[tokio::test]
async fn ambiguous_listing_is_refused() {
    let provider = MockDnsProvider::new().with_listing(
        RecordType::A,
        vec![
            record_set(HOST, "A", 60, &["198.51.100.1"]),
            record_set(HOST, "A", 60, &["198.51.100.2"]),
        ],
    );

    let err = tokio_test::assert_err!(
        updater(&provider, v4_only("203.0.113.5"), config())
            .run_with_shutdown(std::future::pending())
            .await
    );

    assert!(matches!(err, Error::AmbiguousRecordSet { count: 2, .. }));
    assert!(err.is_precondition_failure());
    assert_eq!(provider.submission_count(), 0);
}

#[tokio::test]
async fn neighbouring_record_counts_as_absent() {
    let provider = MockDnsProvider::new().with_listing(
        RecordType::A,
        vec![record_set("www.example.com", "A", 300, &["198.51.100.1"])],
    );

    let report = updater(&provider, v4_only("203.0.113.5"), config())
        .run_with_shutdown(std::future::pending())
        .await
        .expect("run succeeds");

    assert!(matches!(
        report.decision(r53ddns_core::AddressFamily::V4),
        Some(r53ddns_core::Reconciliation::Create(_))
    ));
}

#[tokio::test]
async fn missing_zone_is_an_error() {
    let provider = MockDnsProvider::new().with_zones(vec![
        Zone::new("/hostedzone/Z1", "example.org."),
        Zone::new("/hostedzone/Z2", "ample.com."),
    ]);

    let result = updater(&provider, v4_only("203.0.113.5"), config())
        .run_with_shutdown(std::future::pending())
        .await;

    match result {
        Err(err @ Error::NoZoneFound { .. }) => {
            assert_eq!(err.to_string(), "No Route53 zone found for host.example.com.");
        }
        other => panic!("expected NoZoneFound, got {:?}", other),
    }
    assert_eq!(provider.submission_count(), 0);
}

#[tokio::test]
async fn records_moved_during_run_abort_submission() {
    let provider = MockDnsProvider::new().with_record(RecordType::A, 60, &["198.51.100.1"]);
    provider
        .state
        .lock()
        .unwrap()
        .record_sets_after_first_read
        .insert(
            RecordType::A,
            vec![record_set(HOST, "A", 60, &["192.0.2.77"])],
        );

    let mut config = config();
    config.recheck_before_submit = true;

    let result = updater(&provider, v4_only("203.0.113.5"), config)
        .run_with_shutdown(std::future::pending())
        .await;

    assert!(matches!(
        result,
        Err(Error::ConcurrentModification { ref record_type, .. }) if record_type == "A"
    ));
    assert_eq!(provider.submission_count(), 0);
}

#[tokio::test]
async fn recheck_passes_when_nothing_moved() {
    let provider = MockDnsProvider::new().with_record(RecordType::A, 60, &["198.51.100.1"]);
    let mut config = config();
    config.recheck_before_submit = true;

    updater(&provider, v4_only("203.0.113.5"), config)
        .run_with_shutdown(std::future::pending())
        .await
        .expect("run succeeds");

    assert_eq!(provider.submission_count(), 1);
}

//! Document-number issuance under contention: a seeded counter must hand out exactly the next
//! N integers to N concurrent callers, with no duplicates and no gaps, and numbering must stay
//! independent per (tenant, year).

use std::collections::BTreeSet;

use log::*;
use nest_recon_engine::{
    config::MatchingConfig,
    helpers::parse_document_number,
    DocumentNumberApi,
    DocumentSequences,
    SqliteDatabase,
};
use tokio::runtime::Runtime;

mod support;

const NUM_CALLERS: i64 = 50;

#[test]
fn backfilled_counter_survives_a_burst() {
    info!("🚀️ Starting document-number burst test");
    let rt = Runtime::new().unwrap();

    rt.block_on(async move {
        let url = support::random_db_path();
        support::prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");

        // Pre-existing documents from before the counter row existed: the highest consumed
        // number for tenant 1 in 2026 is 7. 2025 and tenant 2 must not interfere.
        let pool = db.pool();
        support::seed_invoice(pool, 1, "INV-2026-0003", 100, 0, "Sent", "2026-01-01", ("A", "B"), ("C", "D")).await;
        support::seed_invoice(pool, 1, "INV-2026-0007", 100, 0, "Sent", "2026-02-01", ("A", "B"), ("C", "D")).await;
        support::seed_invoice(pool, 1, "INV-2025-0042", 100, 100, "Paid", "2025-06-01", ("A", "B"), ("C", "D")).await;
        support::seed_invoice(pool, 2, "INV-2026-9000", 100, 0, "Sent", "2026-01-01", ("A", "B"), ("C", "D")).await;

        let config = MatchingConfig::default();
        info!("🚀️ Issuing {NUM_CALLERS} document numbers concurrently");
        let mut handles = Vec::new();
        for _ in 0..NUM_CALLERS {
            let api = DocumentNumberApi::new(db.clone(), config.clone());
            handles.push(tokio::spawn(async move { api.next_invoice_number(1, 2026).await }));
        }
        let mut counters = BTreeSet::new();
        for handle in handles {
            let number = handle.await.expect("task panicked").expect("Error issuing document number");
            let (prefix, year, counter) =
                parse_document_number(number.as_str()).expect("issued number must parse back");
            assert_eq!(prefix, "INV");
            assert_eq!(year, 2026);
            assert!(counters.insert(counter), "duplicate document number issued: {number}");
        }
        // Exactly 8..=57: seeded max + 1 through max + NUM_CALLERS, no duplicates, no gaps
        let expected: BTreeSet<i64> = (8..8 + NUM_CALLERS).collect();
        assert_eq!(counters, expected);

        // The 2025 counter seeds independently from its own documents
        let next_2025 = db.next_document_number(1, 2025, "INV").await.expect("Error issuing 2025 number");
        assert_eq!(next_2025, 43);

        // Tenant 2 is isolated from tenant 1 entirely
        let next_tenant_2 = db.next_document_number(2, 2026, "INV").await.expect("Error issuing tenant-2 number");
        assert_eq!(next_tenant_2, 9001);
    });
    info!("🚀️ Burst test complete");
}

#[test]
fn fresh_counter_starts_at_one() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = support::random_db_path();
        support::prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let api = DocumentNumberApi::new(db, MatchingConfig::default());
        let first = api.next_invoice_number(9, 2026).await.expect("Error issuing first number");
        assert_eq!(first.as_str(), "INV-2026-0001");
        let second = api.next_invoice_number(9, 2026).await.expect("Error issuing second number");
        assert_eq!(second.as_str(), "INV-2026-0002");
    });
}

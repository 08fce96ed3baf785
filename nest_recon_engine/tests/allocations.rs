//! The atomic allocation unit: exactly-once semantics under re-processing and races, the
//! invoice-state guard, and payment reversal.

use chrono::NaiveDate;
use log::*;
use nest_recon_engine::{
    db_types::{InvoiceStatus, MatchedBy, NewPayment},
    AllocationOutcome,
    LedgerQueries,
    ReconciliationDatabase,
    SqliteDatabase,
};
use nre_common::Cents;
use tokio::runtime::Runtime;

mod support;

const TENANT: i64 = 1;

async fn new_db() -> SqliteDatabase {
    let url = support::random_db_path();
    support::prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

fn paid_on(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

#[test]
fn reprocessing_an_allocated_transaction_is_a_no_op() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let db = new_db().await;
        let invoice_id = support::seed_invoice(
            db.pool(), TENANT, "INV-2026-0001", 100_000, 0, "Sent", "2026-03-01", ("A", "Naidoo"), ("P", "Naidoo"),
        )
        .await;
        let txn_id = support::seed_credit(db.pool(), TENANT, "2026-03-05", "deposit", 100_000).await;

        let payment = NewPayment::new(TENANT, invoice_id, Cents::from(100_000), paid_on(5))
            .for_transaction(txn_id)
            .with_confidence(85);
        let first = db.apply_allocation(payment.clone()).await.expect("Error applying allocation");
        let applied_id = match first {
            AllocationOutcome::Applied { payment, invoice } => {
                assert_eq!(invoice.status, InvoiceStatus::Paid);
                assert_eq!(payment.matched_by, MatchedBy::Auto);
                payment.id
            },
            other => panic!("expected Applied, got {other:?}"),
        };

        // Same transaction again: benign no-op, nothing double-allocated
        let second = db.apply_allocation(payment).await.expect("Error re-applying allocation");
        match second {
            AllocationOutcome::AlreadyAllocated(existing) => assert_eq!(existing.id, applied_id),
            other => panic!("expected AlreadyAllocated, got {other:?}"),
        }
        let invoice = db.fetch_invoice_by_id(TENANT, invoice_id).await.unwrap().expect("invoice");
        assert_eq!(invoice.amount_paid.value(), 100_000);
        let payments = db.fetch_payments_for_invoice(invoice_id).await.expect("Error fetching payments");
        assert_eq!(payments.len(), 1);
    });
}

#[test]
fn concurrent_allocations_of_one_transaction_apply_exactly_once() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let db = new_db().await;
        let invoice_id = support::seed_invoice(
            db.pool(), TENANT, "INV-2026-0001", 100_000, 0, "Sent", "2026-03-01", ("A", "Naidoo"), ("P", "Naidoo"),
        )
        .await;
        let txn_id = support::seed_credit(db.pool(), TENANT, "2026-03-05", "deposit", 100_000).await;

        // A retry racing a scheduled run: both try to allocate the same transaction
        let mut handles = Vec::new();
        for _ in 0..2 {
            let db = db.clone();
            let payment = NewPayment::new(TENANT, invoice_id, Cents::from(100_000), paid_on(5))
                .for_transaction(txn_id)
                .with_confidence(85);
            handles.push(tokio::spawn(async move { db.apply_allocation(payment).await }));
        }
        let mut applied = 0;
        let mut no_ops = 0;
        for handle in handles {
            match handle.await.expect("task panicked").expect("Error applying allocation") {
                AllocationOutcome::Applied { .. } => applied += 1,
                AllocationOutcome::AlreadyAllocated(_) => no_ops += 1,
                // The loser can also land after the winner settled the invoice
                AllocationOutcome::InvoiceNotPayable { .. } => no_ops += 1,
            }
        }
        assert_eq!(applied, 1, "exactly one of the racing allocations may win");
        assert_eq!(no_ops, 1);

        let invoice = db.fetch_invoice_by_id(TENANT, invoice_id).await.unwrap().expect("invoice");
        assert_eq!(invoice.amount_paid.value(), 100_000, "the invoice must not be incremented past its total");
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        let live: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE transaction_id = $1 AND reversed = 0")
                .bind(txn_id)
                .fetch_one(db.pool())
                .await
                .expect("Error counting payments");
        assert_eq!(live, 1);
    });
}

#[test]
fn partial_allocations_accumulate_and_settle() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let db = new_db().await;
        let invoice_id = support::seed_invoice(
            db.pool(), TENANT, "INV-2026-0001", 100_000, 0, "Sent", "2026-03-01", ("A", "Naidoo"), ("P", "Naidoo"),
        )
        .await;

        // Manual, feed-less payments: two instalments against the same invoice
        let first = NewPayment::new(TENANT, invoice_id, Cents::from(40_000), paid_on(5));
        match db.apply_allocation(first).await.expect("Error applying first instalment") {
            AllocationOutcome::Applied { invoice, payment } => {
                assert_eq!(invoice.status, InvoiceStatus::PartiallyPaid);
                assert_eq!(invoice.outstanding(), Cents::from(60_000));
                assert_eq!(payment.matched_by, MatchedBy::Manual);
                assert_eq!(payment.transaction_id, None);
            },
            other => panic!("expected Applied, got {other:?}"),
        }
        let second = NewPayment::new(TENANT, invoice_id, Cents::from(60_000), paid_on(12));
        match db.apply_allocation(second).await.expect("Error applying second instalment") {
            AllocationOutcome::Applied { invoice, .. } => {
                assert_eq!(invoice.status, InvoiceStatus::Paid);
                assert_eq!(invoice.outstanding(), Cents::from(0));
            },
            other => panic!("expected Applied, got {other:?}"),
        }
    });
}

#[test]
fn invoice_guard_rejects_overshoot_void_and_nonpositive_amounts() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let db = new_db().await;
        let partially_paid = support::seed_invoice(
            db.pool(), TENANT, "INV-2026-0001", 100_000, 80_000, "PartiallyPaid", "2026-03-01", ("A", "B"), ("C", "D"),
        )
        .await;
        let void = support::seed_invoice(
            db.pool(), TENANT, "INV-2026-0002", 100_000, 0, "Void", "2026-03-01", ("A", "B"), ("C", "D"),
        )
        .await;

        // More than the remaining headroom: rejected, nothing changed
        let overshoot = NewPayment::new(TENANT, partially_paid, Cents::from(30_000), paid_on(5));
        match db.apply_allocation(overshoot).await.expect("Error attempting overshoot") {
            AllocationOutcome::InvoiceNotPayable { invoice_id, .. } => assert_eq!(invoice_id, partially_paid),
            other => panic!("expected InvoiceNotPayable, got {other:?}"),
        }
        let invoice = db.fetch_invoice_by_id(TENANT, partially_paid).await.unwrap().expect("invoice");
        assert_eq!(invoice.amount_paid.value(), 80_000);
        assert_eq!(invoice.status, InvoiceStatus::PartiallyPaid);
        let payments = db.fetch_payments_for_invoice(partially_paid).await.expect("Error fetching payments");
        assert!(payments.is_empty(), "the rejected allocation must leave no payment row behind");

        // Void invoices are never touched
        let to_void = NewPayment::new(TENANT, void, Cents::from(1_000), paid_on(5));
        match db.apply_allocation(to_void).await.expect("Error attempting void allocation") {
            AllocationOutcome::InvoiceNotPayable { .. } => {},
            other => panic!("expected InvoiceNotPayable, got {other:?}"),
        }

        // Non-positive amounts are a caller bug, not a storage outcome
        let zero = NewPayment::new(TENANT, partially_paid, Cents::from(0), paid_on(5));
        assert!(db.apply_allocation(zero).await.is_err());
    });
}

#[test]
fn reversal_reopens_the_invoice_and_frees_the_transaction() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let db = new_db().await;
        let invoice_id = support::seed_invoice(
            db.pool(), TENANT, "INV-2026-0001", 100_000, 0, "Sent", "2026-03-01", ("A", "Naidoo"), ("P", "Naidoo"),
        )
        .await;
        let txn_id = support::seed_credit(db.pool(), TENANT, "2026-03-05", "deposit", 100_000).await;

        let payment = NewPayment::new(TENANT, invoice_id, Cents::from(100_000), paid_on(5))
            .for_transaction(txn_id)
            .with_confidence(90);
        let payment_id = match db.apply_allocation(payment).await.expect("Error applying allocation") {
            AllocationOutcome::Applied { payment, .. } => payment.id,
            other => panic!("expected Applied, got {other:?}"),
        };
        // Allocated: the transaction no longer shows up as unallocated
        assert!(db.fetch_unallocated_credits(TENANT).await.expect("Error fetching credits").is_empty());

        let reversed = db.reverse_payment(TENANT, payment_id).await.expect("Error reversing payment");
        assert!(reversed.reversed);
        info!("Reversed payment #{}", reversed.id);

        let invoice = db.fetch_invoice_by_id(TENANT, invoice_id).await.unwrap().expect("invoice");
        assert_eq!(invoice.amount_paid.value(), 0);
        assert_eq!(invoice.status, InvoiceStatus::Sent);

        // The transaction is matchable again, and reversing twice is an error
        let credits = db.fetch_unallocated_credits(TENANT).await.expect("Error fetching credits");
        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].id, txn_id);
        assert!(db.reverse_payment(TENANT, payment_id).await.is_err());

        // A fresh allocation of the same transaction is legitimate now
        let again = NewPayment::new(TENANT, invoice_id, Cents::from(100_000), paid_on(9))
            .for_transaction(txn_id)
            .with_confidence(90);
        match db.apply_allocation(again).await.expect("Error re-allocating after reversal") {
            AllocationOutcome::Applied { invoice, .. } => assert_eq!(invoice.status, InvoiceStatus::Paid),
            other => panic!("expected Applied, got {other:?}"),
        }
    });
}

#[test]
fn cross_tenant_reversal_is_refused() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let db = new_db().await;
        let invoice_id = support::seed_invoice(
            db.pool(), TENANT, "INV-2026-0001", 50_000, 0, "Sent", "2026-03-01", ("A", "B"), ("C", "D"),
        )
        .await;
        let payment = NewPayment::new(TENANT, invoice_id, Cents::from(50_000), paid_on(5));
        let payment_id = match db.apply_allocation(payment).await.expect("Error applying allocation") {
            AllocationOutcome::Applied { payment, .. } => payment.id,
            other => panic!("expected Applied, got {other:?}"),
        };
        // Another tenant cannot reach into this tenant's payments
        assert!(db.reverse_payment(999, payment_id).await.is_err());
    });
}

//! `SqliteDatabase` is a concrete implementation of a reconciliation engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the
//! [`crate::traits`] module. Every multi-statement mutation runs inside one database
//! transaction, so each trait operation is all-or-nothing.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, invoices, new_pool, payments, sequences, transactions};
use crate::{
    db_types::{Invoice, NewPayment, Payment, Transaction},
    traits::{
        AllocationOutcome,
        DocumentSequences,
        LedgerQueries,
        ReconciliationDatabase,
        ReconciliationError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl LedgerQueries for SqliteDatabase {
    async fn fetch_open_invoices(&self, tenant_id: i64) -> Result<Vec<Invoice>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        invoices::fetch_open_invoices(tenant_id, &mut conn).await
    }

    async fn fetch_unallocated_credits(&self, tenant_id: i64) -> Result<Vec<Transaction>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_unallocated_credits(tenant_id, &mut conn).await
    }

    async fn fetch_invoice_by_id(
        &self,
        tenant_id: i64,
        invoice_id: i64,
    ) -> Result<Option<Invoice>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        invoices::fetch_invoice_by_id(tenant_id, invoice_id, &mut conn).await
    }

    async fn fetch_transaction_by_id(
        &self,
        transaction_id: i64,
    ) -> Result<Option<Transaction>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_transaction_by_id(transaction_id, &mut conn).await
    }

    async fn fetch_live_payment_for_transaction(
        &self,
        transaction_id: i64,
    ) -> Result<Option<Payment>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_live_payment_for_transaction(transaction_id, &mut conn).await
    }

    async fn fetch_payments_for_invoice(&self, invoice_id: i64) -> Result<Vec<Payment>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payments_for_invoice(invoice_id, &mut conn).await
    }
}

impl ReconciliationDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Takes a new payment, and in a single atomic transaction,
    /// * inserts the payment row,
    /// * applies the guarded, atomic paid-amount increment and status transition.
    ///
    /// The duplicate check runs twice: once before the transaction (the benign no-op path for
    /// re-processing), and again *inside* it via the partial unique index on live allocations,
    /// which is what holds under races. The insert is deliberately the transaction's first
    /// statement so the write lock is taken up front rather than upgraded from a read.
    ///
    /// If the invoice guard rejects the increment the transaction is rolled back and the payment
    /// row vanishes with it.
    async fn apply_allocation(&self, payment: NewPayment) -> Result<AllocationOutcome, ReconciliationError> {
        if payment.amount.value() <= 0 {
            return Err(ReconciliationError::InvalidAllocation(format!(
                "allocation amount {} must be positive",
                payment.amount
            )));
        }
        if let Some(transaction_id) = payment.transaction_id {
            let mut conn = self.pool.acquire().await?;
            if let Some(existing) = payments::fetch_live_payment_for_transaction(transaction_id, &mut conn).await? {
                debug!(
                    "🗃️ Transaction #{transaction_id} is already allocated by payment #{}. Nothing to do.",
                    existing.id
                );
                return Ok(AllocationOutcome::AlreadyAllocated(existing));
            }
        }
        let mut tx = self.pool.begin().await?;
        let inserted = match payments::insert_payment(&payment, &mut tx).await? {
            Ok(row) => row,
            Err(payments::DuplicateAllocation) => {
                // Lost a race with a concurrent pass between the pre-check and the insert.
                tx.rollback().await?;
                let transaction_id = payment.transaction_id.unwrap_or_default();
                let mut conn = self.pool.acquire().await?;
                let existing = payments::fetch_live_payment_for_transaction(transaction_id, &mut conn)
                    .await?
                    .ok_or_else(|| {
                        ReconciliationError::DatabaseError(format!(
                            "Transaction #{transaction_id} hit the live-allocation index but no live payment exists"
                        ))
                    })?;
                debug!("🗃️ Transaction #{transaction_id} was allocated concurrently by payment #{}.", existing.id);
                return Ok(AllocationOutcome::AlreadyAllocated(existing));
            },
        };
        let invoice =
            match invoices::apply_amount_paid(payment.invoice_id, payment.tenant_id, payment.amount, &mut tx).await? {
                Some(invoice) => invoice,
                None => {
                    tx.rollback().await?;
                    info!(
                        "🗃️ Invoice #{} rejected an allocation of {} (void, settled, or insufficient headroom).",
                        payment.invoice_id, payment.amount
                    );
                    return Ok(AllocationOutcome::InvoiceNotPayable {
                        invoice_id: payment.invoice_id,
                        reason: format!("invoice could not absorb {}", payment.amount),
                    });
                },
            };
        tx.commit().await?;
        debug!(
            "🗃️ Payment #{} of {} applied to invoice {} (now {}, {} outstanding)",
            inserted.id,
            inserted.amount,
            invoice.document_number,
            invoice.status,
            invoice.outstanding()
        );
        Ok(AllocationOutcome::Applied { payment: inserted, invoice })
    }

    async fn reverse_payment(&self, tenant_id: i64, payment_id: i64) -> Result<Payment, ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment_by_id(payment_id, &mut tx)
            .await?
            .filter(|p| p.tenant_id == tenant_id)
            .ok_or(ReconciliationError::PaymentNotFound(payment_id))?;
        if payment.reversed {
            return Err(ReconciliationError::PaymentAlreadyReversed(payment_id));
        }
        let invoice = invoices::deduct_amount_paid(payment.invoice_id, payment.amount, &mut tx).await?.ok_or_else(
            || {
                error!(
                    "🗃️ Invoice #{} could not give back {} for payment #{payment_id}. The ledger is inconsistent.",
                    payment.invoice_id, payment.amount
                );
                ReconciliationError::MalformedData(format!(
                    "invoice #{} cannot return {} to outstanding",
                    payment.invoice_id, payment.amount
                ))
            },
        )?;
        let payment = payments::mark_reversed(payment_id, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Payment #{payment_id} reversed. Invoice {} is back to {} with {} outstanding.",
            invoice.document_number,
            invoice.status,
            invoice.outstanding()
        );
        Ok(payment)
    }

    async fn close(&mut self) -> Result<(), ReconciliationError> {
        self.pool.close().await;
        Ok(())
    }
}

impl DocumentSequences for SqliteDatabase {
    async fn next_document_number(
        &self,
        tenant_id: i64,
        year: i32,
        prefix: &str,
    ) -> Result<i64, ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        sequences::seed_counter(tenant_id, year, prefix, &mut tx).await?;
        let value = sequences::increment_and_return(tenant_id, year, &mut tx).await?;
        tx.commit().await?;
        Ok(value)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using `NRE_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

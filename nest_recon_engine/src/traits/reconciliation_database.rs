use thiserror::Error;

use crate::{
    config::ConfigError,
    db_types::{Invoice, NewPayment, Payment, Transaction},
    traits::AllocationOutcome,
};

/// Read-side queries over the tenant's ledger. These are the collaborator-facing contracts: the
/// review UI and reporting layers consume the same queries the matching pass does.
#[allow(async_fn_in_trait)]
pub trait LedgerQueries: Clone {
    /// All invoices for the tenant that can still receive payments: status `Sent` or
    /// `PartiallyPaid`. Draft, paid and void invoices are never returned.
    async fn fetch_open_invoices(&self, tenant_id: i64) -> Result<Vec<Invoice>, ReconciliationError>;

    /// Credit-direction, non-deleted transactions for the tenant with no non-reversed payment
    /// against them. This query is what makes a completed matching pass re-runnable: anything
    /// already allocated simply does not come back.
    async fn fetch_unallocated_credits(&self, tenant_id: i64) -> Result<Vec<Transaction>, ReconciliationError>;

    async fn fetch_invoice_by_id(&self, tenant_id: i64, invoice_id: i64)
        -> Result<Option<Invoice>, ReconciliationError>;

    async fn fetch_transaction_by_id(&self, transaction_id: i64)
        -> Result<Option<Transaction>, ReconciliationError>;

    /// The non-reversed payment allocated against the given bank transaction, if any.
    async fn fetch_live_payment_for_transaction(
        &self,
        transaction_id: i64,
    ) -> Result<Option<Payment>, ReconciliationError>;

    async fn fetch_payments_for_invoice(&self, invoice_id: i64) -> Result<Vec<Payment>, ReconciliationError>;
}

/// The highest level of behaviour for backends supporting the reconciliation engine: the atomic
/// allocation unit and its undo.
#[allow(async_fn_in_trait)]
pub trait ReconciliationDatabase: Clone + LedgerQueries {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Records a payment and updates the invoice, as one atomic unit:
    /// * re-checks, under the same database transaction, that no non-reversed payment already
    ///   references the bank transaction — if one does, the call is a benign no-op;
    /// * inserts the payment row;
    /// * increments the invoice's paid amount by atomic addition (never assignment) and
    ///   transitions its status to `Paid` when settled, `PartiallyPaid` otherwise. A paid
    ///   invoice is never downgraded and a void invoice is never touched.
    ///
    /// Any failure inside the unit rolls the whole unit back; there is no partially-applied
    /// state and no cancellation point once the unit has begun.
    async fn apply_allocation(&self, payment: NewPayment) -> Result<AllocationOutcome, ReconciliationError>;

    /// Marks a payment as reversed and atomically returns its amount to the invoice's
    /// outstanding balance. This is the one operation that may reopen a `Paid` invoice (back to
    /// `PartiallyPaid`, or `Sent` when nothing remains paid). The consumed document number is
    /// not resurrected. Reversing an already-reversed payment is an error.
    async fn reverse_payment(&self, tenant_id: i64, payment_id: i64) -> Result<Payment, ReconciliationError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), ReconciliationError> {
        Ok(())
    }
}

/// Tenant-and-year-scoped monotonic document-number issuance.
#[allow(async_fn_in_trait)]
pub trait DocumentSequences: Clone {
    /// Returns the next number for the `(tenant, year)` counter. Never returns the same number
    /// twice for a pair, even under concurrent callers from multiple processes: the increment is
    /// a single atomic read-modify-write in storage, not a read-then-write.
    ///
    /// On first use for a pair the counter is seeded, race-safely (upsert-with-max), from the
    /// highest number already consumed by existing `{prefix}-{year}-…` documents for the tenant,
    /// so backfilled and migrated tenants continue their sequence instead of restarting it.
    ///
    /// If storage is unreachable the call fails; callers must never fabricate a number.
    async fn next_document_number(&self, tenant_id: i64, year: i32, prefix: &str)
        -> Result<i64, ReconciliationError>;
}

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("We have an internal database engine problem (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("{0}")]
    Configuration(#[from] ConfigError),
    #[error("The requested invoice {0} does not exist for this tenant")]
    InvoiceNotFound(i64),
    #[error("The requested payment {0} does not exist for this tenant")]
    PaymentNotFound(i64),
    #[error("Payment {0} has already been reversed")]
    PaymentAlreadyReversed(i64),
    #[error("Invalid allocation request: {0}")]
    InvalidAllocation(String),
    #[error("Malformed ledger data: {0}")]
    MalformedData(String),
}

impl From<sqlx::Error> for ReconciliationError {
    fn from(e: sqlx::Error) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}

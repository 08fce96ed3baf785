use crate::db_types::{Invoice, Payment};

//--------------------------------------  AllocationOutcome  ---------------------------------------------------------
/// The result of one atomic allocation attempt.
///
/// Only `Applied` mutated anything. The other variants are normal control flow, not errors: a
/// re-processed transaction lands on `AlreadyAllocated` (the idempotency guarantee) and a race
/// against a void/completed invoice lands on `InvoiceNotPayable` with everything rolled back.
#[derive(Debug, Clone)]
pub enum AllocationOutcome {
    /// The payment was recorded and the invoice updated, as one unit.
    Applied { payment: Payment, invoice: Invoice },
    /// A non-reversed payment already references this transaction; nothing was changed.
    AlreadyAllocated(Payment),
    /// The invoice could not absorb the amount (voided, already settled, or the amount would
    /// push it past its total). Nothing was changed; the transaction remains unallocated.
    InvoiceNotPayable { invoice_id: i64, reason: String },
}

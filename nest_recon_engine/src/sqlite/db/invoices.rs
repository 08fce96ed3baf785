use log::trace;
use nre_common::Cents;
use sqlx::SqliteConnection;

use crate::{db_types::Invoice, traits::ReconciliationError};

/// Invoices that can still receive payments: `Sent` or `PartiallyPaid`, never draft, settled or
/// void ones. Ordered by period start then id for stable candidate ranking.
pub async fn fetch_open_invoices(
    tenant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Invoice>, ReconciliationError> {
    let rows = sqlx::query_as(
        r#"
        SELECT * FROM invoices
        WHERE tenant_id = $1 AND status IN ('Sent', 'PartiallyPaid')
        ORDER BY period_start ASC, id ASC"#,
    )
    .bind(tenant_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn fetch_invoice_by_id(
    tenant_id: i64,
    invoice_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Invoice>, ReconciliationError> {
    let row = sqlx::query_as("SELECT * FROM invoices WHERE id = $1 AND tenant_id = $2")
        .bind(invoice_id)
        .bind(tenant_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// Applies a payment amount to an invoice in one guarded, atomic statement: the paid amount is
/// incremented (never assigned), the status transitions to `Paid` when the invoice is settled
/// and `PartiallyPaid` otherwise.
///
/// The `WHERE` guard refuses void invoices and any increment that would push `amount_paid` past
/// `total` — which also means a `Paid` invoice can never be touched (its headroom is zero), so
/// no status downgrade is possible. Returns `None` when the guard rejected the update; the
/// caller rolls the enclosing database transaction back.
pub async fn apply_amount_paid(
    invoice_id: i64,
    tenant_id: i64,
    amount: Cents,
    conn: &mut SqliteConnection,
) -> Result<Option<Invoice>, ReconciliationError> {
    let amount = amount.value();
    let row: Option<Invoice> = sqlx::query_as(
        r#"
        UPDATE invoices SET
            amount_paid = amount_paid + $1,
            status = CASE WHEN amount_paid + $1 >= total THEN 'Paid' ELSE 'PartiallyPaid' END,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND tenant_id = $3
          AND status != 'Void'
          AND amount_paid + $1 <= total
        RETURNING *"#,
    )
    .bind(amount)
    .bind(invoice_id)
    .bind(tenant_id)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ apply_amount_paid on invoice #{invoice_id}: accepted={}", row.is_some());
    Ok(row)
}

/// Returns a reversed payment's amount to the invoice's outstanding balance. The inverse of
/// [`apply_amount_paid`], and the one place a `Paid` invoice legitimately reopens: back to
/// `PartiallyPaid`, or all the way to `Sent` when nothing remains paid.
pub async fn deduct_amount_paid(
    invoice_id: i64,
    amount: Cents,
    conn: &mut SqliteConnection,
) -> Result<Option<Invoice>, ReconciliationError> {
    let amount = amount.value();
    let row: Option<Invoice> = sqlx::query_as(
        r#"
        UPDATE invoices SET
            amount_paid = amount_paid - $1,
            status = CASE WHEN amount_paid - $1 <= 0 THEN 'Sent' ELSE 'PartiallyPaid' END,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2
          AND status IN ('PartiallyPaid', 'Paid')
          AND amount_paid - $1 >= 0
        RETURNING *"#,
    )
    .bind(amount)
    .bind(invoice_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

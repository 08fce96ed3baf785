use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment},
    traits::ReconciliationError,
};

/// Raised internally when the partial unique index on live transaction allocations fires. The
/// caller treats it as "somebody else got there first", not as a fault.
pub(crate) struct DuplicateAllocation;

pub async fn fetch_live_payment_for_transaction(
    transaction_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, ReconciliationError> {
    let row = sqlx::query_as("SELECT * FROM payments WHERE transaction_id = $1 AND reversed = 0")
        .bind(transaction_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn fetch_payment_by_id(
    payment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, ReconciliationError> {
    let row = sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(payment_id).fetch_optional(conn).await?;
    Ok(row)
}

pub async fn fetch_payments_for_invoice(
    invoice_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, ReconciliationError> {
    let rows = sqlx::query_as("SELECT * FROM payments WHERE invoice_id = $1 ORDER BY id ASC")
        .bind(invoice_id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

/// Inserts a payment row. A unique violation on the live-transaction index is reported as
/// `Err(DuplicateAllocation)` so the allocation unit can abort as a no-op; every other database
/// error propagates as a fault.
pub async fn insert_payment(
    payment: &NewPayment,
    conn: &mut SqliteConnection,
) -> Result<Result<Payment, DuplicateAllocation>, ReconciliationError> {
    let confidence = payment.confidence.map(i64::from);
    let result = sqlx::query_as(
        r#"
        INSERT INTO payments (tenant_id, transaction_id, invoice_id, amount, paid_on, confidence, matched_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *"#,
    )
    .bind(payment.tenant_id)
    .bind(payment.transaction_id)
    .bind(payment.invoice_id)
    .bind(payment.amount)
    .bind(payment.paid_on)
    .bind(confidence)
    .bind(payment.matched_by.to_string())
    .fetch_one(conn)
    .await;
    match result {
        Ok(row) => Ok(Ok(row)),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Ok(Err(DuplicateAllocation)),
        Err(e) => Err(e.into()),
    }
}

pub async fn mark_reversed(payment_id: i64, conn: &mut SqliteConnection) -> Result<Payment, ReconciliationError> {
    let row: Option<Payment> =
        sqlx::query_as("UPDATE payments SET reversed = 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *")
            .bind(payment_id)
            .fetch_optional(conn)
            .await?;
    row.ok_or(ReconciliationError::PaymentNotFound(payment_id))
}

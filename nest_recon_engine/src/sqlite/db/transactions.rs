use sqlx::SqliteConnection;

use crate::{db_types::Transaction, traits::ReconciliationError};

/// Credit-direction, non-deleted transactions for the tenant that have no non-reversed payment.
/// This query is the first half of the idempotency story: an allocated transaction simply never
/// comes back on the next pass.
///
/// Results are ordered by transaction date then id so passes process in a stable order.
pub async fn fetch_unallocated_credits(
    tenant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, ReconciliationError> {
    let rows = sqlx::query_as(
        r#"
        SELECT * FROM transactions t
        WHERE t.tenant_id = $1
          AND t.direction = 'Credit'
          AND t.deleted = 0
          AND NOT EXISTS (
              SELECT 1 FROM payments p
              WHERE p.transaction_id = t.id AND p.reversed = 0
          )
        ORDER BY t.txn_date ASC, t.id ASC"#,
    )
    .bind(tenant_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn fetch_transaction_by_id(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, ReconciliationError> {
    let row = sqlx::query_as("SELECT * FROM transactions WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(row)
}

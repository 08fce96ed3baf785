use log::trace;
use sqlx::SqliteConnection;

use crate::traits::ReconciliationError;

/// Ensures the `(tenant, year)` counter row exists and is at least as far along as the highest
/// number already consumed by existing `{prefix}-{year}-…` documents for the tenant.
///
/// Upsert-with-max in a single statement, so concurrent first-callers (and re-seeding against a
/// counter that is already ahead) are all safe: the counter only ever moves forward.
pub async fn seed_counter(
    tenant_id: i64,
    year: i32,
    prefix: &str,
    conn: &mut SqliteConnection,
) -> Result<(), ReconciliationError> {
    // Counter digits start one past "{prefix}-{yyyy}-"; substr() is 1-based.
    let counter_start = prefix.len() as i64 + 7;
    let like_pattern = format!("{prefix}-{year}-%");
    sqlx::query(
        r#"
        INSERT INTO sequence_counters (tenant_id, year, value)
        SELECT $1, $2, COALESCE(MAX(CAST(substr(document_number, $3) AS INTEGER)), 0)
        FROM invoices
        WHERE tenant_id = $1 AND document_number LIKE $4
        ON CONFLICT (tenant_id, year) DO UPDATE
        SET value = MAX(sequence_counters.value, excluded.value),
            updated_at = CURRENT_TIMESTAMP"#,
    )
    .bind(tenant_id)
    .bind(year)
    .bind(counter_start)
    .bind(like_pattern)
    .execute(conn)
    .await?;
    Ok(())
}

/// The atomic increment-and-return at the heart of number issuance: one indivisible statement
/// that both advances the counter and reports its new value, so no two callers can ever observe
/// the same number. The row must already exist (see [`seed_counter`]).
pub async fn increment_and_return(
    tenant_id: i64,
    year: i32,
    conn: &mut SqliteConnection,
) -> Result<i64, ReconciliationError> {
    let value: i64 = sqlx::query_scalar(
        r#"
        UPDATE sequence_counters
        SET value = value + 1, updated_at = CURRENT_TIMESTAMP
        WHERE tenant_id = $1 AND year = $2
        RETURNING value"#,
    )
    .bind(tenant_id)
    .bind(year)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Counter for tenant #{tenant_id}/{year} advanced to {value}");
    Ok(value)
}

//! Shared scaffolding for the integration tests: throwaway sqlite stores and row seeding.
//! Transactions and invoices are created by external services in production, so the tests seed
//! them with plain SQL rather than through any engine API.

#![allow(dead_code)]

use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite, SqlitePool};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    let pool = SqlitePool::connect(url).await.expect("Error connecting to fresh database");
    migrate!("./src/sqlite/migrations").run(&pool).await.expect("Error running DB migrations");
    pool.close().await;
    info!("🚀️ Test database ready at {url}");
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir().join("nre_test_dbs");
    let _ = std::fs::create_dir_all(&dir);
    format!("sqlite://{}/test_store_{}.db", dir.display(), rand::random::<u64>())
}

/// Inserts an invoice row and returns its id. `period_start` doubles as the due date; matching
/// never looks at due dates.
#[allow(clippy::too_many_arguments)]
pub async fn seed_invoice(
    pool: &SqlitePool,
    tenant_id: i64,
    document_number: &str,
    total: i64,
    amount_paid: i64,
    status: &str,
    period_start: &str,
    child: (&str, &str),
    bill_to: (&str, &str),
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO invoices (
            tenant_id, document_number, total, amount_paid, status, due_date, period_start,
            bill_to_first_name, bill_to_last_name, child_first_name, child_last_name
        ) VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8, $9, $10)
        RETURNING id"#,
    )
    .bind(tenant_id)
    .bind(document_number)
    .bind(total)
    .bind(amount_paid)
    .bind(status)
    .bind(period_start)
    .bind(bill_to.0)
    .bind(bill_to.1)
    .bind(child.0)
    .bind(child.1)
    .fetch_one(pool)
    .await
    .expect("Error seeding invoice")
}

/// Inserts a bank transaction row and returns its id.
pub async fn seed_transaction(
    pool: &SqlitePool,
    tenant_id: i64,
    txn_date: &str,
    description: &str,
    payee: Option<&str>,
    amount: i64,
    direction: &str,
    deleted: bool,
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO transactions (tenant_id, txn_date, description, payee, amount, direction, deleted)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id"#,
    )
    .bind(tenant_id)
    .bind(txn_date)
    .bind(description)
    .bind(payee)
    .bind(amount)
    .bind(direction)
    .bind(deleted)
    .fetch_one(pool)
    .await
    .expect("Error seeding transaction")
}

/// Inserts a live credit transaction, the common case.
pub async fn seed_credit(
    pool: &SqlitePool,
    tenant_id: i64,
    txn_date: &str,
    description: &str,
    amount: i64,
) -> i64 {
    seed_transaction(pool, tenant_id, txn_date, description, None, amount, "Credit", false).await
}

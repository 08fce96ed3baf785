//! # SQLite database methods
//!
//! "Low-level" SQLite interactions live here, as plain functions that take a
//! `&mut SqliteConnection`. Callers obtain a connection from a pool, or open a database
//! transaction when several calls must land atomically, and pass `&mut *tx` through unchanged.
//! Nothing in this module begins or commits transactions itself.

use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod invoices;
pub mod payments;
pub mod sequences;
pub mod transactions;

const SQLITE_DB_URL: &str = "sqlite://data/nestbooks.db";

pub fn db_url() -> String {
    let result = env::var("NRE_DATABASE_URL").unwrap_or_else(|_| {
        info!("NRE_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

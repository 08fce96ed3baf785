//! Backend traits for the reconciliation engine.
//!
//! Specific backends (SQLite by default, Postgres behind a feature) implement these traits to
//! drive the public APIs in [`crate::recon_api`]. Nothing outside the backend modules issues SQL.

mod data_objects;
mod reconciliation_database;

pub use data_objects::AllocationOutcome;
pub use reconciliation_database::{
    DocumentSequences,
    LedgerQueries,
    ReconciliationDatabase,
    ReconciliationError,
};

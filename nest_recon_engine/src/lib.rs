//! NestBooks Reconciliation Engine
//!
//! The reconciliation engine is the core of the NestBooks platform's automated payment handling.
//! It matches unattributed incoming bank credits to outstanding invoices using fuzzy evidence
//! (payer name fragments, amount proximity, date proximity), decides autonomously whether to apply
//! a match or escalate it to a human, and mutates invoice/payment state exactly once under
//! concurrent execution. It also issues the monotonic, tenant-and-year-scoped document numbers
//! that invoices consume.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the default backend, with
//!    Postgres available behind a cargo feature. You should never need to access the database
//!    directly; use the public APIs instead. The exception is the data types stored in the
//!    database, which are defined in [`db_types`] and are public.
//! 2. The pure matching pipeline ([`matching`]): candidate extraction, string similarity,
//!    confidence scoring and the match decision. These functions perform no I/O and are
//!    deterministic, so the auto-apply/escalate policy can be tested in isolation.
//! 3. The engine public API ([`recon_api`]): the per-tenant matching pass and document-number
//!    issuance. Backends implement the traits in [`traits`] to drive these APIs.
//!
//! The engine also emits events when decisions are recorded and when invoices are paid off.
//! Handlers are fire-and-forget: a failing or absent subscriber never blocks or fails an
//! allocation.
pub mod config;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod matching;
mod recon_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use recon_api::{
    numbering_api::DocumentNumberApi,
    recon_flow_api::ReconciliationApi,
    recon_objects::{PassSummary, TransactionOutcome},
};
pub use traits::{
    AllocationOutcome,
    DocumentSequences,
    LedgerQueries,
    ReconciliationDatabase,
    ReconciliationError,
};

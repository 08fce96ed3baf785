use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use log::error;
use nre_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {0}: {1}")]
pub struct ConversionError(&'static str, String);

//--------------------------------------   DocumentNumber    ---------------------------------------------------------
/// The tenant-unique, year-scoped human-readable identifier assigned to an invoice,
/// e.g. `INV-2026-0042`. See [`crate::helpers::doc_number`] for formatting rules.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct DocumentNumber(pub String);

impl FromStr for DocumentNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for DocumentNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for DocumentNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl DocumentNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   EntryDirection    ---------------------------------------------------------
/// Whether a bank ledger entry moves money into or out of the account. Only credits are ever
/// candidates for invoice matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum EntryDirection {
    Credit,
    Debit,
}

impl Display for EntryDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryDirection::Credit => write!(f, "Credit"),
            EntryDirection::Debit => write!(f, "Debit"),
        }
    }
}

impl FromStr for EntryDirection {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Credit" => Ok(Self::Credit),
            "Debit" => Ok(Self::Debit),
            s => Err(ConversionError("entry direction", s.to_string())),
        }
    }
}

//--------------------------------------    InvoiceStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum InvoiceStatus {
    /// The invoice has been created but not yet issued to the billed party.
    Draft,
    /// The invoice has been issued and no payment has been received.
    Sent,
    /// Some, but not all, of the invoice total has been paid.
    PartiallyPaid,
    /// The invoice has been paid in full.
    Paid,
    /// The invoice has been voided. Void invoices are never matching candidates and its document
    /// number is never reused.
    Void,
}

impl Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Draft => write!(f, "Draft"),
            InvoiceStatus::Sent => write!(f, "Sent"),
            InvoiceStatus::PartiallyPaid => write!(f, "PartiallyPaid"),
            InvoiceStatus::Paid => write!(f, "Paid"),
            InvoiceStatus::Void => write!(f, "Void"),
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(Self::Draft),
            "Sent" => Ok(Self::Sent),
            "PartiallyPaid" => Ok(Self::PartiallyPaid),
            "Paid" => Ok(Self::Paid),
            "Void" => Ok(Self::Void),
            s => Err(ConversionError("invoice status", s.to_string())),
        }
    }
}

impl From<String> for InvoiceStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid invoice status: {value}. But this conversion cannot fail. Defaulting to Draft");
            InvoiceStatus::Draft
        })
    }
}

//--------------------------------------      MatchedBy      ---------------------------------------------------------
/// How a payment was attributed to its invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum MatchedBy {
    /// A deterministic matching rule (e.g. an exact reference-number hit).
    Rule,
    /// The confidence-scored matching engine.
    Auto,
    /// A human, via the review workflow.
    Manual,
}

impl Display for MatchedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchedBy::Rule => write!(f, "Rule"),
            MatchedBy::Auto => write!(f, "Auto"),
            MatchedBy::Manual => write!(f, "Manual"),
        }
    }
}

impl FromStr for MatchedBy {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Rule" => Ok(Self::Rule),
            "Auto" => Ok(Self::Auto),
            "Manual" => Ok(Self::Manual),
            s => Err(ConversionError("matched-by", s.to_string())),
        }
    }
}

//--------------------------------------     Transaction     ---------------------------------------------------------
/// A tenant-scoped bank ledger entry, created by bank-statement import. Immutable once imported
/// except for soft deletion; the reconciliation engine only ever reads these.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub tenant_id: i64,
    pub txn_date: NaiveDate,
    pub description: String,
    /// Free-text payee field from the bank feed, when the bank supplies one.
    pub payee: Option<String>,
    /// Always non-negative; [`Transaction::direction`] carries the sign.
    pub amount: Cents,
    pub direction: EntryDirection,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// A transaction is matchable when it is a live (non-deleted) credit for a positive amount.
    /// The fetch queries already filter on this; a violation seen at scoring time indicates
    /// upstream data drift.
    pub fn matchable(&self) -> Result<(), String> {
        if self.deleted {
            return Err("transaction is soft-deleted".to_string());
        }
        if self.direction != EntryDirection::Credit {
            return Err("transaction is not a credit".to_string());
        }
        if self.amount.value() <= 0 {
            return Err(format!("transaction amount {} is not positive", self.amount));
        }
        Ok(())
    }
}

//--------------------------------------       Invoice       ---------------------------------------------------------
/// A tenant-scoped billable document. `bill_to_*` names the billed party (the fee-paying
/// guardian); `child_*` names the billed individual the fees are for. Both feed name-evidence
/// scoring.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub tenant_id: i64,
    pub document_number: DocumentNumber,
    pub total: Cents,
    /// Monotonically non-decreasing. Invariant: `0 <= amount_paid <= total`.
    pub amount_paid: Cents,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    /// Start of the billing period. Used as the proxy for "invoice date" in date-proximity
    /// scoring.
    pub period_start: NaiveDate,
    pub bill_to_first_name: String,
    pub bill_to_last_name: String,
    pub child_first_name: String,
    pub child_last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// The amount still owed on this invoice.
    pub fn outstanding(&self) -> Cents {
        self.total - self.amount_paid
    }
}

//--------------------------------------       Payment       ---------------------------------------------------------
/// A tenant-scoped allocation record linking at most one [`Transaction`] to exactly one
/// [`Invoice`]. Partial settlements are modelled as further payments against the same invoice,
/// never as a split inside one payment. A non-reversed payment's `transaction_id` is unique:
/// a transaction is allocated at most once while not reversed.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub tenant_id: i64,
    /// `None` for manually recorded payments that did not come from a bank feed.
    pub transaction_id: Option<i64>,
    pub invoice_id: i64,
    pub amount: Cents,
    pub paid_on: NaiveDate,
    /// Confidence score (0-100) of the engine decision that created this payment. `None` for
    /// rule-based and manual allocations.
    pub confidence: Option<i64>,
    pub matched_by: MatchedBy,
    pub reversed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewPayment     ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub tenant_id: i64,
    /// The bank transaction this payment allocates, if any.
    pub transaction_id: Option<i64>,
    pub invoice_id: i64,
    pub amount: Cents,
    pub paid_on: NaiveDate,
    pub confidence: Option<u8>,
    pub matched_by: MatchedBy,
}

impl NewPayment {
    pub fn new(tenant_id: i64, invoice_id: i64, amount: Cents, paid_on: NaiveDate) -> Self {
        Self {
            tenant_id,
            transaction_id: None,
            invoice_id,
            amount,
            paid_on,
            confidence: None,
            matched_by: MatchedBy::Manual,
        }
    }

    pub fn for_transaction(mut self, transaction_id: i64) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = Some(confidence);
        self.matched_by = MatchedBy::Auto;
        self
    }
}

//--------------------------------------   SequenceCounter   ---------------------------------------------------------
/// A tenant-and-year-scoped monotonic counter row. `value` is the last issued number. Lazily
/// created on first use, incremented exactly once per issued number, never decremented, and never
/// reused even if the document that consumed a number is later voided.
#[derive(Debug, Clone, FromRow)]
pub struct SequenceCounter {
    pub tenant_id: i64,
    pub year: i32,
    pub value: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

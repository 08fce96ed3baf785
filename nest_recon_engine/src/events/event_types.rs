use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Invoice, Payment},
    matching::{DecisionKind, MatchCandidate},
};

//--------------------------------------  DecisionRecordedEvent  -----------------------------------------------------
/// The audit record for one matching decision. Every processed transaction emits exactly one of
/// these, whatever the outcome, carrying enough evidence that a human can review the call
/// without re-deriving it. Delivery is best-effort: a failing audit sink never blocks or fails
/// the allocation itself.
#[derive(Debug, Clone)]
pub struct DecisionRecordedEvent {
    pub tenant_id: i64,
    pub transaction_id: i64,
    pub decision: DecisionKind,
    /// The invoice that was (or would be) allocated, for auto-apply decisions.
    pub invoice_id: Option<i64>,
    /// The winning candidate's score, when there was one.
    pub score: Option<u8>,
    /// The full ranked candidate list with per-candidate reasons.
    pub candidates: Vec<MatchCandidate>,
}

impl DecisionRecordedEvent {
    /// Serialisable summary line for structured audit sinks.
    pub fn summary(&self) -> AuditSummary {
        AuditSummary {
            tenant_id: self.tenant_id,
            transaction_id: self.transaction_id,
            decision: self.decision,
            invoice_id: self.invoice_id,
            score: self.score,
            reasons: self.candidates.iter().flat_map(|c| c.reasons.iter().cloned()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSummary {
    pub tenant_id: i64,
    pub transaction_id: i64,
    pub decision: DecisionKind,
    pub invoice_id: Option<i64>,
    pub score: Option<u8>,
    pub reasons: Vec<String>,
}

//--------------------------------------   InvoicePaidEvent   --------------------------------------------------------
/// Fires when an allocation settles an invoice in full. This is the seam the (external) receipt
/// and notification delivery hangs off.
#[derive(Debug, Clone)]
pub struct InvoicePaidEvent {
    pub invoice: Invoice,
    pub payment: Payment,
}

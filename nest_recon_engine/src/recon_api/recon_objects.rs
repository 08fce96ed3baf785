use std::fmt::Display;

use crate::{
    db_types::{Invoice, Payment},
    matching::MatchCandidate,
};

//--------------------------------------  TransactionOutcome  --------------------------------------------------------
/// The terminal state of one transaction within a matching pass. Exactly one outcome is produced
/// per fetched transaction; a transaction is never half-processed (the allocation unit is atomic
/// and everything before it is pure computation).
#[derive(Debug, Clone)]
pub enum TransactionOutcome {
    /// A single high-confidence candidate was allocated automatically.
    AutoApplied { transaction_id: i64, payment: Payment, invoice: Invoice, score: u8, reasons: Vec<String> },
    /// Viable candidates exist but none could be applied autonomously. The ranked list, with
    /// per-candidate reasons, goes to the human review surface.
    ReviewRequired { transaction_id: i64, candidates: Vec<MatchCandidate> },
    /// No invoice met the candidate threshold.
    NoMatch { transaction_id: i64 },
    /// The transaction turned out to be allocated already (a concurrent pass or a re-run).
    /// Benign; nothing was changed.
    AlreadyAllocated { transaction_id: i64, payment_id: i64 },
    /// The transaction (or its chosen invoice) was not in a processable state. Skipped with a
    /// recorded reason; never fatal to the batch.
    Skipped { transaction_id: i64, reason: String },
    /// A genuine fault (storage unavailable, malformed persisted data) stopped this
    /// transaction's processing. The rest of the batch continues.
    Errored { transaction_id: i64, error: String },
}

impl TransactionOutcome {
    pub fn transaction_id(&self) -> i64 {
        match self {
            TransactionOutcome::AutoApplied { transaction_id, .. }
            | TransactionOutcome::ReviewRequired { transaction_id, .. }
            | TransactionOutcome::NoMatch { transaction_id }
            | TransactionOutcome::AlreadyAllocated { transaction_id, .. }
            | TransactionOutcome::Skipped { transaction_id, .. }
            | TransactionOutcome::Errored { transaction_id, .. } => *transaction_id,
        }
    }
}

//--------------------------------------     PassSummary      --------------------------------------------------------
/// What a matching pass hands back to the operator: aggregate counts, plus the full
/// per-transaction outcomes so review items arrive with their ranked candidates and reasons
/// attached.
#[derive(Debug, Clone, Default)]
pub struct PassSummary {
    pub tenant_id: i64,
    pub auto_applied: usize,
    pub review_required: usize,
    pub no_match: usize,
    pub already_allocated: usize,
    pub skipped: usize,
    pub errored: usize,
    pub outcomes: Vec<TransactionOutcome>,
}

impl PassSummary {
    pub fn new(tenant_id: i64) -> Self {
        Self { tenant_id, ..Default::default() }
    }

    pub fn record(&mut self, outcome: TransactionOutcome) {
        match &outcome {
            TransactionOutcome::AutoApplied { .. } => self.auto_applied += 1,
            TransactionOutcome::ReviewRequired { .. } => self.review_required += 1,
            TransactionOutcome::NoMatch { .. } => self.no_match += 1,
            TransactionOutcome::AlreadyAllocated { .. } => self.already_allocated += 1,
            TransactionOutcome::Skipped { .. } => self.skipped += 1,
            TransactionOutcome::Errored { .. } => self.errored += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }
}

impl Display for PassSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tenant #{}: {} processed ({} auto-applied, {} review, {} no-match, {} already allocated, {} skipped, \
             {} errored)",
            self.tenant_id,
            self.processed(),
            self.auto_applied,
            self.review_required,
            self.no_match,
            self.already_allocated,
            self.skipped,
            self.errored
        )
    }
}

//! Confidence scoring for (transaction, invoice) pairs.
//!
//! Three independent evidence sources are summed into a 0-100 score with human-readable reasons:
//! payer-name similarity (max 40), amount proximity to the invoice's outstanding balance
//! (max 40), and date proximity to the billing period (max 10). All tunables are named constants
//! or [`MatchingConfig`] fields so the bands can be tested across a range; nothing is inlined at
//! a call site.

use nre_common::Cents;

use crate::{
    config::MatchingConfig,
    db_types::{Invoice, Transaction},
    matching::{
        extractor::extract_candidates,
        similarity::{normalize, similarity},
    },
};

/// Weighted name targets, strongest first: the child the fees are for, then the fee-paying
/// guardian. A hit on the child's first name is worth more than one on the guardian's surname
/// because bank narratives overwhelmingly carry the child's name.
const CHILD_FIRST_NAME_WEIGHT: f64 = 40.0;
const CHILD_LAST_NAME_WEIGHT: f64 = 35.0;
const BILL_TO_FIRST_NAME_WEIGHT: f64 = 30.0;
const BILL_TO_LAST_NAME_WEIGHT: f64 = 25.0;

/// Similarity below this floor is noise, not evidence.
const NAME_SIMILARITY_FLOOR: f64 = 0.6;
/// Target names shorter than this ("Jo", "Li") match half the alphabet and are ignored.
const MIN_TARGET_NAME_LEN: usize = 3;

const AMOUNT_EXACT_SCORE: u8 = 40;
const AMOUNT_CLOSE_SCORE: u8 = 30;
const AMOUNT_CLOSE_PCT: f64 = 0.05;
const AMOUNT_NEAR_SCORE: u8 = 20;
const AMOUNT_NEAR_PCT: f64 = 0.15;
const AMOUNT_PARTIAL_SCORE: u8 = 10;

const DATE_NEAR_DAYS: i64 = 30;
const DATE_NEAR_SCORE: u8 = 10;
const DATE_FAR_DAYS: i64 = 60;
const DATE_FAR_SCORE: u8 = 5;

const MAX_SCORE: u8 = 100;

//--------------------------------------    MatchCandidate   ---------------------------------------------------------
/// The scored evidence for one (transaction, invoice) pair. Transient: candidates exist only
/// within a single matching pass and are never persisted.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub invoice_id: i64,
    pub document_number: String,
    /// Combined evidence score, 0-100.
    pub score: u8,
    /// Human-readable evidence trail for the review surface and the audit record.
    pub reasons: Vec<String>,
    /// The invoice's outstanding balance at scoring time.
    pub outstanding: Cents,
}

/// Score one invoice against a transaction's candidate tokens. Returns `None` when the invoice
/// has nothing outstanding (fully paid or over-credited rows are not candidates at all).
pub fn score_invoice(tx: &Transaction, tokens: &[String], invoice: &Invoice) -> Option<MatchCandidate> {
    let outstanding = invoice.outstanding();
    if outstanding.value() <= 0 {
        return None;
    }

    let mut score = 0u16;
    let mut reasons = Vec::new();

    if let Some((name_score, reason)) = name_evidence(tokens, invoice) {
        score += u16::from(name_score);
        reasons.push(reason);
    }
    if let Some((amount_score, reason)) = amount_evidence(tx.amount, outstanding) {
        score += u16::from(amount_score);
        reasons.push(reason);
    }
    if let Some((date_score, reason)) = date_evidence(tx, invoice) {
        score += u16::from(date_score);
        reasons.push(reason);
    }

    let score = score.min(u16::from(MAX_SCORE)) as u8;
    Some(MatchCandidate {
        invoice_id: invoice.id,
        document_number: invoice.document_number.to_string(),
        score,
        reasons,
        outstanding,
    })
}

/// Rank all open invoices against one transaction. Invoices scoring below the configured
/// candidate threshold are dropped entirely, not just ranked low. The result is ordered by score
/// descending, then invoice id ascending, so review lists are deterministic across runs.
pub fn rank_candidates(tx: &Transaction, invoices: &[Invoice], config: &MatchingConfig) -> Vec<MatchCandidate> {
    let tokens = extract_candidates(&tx.description, tx.payee.as_deref());
    let mut candidates: Vec<MatchCandidate> = invoices
        .iter()
        .filter_map(|invoice| score_invoice(tx, &tokens, invoice))
        .filter(|c| c.score >= config.candidate_threshold)
        .collect();
    candidates.sort_by(|a, b| b.score.cmp(&a.score).then(a.invoice_id.cmp(&b.invoice_id)));
    candidates
}

/// Best single name hit across all (token, target) pairs. A token must *contain* the normalised
/// target name before similarity is even consulted, which keeps "NAIDOO" from scoring against
/// every surname sharing a few letters.
fn name_evidence(tokens: &[String], invoice: &Invoice) -> Option<(u8, String)> {
    let targets = [
        (&invoice.child_first_name, CHILD_FIRST_NAME_WEIGHT, "child first name"),
        (&invoice.child_last_name, CHILD_LAST_NAME_WEIGHT, "child last name"),
        (&invoice.bill_to_first_name, BILL_TO_FIRST_NAME_WEIGHT, "billed-party first name"),
        (&invoice.bill_to_last_name, BILL_TO_LAST_NAME_WEIGHT, "billed-party last name"),
    ];
    let mut best: Option<(u8, String)> = None;
    for token in tokens {
        let token_norm = normalize(token);
        for (target, weight, label) in &targets {
            let target_norm = normalize(target);
            if target_norm.len() < MIN_TARGET_NAME_LEN || !token_norm.contains(&target_norm) {
                continue;
            }
            let sim = similarity(token, target);
            if sim <= NAME_SIMILARITY_FLOOR {
                continue;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let candidate = (sim * weight).round() as u8;
            if best.as_ref().map(|(b, _)| candidate > *b).unwrap_or(true) {
                let reason = format!("matched {label} '{target}' (similarity {sim:.2})");
                best = Some((candidate, reason));
            }
        }
    }
    best
}

fn amount_evidence(amount: Cents, outstanding: Cents) -> Option<(u8, String)> {
    let diff = (amount.value() - outstanding.value()).abs();
    if diff == 0 {
        return Some((AMOUNT_EXACT_SCORE, format!("amount exactly matches outstanding {outstanding}")));
    }
    let pct = diff as f64 / outstanding.value() as f64;
    if pct <= AMOUNT_CLOSE_PCT {
        return Some((AMOUNT_CLOSE_SCORE, format!("amount within 5% of outstanding {outstanding}")));
    }
    if pct <= AMOUNT_NEAR_PCT {
        return Some((AMOUNT_NEAR_SCORE, format!("amount within 15% of outstanding {outstanding}")));
    }
    if amount < outstanding {
        return Some((AMOUNT_PARTIAL_SCORE, format!("amount {amount} is a possible partial payment")));
    }
    None
}

fn date_evidence(tx: &Transaction, invoice: &Invoice) -> Option<(u8, String)> {
    let days = (tx.txn_date - invoice.period_start).num_days().abs();
    if days <= DATE_NEAR_DAYS {
        Some((DATE_NEAR_SCORE, format!("transaction within {DATE_NEAR_DAYS} days of billing period")))
    } else if days <= DATE_FAR_DAYS {
        Some((DATE_FAR_SCORE, format!("transaction within {DATE_FAR_DAYS} days of billing period")))
    } else {
        None
    }
}

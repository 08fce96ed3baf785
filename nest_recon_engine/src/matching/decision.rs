//! The match decision policy.
//!
//! A pure function over an already-ranked candidate list. No "first match wins" shortcuts: the
//! policy sees every thresholded candidate, so an ambiguous high-confidence tie escalates to a
//! human instead of auto-applying the wrong invoice.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{config::MatchingConfig, matching::confidence::MatchCandidate};

//--------------------------------------      Decision       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub enum Decision {
    /// No invoice met the candidate threshold. The transaction stays unallocated.
    NoMatch,
    /// Exactly one candidate met the auto-apply threshold: allocate it without human review.
    AutoApply(MatchCandidate),
    /// At least one viable candidate, but none — or more than one — cleared the auto-apply
    /// threshold. The ranked list goes to the review surface.
    ReviewRequired(Vec<MatchCandidate>),
}

impl Decision {
    pub fn kind(&self) -> DecisionKind {
        match self {
            Decision::NoMatch => DecisionKind::NoMatch,
            Decision::AutoApply(_) => DecisionKind::AutoApply,
            Decision::ReviewRequired(_) => DecisionKind::ReviewRequired,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionKind {
    AutoApply,
    ReviewRequired,
    NoMatch,
}

impl Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionKind::AutoApply => write!(f, "AutoApply"),
            DecisionKind::ReviewRequired => write!(f, "ReviewRequired"),
            DecisionKind::NoMatch => write!(f, "NoMatch"),
        }
    }
}

/// Decide the outcome for one transaction given its ranked candidates.
///
/// `ranked` must be sorted score-descending (see
/// [`rank_candidates`](crate::matching::confidence::rank_candidates)); when exactly one candidate
/// clears the auto-apply threshold it is therefore the head of the list.
pub fn decide(ranked: &[MatchCandidate], config: &MatchingConfig) -> Decision {
    if ranked.is_empty() {
        return Decision::NoMatch;
    }
    let above = ranked.iter().filter(|c| c.score >= config.auto_apply_threshold).count();
    if above == 1 {
        Decision::AutoApply(ranked[0].clone())
    } else {
        Decision::ReviewRequired(ranked.to_vec())
    }
}

#[cfg(test)]
mod test {
    use nre_common::Cents;

    use super::*;

    fn candidate(invoice_id: i64, score: u8) -> MatchCandidate {
        MatchCandidate {
            invoice_id,
            document_number: format!("INV-2026-{invoice_id:04}"),
            score,
            reasons: vec![format!("synthetic evidence ({score})")],
            outstanding: Cents::from(100_000),
        }
    }

    fn config() -> MatchingConfig {
        MatchingConfig::default()
    }

    #[test]
    fn empty_list_is_no_match() {
        assert!(matches!(decide(&[], &config()), Decision::NoMatch));
    }

    #[test]
    fn single_high_confidence_candidate_auto_applies() {
        let ranked = vec![candidate(1, 90), candidate(2, 55)];
        match decide(&ranked, &config()) {
            Decision::AutoApply(chosen) => assert_eq!(chosen.invoice_id, 1),
            other => panic!("expected AutoApply, got {:?}", other.kind()),
        }
    }

    #[test]
    fn exactly_at_threshold_auto_applies() {
        let ranked = vec![candidate(1, 70)];
        assert_eq!(decide(&ranked, &config()).kind(), DecisionKind::AutoApply);
    }

    #[test]
    fn high_confidence_tie_requires_review() {
        // Both clear the auto-apply threshold; applying either would be a guess
        let ranked = vec![candidate(1, 75), candidate(2, 75)];
        match decide(&ranked, &config()) {
            Decision::ReviewRequired(candidates) => assert_eq!(candidates.len(), 2),
            other => panic!("expected ReviewRequired, got {:?}", other.kind()),
        }
    }

    #[test]
    fn medium_confidence_candidates_require_review() {
        let ranked = vec![candidate(1, 60), candidate(2, 45)];
        assert_eq!(decide(&ranked, &config()).kind(), DecisionKind::ReviewRequired);
    }

    #[test]
    fn thresholds_come_from_configuration() {
        let mut config = config();
        config.auto_apply_threshold = 95;
        let ranked = vec![candidate(1, 90)];
        // 90 would auto-apply under the default threshold, but not under a stricter one
        assert_eq!(decide(&ranked, &config).kind(), DecisionKind::ReviewRequired);
    }
}

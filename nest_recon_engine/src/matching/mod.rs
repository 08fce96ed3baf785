//! The pure matching pipeline: candidate extraction, string similarity, confidence scoring and
//! the match decision. Nothing in this module performs I/O or blocks; everything is deterministic
//! and unit-tested in isolation from the data-access layer.

pub mod confidence;
pub mod decision;
pub mod extractor;
pub mod similarity;

pub use confidence::{rank_candidates, score_invoice, MatchCandidate};
pub use decision::{decide, Decision, DecisionKind};
pub use extractor::extract_candidates;
pub use similarity::{normalize, similarity};

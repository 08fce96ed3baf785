//! Engine configuration.
//!
//! Everything is environment-driven with `NRE_` prefixes, the same way the rest of the NestBooks
//! services are configured. Threshold settings are load-bearing for correctness and are therefore
//! *fatal* when present-but-invalid or when they fail validation: a matching pass refuses to run
//! with undefined thresholds. Operational settings (concurrency, document prefix) fall back to
//! defaults with a logged warning.

use std::env;

use log::*;
use thiserror::Error;

/// Minimum combined evidence score for an invoice to be considered a candidate at all.
pub const DEFAULT_CANDIDATE_THRESHOLD: u8 = 40;
/// Minimum score for a sole surviving candidate to be allocated without human review.
pub const DEFAULT_AUTO_APPLY_THRESHOLD: u8 = 70;
const DEFAULT_MAX_CONCURRENT_TRANSACTIONS: usize = 8;
const DEFAULT_TRANSACTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DOCUMENT_PREFIX: &str = "INV";

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Invalid threshold configuration: {0}")]
    InvalidThreshold(String),
    #[error("Invalid document prefix: {0}")]
    InvalidDocumentPrefix(String),
}

//--------------------------------------   MatchingConfig    ---------------------------------------------------------
/// Tunable policy for the matching pass.
///
/// Both thresholds are deliberately configuration rather than constants: operational configs have
/// historically disagreed about the auto-apply cutoff (a 70-point cutoff in one deployment and an
/// 80-point one in another), so the engine takes an explicit value instead of baking either in.
/// The defaults here are the reference values, not a resolution of that disagreement.
#[derive(Clone, Debug)]
pub struct MatchingConfig {
    /// Candidates scoring below this are dropped entirely (`NRE_CANDIDATE_THRESHOLD`).
    pub candidate_threshold: u8,
    /// A sole candidate at or above this score is allocated automatically
    /// (`NRE_AUTO_APPLY_THRESHOLD`).
    pub auto_apply_threshold: u8,
    /// Upper bound on transactions processed concurrently within one pass
    /// (`NRE_MAX_CONCURRENT_TRANSACTIONS`).
    pub max_concurrent_transactions: usize,
    /// Per-transaction processing deadline (`NRE_TRANSACTION_TIMEOUT_SECS`). The timeout applies
    /// to each transaction individually, never to the batch, so one slow lookup cannot stall
    /// unrelated transactions.
    pub transaction_timeout: std::time::Duration,
    /// Document-number prefix for issued invoice numbers (`NRE_DOCUMENT_PREFIX`).
    pub document_prefix: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            candidate_threshold: DEFAULT_CANDIDATE_THRESHOLD,
            auto_apply_threshold: DEFAULT_AUTO_APPLY_THRESHOLD,
            max_concurrent_transactions: DEFAULT_MAX_CONCURRENT_TRANSACTIONS,
            transaction_timeout: std::time::Duration::from_secs(DEFAULT_TRANSACTION_TIMEOUT_SECS),
            document_prefix: DEFAULT_DOCUMENT_PREFIX.to_string(),
        }
    }
}

impl MatchingConfig {
    /// Builds the configuration from environment variables.
    ///
    /// Missing thresholds take the reference defaults; thresholds that are set but unparseable,
    /// or that fail [`validate`](Self::validate), are an error — better to refuse to run than to
    /// match with undefined policy.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        let candidate_threshold =
            parse_threshold("NRE_CANDIDATE_THRESHOLD", env::var("NRE_CANDIDATE_THRESHOLD").ok(), DEFAULT_CANDIDATE_THRESHOLD)?;
        let auto_apply_threshold = parse_threshold(
            "NRE_AUTO_APPLY_THRESHOLD",
            env::var("NRE_AUTO_APPLY_THRESHOLD").ok(),
            DEFAULT_AUTO_APPLY_THRESHOLD,
        )?;
        let max_concurrent_transactions = env::var("NRE_MAX_CONCURRENT_TRANSACTIONS")
            .ok()
            .and_then(|s| {
                s.parse::<usize>()
                    .map_err(|e| warn!("🪛️ Invalid NRE_MAX_CONCURRENT_TRANSACTIONS ({s}): {e}. Using the default."))
                    .ok()
            })
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_CONCURRENT_TRANSACTIONS);
        let transaction_timeout = env::var("NRE_TRANSACTION_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid NRE_TRANSACTION_TIMEOUT_SECS ({s}): {e}. Using the default."))
                    .ok()
            })
            .filter(|n| *n > 0)
            .map(std::time::Duration::from_secs)
            .unwrap_or(std::time::Duration::from_secs(DEFAULT_TRANSACTION_TIMEOUT_SECS));
        let document_prefix = env::var("NRE_DOCUMENT_PREFIX").unwrap_or_else(|_| {
            info!("🪛️ NRE_DOCUMENT_PREFIX is not set. Using '{DEFAULT_DOCUMENT_PREFIX}'.");
            DEFAULT_DOCUMENT_PREFIX.to_string()
        });
        let config = Self {
            candidate_threshold,
            auto_apply_threshold,
            max_concurrent_transactions,
            transaction_timeout,
            document_prefix,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sanity checks that hold regardless of where the values came from. Called at batch start;
    /// a failure aborts the pass before any transaction is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auto_apply_threshold > 100 {
            return Err(ConfigError::InvalidThreshold(format!(
                "auto-apply threshold {} exceeds the maximum score of 100",
                self.auto_apply_threshold
            )));
        }
        if self.candidate_threshold > self.auto_apply_threshold {
            return Err(ConfigError::InvalidThreshold(format!(
                "candidate threshold {} exceeds auto-apply threshold {}",
                self.candidate_threshold, self.auto_apply_threshold
            )));
        }
        if self.document_prefix.is_empty() || !self.document_prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::InvalidDocumentPrefix(format!(
                "'{}' must be non-empty and alphanumeric",
                self.document_prefix
            )));
        }
        Ok(())
    }
}

fn parse_threshold(name: &str, value: Option<String>, default: u8) -> Result<u8, ConfigError> {
    match value {
        None => {
            info!("🪛️ {name} is not set. Using the reference value of {default}.");
            Ok(default)
        },
        Some(s) => s
            .trim()
            .parse::<u8>()
            .map_err(|e| ConfigError::InvalidThreshold(format!("{name}={s} is not a valid score: {e}"))),
    }
}

use std::fmt::Debug;

use chrono::NaiveDate;
use futures_util::{stream, StreamExt};
use log::*;
use nre_common::Cents;

use crate::{
    config::MatchingConfig,
    db_types::{Invoice, InvoiceStatus, NewPayment, Payment, Transaction},
    events::{DecisionRecordedEvent, EventProducers, InvoicePaidEvent},
    matching::{decide, rank_candidates, Decision, MatchCandidate},
    recon_api::recon_objects::{PassSummary, TransactionOutcome},
    traits::{AllocationOutcome, ReconciliationDatabase, ReconciliationError},
};

/// `ReconciliationApi` is the primary API for the automated matching flow: it runs the
/// per-tenant batch pass that scores unallocated bank credits against open invoices, applies the
/// unambiguous winners and escalates the rest.
pub struct ReconciliationApi<B> {
    db: B,
    config: MatchingConfig,
    producers: EventProducers,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B, config: MatchingConfig, producers: EventProducers) -> Self {
        Self { db, config, producers }
    }
}

impl<B> ReconciliationApi<B>
where B: ReconciliationDatabase
{
    /// Runs one matching pass over the tenant's unallocated credit transactions.
    ///
    /// Invalid threshold configuration aborts here, before any transaction is touched.
    /// Transactions are processed independently and concurrently (up to the configured pool
    /// limit), each against its own deadline; one slow or faulty transaction never takes the
    /// batch down with it. The pass is safely re-runnable: anything already allocated is simply
    /// not fetched again, and the allocation unit's own duplicate check covers the race windows
    /// the query cannot see.
    pub async fn run_matching_pass(&self, tenant_id: i64) -> Result<PassSummary, ReconciliationError> {
        self.config.validate()?;
        let invoices = self.db.fetch_open_invoices(tenant_id).await?;
        let credits = self.db.fetch_unallocated_credits(tenant_id).await?;
        info!(
            "🔄️ Matching pass for tenant #{tenant_id}: {} unallocated credits against {} open invoices",
            credits.len(),
            invoices.len()
        );
        let outcomes: Vec<TransactionOutcome> = stream::iter(credits.into_iter().map(|tx| {
            let invoices = &invoices;
            async move {
                let transaction_id = tx.id;
                match tokio::time::timeout(self.config.transaction_timeout, self.process_transaction(tx, invoices))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        error!("🔄️ Transaction #{transaction_id} hit its processing deadline and was abandoned");
                        TransactionOutcome::Errored {
                            transaction_id,
                            error: "processing deadline exceeded".to_string(),
                        }
                    },
                }
            }
        }))
        .buffer_unordered(self.config.max_concurrent_transactions)
        .collect()
        .await;

        let mut summary = PassSummary::new(tenant_id);
        for outcome in outcomes {
            summary.record(outcome);
        }
        info!("🔄️ Matching pass complete. {summary}");
        Ok(summary)
    }

    /// Processes a single transaction to completion: score, decide, and (for an unambiguous
    /// winner) allocate. Every decision is published to the audit hook, whatever the outcome.
    async fn process_transaction(&self, tx: Transaction, invoices: &[Invoice]) -> TransactionOutcome {
        let transaction_id = tx.id;
        if let Err(reason) = tx.matchable() {
            warn!("🔄️ Transaction #{transaction_id} skipped: {reason}");
            return TransactionOutcome::Skipped { transaction_id, reason };
        }
        let ranked = rank_candidates(&tx, invoices, &self.config);
        let decision = decide(&ranked, &self.config);
        self.publish_decision(&tx, &decision, &ranked).await;
        match decision {
            Decision::NoMatch => {
                debug!("🔄️ Transaction #{transaction_id}: no candidate met the threshold");
                TransactionOutcome::NoMatch { transaction_id }
            },
            Decision::ReviewRequired(candidates) => {
                debug!(
                    "🔄️ Transaction #{transaction_id}: {} candidate(s) escalated for review",
                    candidates.len()
                );
                TransactionOutcome::ReviewRequired { transaction_id, candidates }
            },
            Decision::AutoApply(candidate) => self.apply_winner(&tx, candidate).await,
        }
    }

    /// Allocates the winning candidate. The allocated amount is capped at the invoice's
    /// outstanding balance so the invoice invariant holds structurally; any overpaid remainder
    /// stays unallocated for the review workflow.
    async fn apply_winner(&self, tx: &Transaction, candidate: MatchCandidate) -> TransactionOutcome {
        let transaction_id = tx.id;
        let amount = tx.amount.min(candidate.outstanding);
        let new_payment = NewPayment::new(tx.tenant_id, candidate.invoice_id, amount, tx.txn_date)
            .for_transaction(transaction_id)
            .with_confidence(candidate.score);
        match self.db.apply_allocation(new_payment).await {
            Ok(AllocationOutcome::Applied { payment, invoice }) => {
                debug!(
                    "🔄️💰️ Transaction #{transaction_id} auto-applied to invoice {} at confidence {}",
                    invoice.document_number, candidate.score
                );
                if invoice.status == InvoiceStatus::Paid {
                    self.call_invoice_paid_hook(&invoice, &payment).await;
                }
                TransactionOutcome::AutoApplied {
                    transaction_id,
                    payment,
                    invoice,
                    score: candidate.score,
                    reasons: candidate.reasons,
                }
            },
            Ok(AllocationOutcome::AlreadyAllocated(payment)) => {
                debug!(
                    "🔄️ Transaction #{transaction_id} was already allocated by payment #{}. No action taken.",
                    payment.id
                );
                TransactionOutcome::AlreadyAllocated { transaction_id, payment_id: payment.id }
            },
            Ok(AllocationOutcome::InvoiceNotPayable { invoice_id, reason }) => {
                info!(
                    "🔄️ Transaction #{transaction_id}: invoice #{invoice_id} became unpayable mid-pass ({reason}). \
                     The transaction stays unallocated."
                );
                TransactionOutcome::Skipped { transaction_id, reason }
            },
            Err(e) => {
                error!("🔄️ Transaction #{transaction_id} failed to allocate: {e}");
                TransactionOutcome::Errored { transaction_id, error: e.to_string() }
            },
        }
    }

    /// Best-effort audit record for a decision. A failing or absent sink is logged inside the
    /// producer and never surfaces here.
    async fn publish_decision(&self, tx: &Transaction, decision: &Decision, ranked: &[MatchCandidate]) {
        if self.producers.decision_recorded_producer.is_empty() {
            return;
        }
        let (invoice_id, score) = match decision {
            Decision::AutoApply(candidate) => (Some(candidate.invoice_id), Some(candidate.score)),
            _ => (None, ranked.first().map(|c| c.score)),
        };
        let event = DecisionRecordedEvent {
            tenant_id: tx.tenant_id,
            transaction_id: tx.id,
            decision: decision.kind(),
            invoice_id,
            score,
            candidates: ranked.to_vec(),
        };
        for emitter in &self.producers.decision_recorded_producer {
            trace!("📬️ Publishing {} decision for transaction #{}", decision.kind(), tx.id);
            emitter.publish_event(event.clone()).await;
        }
    }

    /// The human-review workflow's write path: records a payment a person attributed, through
    /// the same atomic allocation unit the automatic path uses. `transaction_id` is `None` for
    /// deposits that never came from a bank feed. No confidence score applies.
    pub async fn record_manual_payment(
        &self,
        tenant_id: i64,
        invoice_id: i64,
        amount: Cents,
        paid_on: NaiveDate,
        transaction_id: Option<i64>,
    ) -> Result<AllocationOutcome, ReconciliationError> {
        let mut new_payment = NewPayment::new(tenant_id, invoice_id, amount, paid_on);
        if let Some(txid) = transaction_id {
            new_payment = new_payment.for_transaction(txid);
        }
        let outcome = self.db.apply_allocation(new_payment).await?;
        if let AllocationOutcome::Applied { payment, invoice } = &outcome {
            debug!("🔄️ Manual payment #{} recorded against invoice {}", payment.id, invoice.document_number);
            if invoice.status == InvoiceStatus::Paid {
                self.call_invoice_paid_hook(invoice, payment).await;
            }
        }
        Ok(outcome)
    }

    /// Undoes a bad allocation: marks the payment reversed and returns its amount to the
    /// invoice's outstanding balance. The freed transaction becomes matchable again on the next
    /// pass.
    pub async fn reverse_payment(&self, tenant_id: i64, payment_id: i64) -> Result<Payment, ReconciliationError> {
        self.db.reverse_payment(tenant_id, payment_id).await
    }

    async fn call_invoice_paid_hook(&self, invoice: &Invoice, payment: &Payment) {
        for emitter in &self.producers.invoice_paid_producer {
            debug!("📬️ Notifying invoice-paid hook subscribers for {}", invoice.document_number);
            let event = InvoicePaidEvent { invoice: invoice.clone(), payment: payment.clone() };
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }
}

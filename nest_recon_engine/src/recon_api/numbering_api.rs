use std::fmt::Debug;

use log::trace;

use crate::{
    config::MatchingConfig,
    db_types::DocumentNumber,
    helpers::format_document_number,
    traits::{DocumentSequences, ReconciliationError},
};

/// `DocumentNumberApi` issues formatted invoice numbers from the tenant-and-year-scoped
/// counters. The counter advance happens in storage as a single atomic increment-and-return;
/// this API only adds the pure formatting on top. If the counter cannot be advanced the error
/// propagates — a document number is never fabricated client-side.
pub struct DocumentNumberApi<B> {
    db: B,
    config: MatchingConfig,
}

impl<B: Debug> Debug for DocumentNumberApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentNumberApi ({:?})", self.db)
    }
}

impl<B> DocumentNumberApi<B>
where B: DocumentSequences
{
    pub fn new(db: B, config: MatchingConfig) -> Self {
        Self { db, config }
    }

    /// Issues the next document number for the tenant and year, e.g. `INV-2026-0042`.
    pub async fn next_invoice_number(
        &self,
        tenant_id: i64,
        year: i32,
    ) -> Result<DocumentNumber, ReconciliationError> {
        let prefix = &self.config.document_prefix;
        let counter = self.db.next_document_number(tenant_id, year, prefix).await?;
        let number = format_document_number(prefix, year, counter);
        trace!("🔢️ Issued {number} to tenant #{tenant_id}");
        Ok(number)
    }
}

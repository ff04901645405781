use spendsort_core::{TransactionBatch, TransactionId};
use spendsort_storage::{CategoryStore, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("Transaction not found: {0}")]
    UnknownTransaction(TransactionId),
    #[error("Category not found: {0}")]
    UnknownCategory(String),
    #[error("Failed to persist categories: {0}")]
    Store(#[from] StoreError),
}

/// A user's request to move one transaction into another category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub id: TransactionId,
    pub category: String,
}

impl Correction {
    pub fn new(id: TransactionId, category: impl Into<String>) -> Self {
        Self {
            id,
            category: category.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Unchanged,
    Recategorized,
    Learned,
}

#[derive(Debug, Default)]
pub struct CorrectionReport {
    /// Transactions whose category actually changed.
    pub recategorized: usize,
    /// Corrections that added a keyword to the store.
    pub learned: usize,
    pub failures: Vec<(TransactionId, CorrectionError)>,
}

impl CorrectionReport {
    pub fn store_changed(&self) -> bool {
        self.learned > 0
    }
}

/// Reassigns one transaction and teaches the store its exact details string.
///
/// Returns `Ok(true)` only when a keyword was added, which is the signal to
/// re-run classification. Re-applying the same correction is a no-op.
pub fn apply_correction(
    batch: &mut TransactionBatch,
    store: &mut CategoryStore,
    id: TransactionId,
    new_category: &str,
) -> Result<bool, CorrectionError> {
    Ok(correct(batch, store, id, new_category)? == Outcome::Learned)
}

/// Applies corrections in order, each persisted on its own. A failing
/// correction is recorded and the rest still run.
pub fn apply_corrections(
    batch: &mut TransactionBatch,
    store: &mut CategoryStore,
    corrections: &[Correction],
) -> CorrectionReport {
    let mut report = CorrectionReport::default();
    for c in corrections {
        match correct(batch, store, c.id, &c.category) {
            Ok(Outcome::Unchanged) => {}
            Ok(Outcome::Recategorized) => report.recategorized += 1,
            Ok(Outcome::Learned) => {
                report.recategorized += 1;
                report.learned += 1;
            }
            Err(e) => {
                tracing::warn!(id = c.id.0, "correction failed: {e}");
                report.failures.push((c.id, e));
            }
        }
    }
    report
}

fn correct(
    batch: &mut TransactionBatch,
    store: &mut CategoryStore,
    id: TransactionId,
    new_category: &str,
) -> Result<Outcome, CorrectionError> {
    let tx = batch
        .get_mut(id)
        .ok_or(CorrectionError::UnknownTransaction(id))?;
    if tx.category == new_category {
        return Ok(Outcome::Unchanged);
    }
    if !store.contains(new_category) {
        return Err(CorrectionError::UnknownCategory(new_category.to_string()));
    }

    // A keyword that cannot be persisted rolls the transaction back too.
    let previous = std::mem::replace(&mut tx.category, new_category.to_string());
    match store.add_keyword(new_category, &tx.details) {
        Ok(true) => Ok(Outcome::Learned),
        Ok(false) => Ok(Outcome::Recategorized),
        Err(e) => {
            tx.category = previous;
            Err(e.into())
        }
    }
}

use spendsort_core::{CategoryTotals, Money, TransactionBatch, TransactionId};
use spendsort_import::{KeywordClassifier, ParseError, StatementParser};
use spendsort_storage::{CategoryStore, StoreError};
use std::io::Read;
use thiserror::Error;

use crate::config::Config;
use crate::learner::{self, Correction, CorrectionError, CorrectionReport};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Error processing the files: {0}")]
    Processing(#[from] ParseError),
    #[error("No statement loaded")]
    NoStatement,
    #[error(transparent)]
    Correction(#[from] CorrectionError),
    #[error("Failed to persist categories: {0}")]
    Store(#[from] StoreError),
}

/// One interactive session: the category dictionary plus the statement
/// currently being reviewed.
pub struct Session {
    store: CategoryStore,
    batch: Option<TransactionBatch>,
}

impl Session {
    pub fn new(store: CategoryStore) -> Self {
        Self { store, batch: None }
    }

    pub fn open(config: &Config) -> Self {
        Self::new(CategoryStore::load(&config.categories_file))
    }

    pub fn store(&self) -> &CategoryStore {
        &self.store
    }

    pub fn batch(&self) -> Option<&TransactionBatch> {
        self.batch.as_ref()
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.store.names().collect()
    }

    /// Parses and classifies a statement, replacing the current one. On
    /// failure the previously loaded statement is kept.
    pub fn load_statement<R: Read>(&mut self, data: R) -> Result<&TransactionBatch, SessionError> {
        let mut batch = StatementParser::parse_csv(data)?;
        KeywordClassifier::new(self.store.categories()).classify(&mut batch);
        tracing::info!(transactions = batch.len(), "loaded statement");
        Ok(&*self.batch.insert(batch))
    }

    pub fn add_category(&mut self, name: &str) -> Result<bool, SessionError> {
        Ok(self.store.add_category(name)?)
    }

    pub fn apply_correction(
        &mut self,
        id: TransactionId,
        category: &str,
    ) -> Result<bool, SessionError> {
        let batch = self.batch.as_mut().ok_or(SessionError::NoStatement)?;
        Ok(learner::apply_correction(batch, &mut self.store, id, category)?)
    }

    pub fn apply_corrections(
        &mut self,
        corrections: &[Correction],
    ) -> Result<CorrectionReport, SessionError> {
        let batch = self.batch.as_mut().ok_or(SessionError::NoStatement)?;
        Ok(learner::apply_corrections(batch, &mut self.store, corrections))
    }

    /// Re-runs classification against the current dictionary. Returns the
    /// number of categorized transactions.
    pub fn reclassify(&mut self) -> Result<usize, SessionError> {
        let batch = self.batch.as_mut().ok_or(SessionError::NoStatement)?;
        Ok(KeywordClassifier::new(self.store.categories()).classify(batch))
    }

    pub fn category_totals(&self) -> Option<CategoryTotals> {
        self.batch.as_ref().map(TransactionBatch::category_totals)
    }

    pub fn credit_total(&self) -> Option<Money> {
        self.batch.as_ref().map(TransactionBatch::credit_total)
    }
}

pub mod classify;
pub mod csv;

pub use classify::KeywordClassifier;
pub use csv::{Field, ParseError, StatementParser, DATE_FORMAT};

pub mod import {
    use spendsort_core::{CategoryMap, TransactionBatch};
    use std::io::Read;

    /// Parses a statement and classifies it against `categories` in one step.
    pub fn import_statement<R: Read>(
        data: R,
        categories: &CategoryMap,
    ) -> Result<TransactionBatch, crate::csv::ParseError> {
        let mut batch = crate::csv::parse_csv(data)?;
        crate::classify::classify(&mut batch, categories);
        Ok(batch)
    }
}

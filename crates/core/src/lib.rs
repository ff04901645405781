pub mod category;
pub mod money;
pub mod summary;
pub mod transaction;

pub use category::{normalize_keyword, CategoryMap, UNCATEGORIZED};
pub use money::Money;
pub use summary::{CategoryTotal, CategoryTotals};
pub use transaction::{Direction, Transaction, TransactionBatch, TransactionId};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::Money;
use super::transaction::Transaction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Money,
}

/// Per-category spend, largest first. Ties are ordered by category name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotals(Vec<CategoryTotal>);

impl CategoryTotals {
    pub fn from_transactions<'a, I>(transactions: I) -> Self
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut totals: Vec<CategoryTotal> = Vec::new();
        for tx in transactions {
            match totals.iter_mut().find(|t| t.category == tx.category) {
                Some(total) => total.amount = total.amount + tx.amount,
                None => totals.push(CategoryTotal {
                    category: tx.category.clone(),
                    amount: tx.amount,
                }),
            }
        }
        totals.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then_with(|| a.category.cmp(&b.category))
        });
        CategoryTotals(totals)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryTotal> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<Money> {
        self.0
            .iter()
            .find(|t| t.category == category)
            .map(|t| t.amount)
    }

    pub fn total(&self) -> Money {
        self.0.iter().map(|t| t.amount).sum()
    }

    /// Percentage of the grand total spent in `category`, or `None` when the
    /// category is absent or nothing was spent at all.
    pub fn share(&self, category: &str) -> Option<Decimal> {
        let total = self.total();
        if total.is_zero() {
            return None;
        }
        let amount = self.get(category)?;
        Some((amount.as_decimal() * Decimal::ONE_HUNDRED / total.as_decimal()).round_dp(1))
    }
}

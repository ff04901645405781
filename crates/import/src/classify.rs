use spendsort_core::{normalize_keyword, CategoryMap, TransactionBatch, UNCATEGORIZED};
use std::collections::HashSet;

/// A category paired with its precomputed lowercase, trimmed keyword set.
struct CompiledCategory {
    name: String,
    keywords: HashSet<String>,
}

/// Exact-match keyword classifier.
///
/// A transaction matches a category when its trimmed, lowercased details equal
/// one of that category's keywords under the same normalization. Substrings
/// never match: "Coffee Shop Downtown" is not "coffee".
///
/// Categories are tried in the map's insertion order and the first match
/// wins. `Uncategorized` and categories without keywords never match.
pub struct KeywordClassifier {
    categories: Vec<CompiledCategory>,
}

impl KeywordClassifier {
    pub fn new(categories: &CategoryMap) -> Self {
        let compiled = categories
            .iter()
            .filter(|(name, keywords)| *name != UNCATEGORIZED && !keywords.is_empty())
            .map(|(name, keywords)| CompiledCategory {
                name: name.to_string(),
                keywords: keywords.iter().map(|k| normalize_keyword(k)).collect(),
            })
            .collect();
        Self {
            categories: compiled,
        }
    }

    pub fn category_for(&self, details: &str) -> Option<&str> {
        let details = normalize_keyword(details);
        self.categories
            .iter()
            .find(|c| c.keywords.contains(&details))
            .map(|c| c.name.as_str())
    }

    /// Overwrites every transaction's category. Returns how many matched a
    /// category other than `Uncategorized`.
    pub fn classify(&self, batch: &mut TransactionBatch) -> usize {
        let mut matched = 0;
        for tx in batch.iter_mut() {
            match self.category_for(&tx.details) {
                Some(name) => {
                    tx.category = name.to_string();
                    matched += 1;
                }
                None => tx.category = UNCATEGORIZED.to_string(),
            }
        }
        tracing::debug!(
            matched,
            unmatched = batch.len() - matched,
            "classified transactions"
        );
        matched
    }
}

/// Classifies `batch` in place against `categories`. The map is only read.
pub fn classify(batch: &mut TransactionBatch, categories: &CategoryMap) -> usize {
    KeywordClassifier::new(categories).classify(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use spendsort_core::{Direction, Money, Transaction, TransactionId};

    fn categories(json: &str) -> CategoryMap {
        serde_json::from_str(json).unwrap()
    }

    fn batch(details: &[&str]) -> TransactionBatch {
        TransactionBatch::new(
            details
                .iter()
                .enumerate()
                .map(|(i, d)| {
                    Transaction::new(
                        TransactionId(i),
                        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                        *d,
                        Money::from_decimal(Decimal::new(1000, 2)),
                        Direction::Debit,
                    )
                })
                .collect(),
        )
    }

    fn assigned(batch: &TransactionBatch) -> Vec<String> {
        batch.iter().map(|t| t.category.clone()).collect()
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let map = categories(r#"{"Entertainment":["netflix"]}"#);
        let mut b = batch(&["Netflix", "NETFLIX"]);
        assert_eq!(classify(&mut b, &map), 2);
        assert_eq!(assigned(&b), vec!["Entertainment", "Entertainment"]);
    }

    #[test]
    fn substring_does_not_match() {
        let map = categories(r#"{"Entertainment":["netflix"],"Coffee":["Coffee"]}"#);
        let mut b = batch(&["Netflix Inc", "Coffee Shop Downtown"]);
        assert_eq!(classify(&mut b, &map), 0);
        assert!(b.iter().all(|t| t.is_uncategorized()));
    }

    #[test]
    fn whitespace_is_trimmed_on_both_sides() {
        let map = categories(r#"{"Groceries":["  Tesco "]}"#);
        let mut b = batch(&["tesco  "]);
        classify(&mut b, &map);
        assert_eq!(assigned(&b), vec!["Groceries"]);
    }

    #[test]
    fn first_category_in_insertion_order_wins() {
        let map = categories(r#"{"Uncategorized":[],"Subscriptions":["spotify"],"Music":["Spotify"]}"#);
        let mut b = batch(&["Spotify"]);
        classify(&mut b, &map);
        assert_eq!(assigned(&b), vec!["Subscriptions"]);

        let reversed = categories(r#"{"Music":["Spotify"],"Subscriptions":["spotify"]}"#);
        classify(&mut b, &reversed);
        assert_eq!(assigned(&b), vec!["Music"]);
    }

    #[test]
    fn uncategorized_keywords_are_ignored() {
        let map = categories(r#"{"Uncategorized":["netflix"]}"#);
        let k = KeywordClassifier::new(&map);
        assert_eq!(k.category_for("netflix"), None);
    }

    #[test]
    fn classify_overwrites_previous_assignment() {
        let map = categories(r#"{"Entertainment":["netflix"]}"#);
        let mut b = batch(&["Netflix", "Landlord"]);
        b.get_mut(TransactionId(1)).unwrap().category = "Housing".to_string();
        classify(&mut b, &map);
        assert_eq!(assigned(&b), vec!["Entertainment", "Uncategorized"]);
    }

    #[test]
    fn classification_is_deterministic() {
        let map = categories(r#"{"A":["x","y"],"B":["y","z"],"C":["w"]}"#);
        let mut first = batch(&["x", "y", "z", "w", "v"]);
        let mut second = first.clone();
        let classifier = KeywordClassifier::new(&map);
        classifier.classify(&mut first);
        classifier.classify(&mut second);
        classifier.classify(&mut second);
        assert_eq!(assigned(&first), assigned(&second));
        assert_eq!(assigned(&first), vec!["A", "A", "B", "C", "Uncategorized"]);
    }

    #[test]
    fn classify_does_not_mutate_categories() {
        let map = categories(r#"{"Entertainment":["netflix"]}"#);
        let before = map.clone();
        let mut b = batch(&["Spotify"]);
        classify(&mut b, &map);
        assert_eq!(map, before);
    }
}

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Reserved fallback category. Always present, never learns keywords.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Form used when comparing keywords and details: trimmed, lowercased.
pub fn normalize_keyword(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Ordered `category name -> keywords` dictionary.
///
/// Iteration order is insertion order, and it is also the order in which
/// categories are tried during classification. Serializes as a JSON object
/// whose key order follows that same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMap {
    entries: Vec<(String, Vec<String>)>,
}

impl Default for CategoryMap {
    fn default() -> Self {
        CategoryMap {
            entries: vec![(UNCATEGORIZED.to_string(), Vec::new())],
        }
    }
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn keywords(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, kws)| kws.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(n, kws)| (n.as_str(), kws.as_slice()))
    }

    /// Appends an empty category. Names are compared exactly, without case
    /// folding. Returns `false` for blank or already present names.
    pub fn insert_category(&mut self, name: &str) -> bool {
        if name.trim().is_empty() || self.contains(name) {
            return false;
        }
        self.entries.push((name.to_string(), Vec::new()));
        true
    }

    /// Appends the trimmed keyword to `category`. Returns `false` if the
    /// keyword is blank, the category is unknown or reserved, or an
    /// equivalent keyword is already listed.
    pub fn insert_keyword(&mut self, category: &str, keyword: &str) -> bool {
        let keyword = keyword.trim();
        if keyword.is_empty() || category == UNCATEGORIZED {
            return false;
        }
        let Some((_, keywords)) = self.entries.iter_mut().find(|(n, _)| n == category) else {
            return false;
        };
        let normalized = normalize_keyword(keyword);
        if keywords.iter().any(|k| normalize_keyword(k) == normalized) {
            return false;
        }
        keywords.push(keyword.to_string());
        true
    }

    fn upsert(&mut self, name: String, keywords: Vec<String>) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = keywords,
            None => self.entries.push((name, keywords)),
        }
    }

    fn ensure_uncategorized(&mut self) {
        if !self.contains(UNCATEGORIZED) {
            self.entries.insert(0, (UNCATEGORIZED.to_string(), Vec::new()));
        }
    }
}

impl Serialize for CategoryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, keywords) in &self.entries {
            map.serialize_entry(name, keywords)?;
        }
        map.end()
    }
}

struct CategoryMapVisitor;

impl<'de> Visitor<'de> for CategoryMapVisitor {
    type Value = CategoryMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of category names to keyword lists")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = CategoryMap {
            entries: Vec::with_capacity(access.size_hint().unwrap_or(0)),
        };
        // A repeated key keeps its first position but takes the later value.
        while let Some((name, keywords)) = access.next_entry::<String, Vec<String>>()? {
            map.upsert(name, keywords);
        }
        map.ensure_uncategorized();
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for CategoryMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CategoryMapVisitor)
    }
}

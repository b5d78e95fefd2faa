// 🗂️ Merchant Keyword Table - Versioned data, not control flow
//
// Merchant fragment -> category. The longest matching key wins; equal
// lengths go to the higher declared specificity, then to table order.
// Exclusion carve-outs stop a key from matching inside known words.

use crate::error::{LedgerError, Result as LedgerResult};
use crate::text::normalize_name;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

const BUNDLED_TABLE: &str = include_str!("../../data/merchant_keywords.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantEntry {
    pub key: String,
    pub category: String,

    /// Tie-breaker between keys of equal length (higher wins)
    #[serde(default)]
    pub specificity: i32,

    /// Words the key must not be matched inside of
    #[serde(default)]
    pub exclusions: Vec<String>,

    /// Only match at word boundaries
    #[serde(default)]
    pub whole_word: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantTable {
    pub version: u32,

    #[serde(default)]
    pub description: Option<String>,

    pub entries: Vec<MerchantEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MerchantMatch<'a> {
    pub key: &'a str,
    pub category: &'a str,
}

impl MerchantTable {
    /// The table shipped in `data/merchant_keywords.json`
    pub fn bundled() -> LedgerResult<Self> {
        Self::from_json(BUNDLED_TABLE)
    }

    /// Load a replacement table from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read merchant table: {:?}", path.as_ref()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid merchant table: {:?}", path.as_ref()))
    }

    /// Parse and validate a table. Keys and exclusions are normalised once.
    pub fn from_json(content: &str) -> LedgerResult<Self> {
        let mut table: MerchantTable = serde_json::from_str(content)?;
        let mut seen = BTreeSet::new();

        for entry in &mut table.entries {
            entry.key = normalize_name(&entry.key);
            entry.exclusions = entry.exclusions.iter().map(|e| normalize_name(e)).collect();

            if entry.key.is_empty() {
                return Err(LedgerError::MerchantTable("entry with empty key".to_string()));
            }
            if entry.category.trim().is_empty() {
                return Err(LedgerError::MerchantTable(format!(
                    "key '{}' has no category",
                    entry.key
                )));
            }
            if !seen.insert(entry.key.clone()) {
                return Err(LedgerError::MerchantTable(format!(
                    "duplicate key '{}'",
                    entry.key
                )));
            }
        }

        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scan a counterparty name. Keys not flagged `whole_word` may match
    /// inside longer tokens ("SWIGGYBLR").
    pub fn lookup(&self, text: &str) -> Option<MerchantMatch<'_>> {
        self.best_match(&normalize_name(text), false)
    }

    /// Scan a full message body, where every key must sit on word boundaries
    pub fn lookup_in_body(&self, body: &str) -> Option<MerchantMatch<'_>> {
        self.best_match(&normalize_name(body), true)
    }

    fn best_match(&self, normalized: &str, force_whole_word: bool) -> Option<MerchantMatch<'_>> {
        if normalized.is_empty() {
            return None;
        }

        let mut best: Option<&MerchantEntry> = None;
        for entry in &self.entries {
            if !entry_matches(entry, normalized, force_whole_word || entry.whole_word) {
                continue;
            }
            let better = match best {
                None => true,
                Some(current) => {
                    entry.key.len() > current.key.len()
                        || (entry.key.len() == current.key.len()
                            && entry.specificity > current.specificity)
                }
            };
            if better {
                best = Some(entry);
            }
        }

        best.map(|entry| MerchantMatch {
            key: &entry.key,
            category: &entry.category,
        })
    }
}

/// Byte ranges of every occurrence of `needle` in `haystack`
fn occurrences(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    haystack
        .match_indices(needle)
        .map(|(start, m)| (start, start + m.len()))
        .collect()
}

fn entry_matches(entry: &MerchantEntry, text: &str, whole_word: bool) -> bool {
    let bytes = text.as_bytes();
    let excluded: Vec<(usize, usize)> = entry
        .exclusions
        .iter()
        .flat_map(|word| occurrences(text, word))
        .collect();

    occurrences(text, &entry.key).into_iter().any(|(start, end)| {
        let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let after_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        let on_boundary = !whole_word || (before_ok && after_ok);
        let inside_exclusion = excluded.iter().any(|(es, ee)| *es <= start && end <= *ee);
        on_boundary && !inside_exclusion
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &str) -> MerchantTable {
        MerchantTable::from_json(&format!(r#"{{"version": 1, "entries": [{}]}}"#, entries)).unwrap()
    }

    #[test]
    fn test_bundled_table_loads() {
        let table = MerchantTable::bundled().unwrap();
        assert!(table.len() > 100);
        assert!(table.version >= 1);
    }

    #[test]
    fn test_longest_key_wins() {
        let table = MerchantTable::bundled().unwrap();
        let m = table.lookup("SWIGGY INSTAMART BANGALORE").unwrap();
        assert_eq!(m.key, "SWIGGY INSTAMART");
        assert_eq!(m.category, "Groceries");

        let m = table.lookup("SWIGGY BANGALORE").unwrap();
        assert_eq!(m.category, "Food Delivery");
    }

    #[test]
    fn test_specificity_breaks_length_ties() {
        let table = table(
            r#"{"key": "ABCD", "category": "First"},
               {"key": "BCDE", "category": "Second", "specificity": 2}"#,
        );
        assert_eq!(table.lookup("ABCDE").unwrap().category, "Second");
    }

    #[test]
    fn test_brand_not_matched_inside_credited() {
        let table = MerchantTable::bundled().unwrap();
        assert_eq!(table.lookup("AMOUNT CREDITED"), None);
        assert_eq!(table.lookup_in_body("Rs 500 CREDITED to your a/c"), None);
        assert_eq!(table.lookup("CRED").unwrap().category, "Credit Bill Payments");
    }

    #[test]
    fn test_exclusion_carve_out_on_substring_key() {
        let table = table(r#"{"key": "CRED", "category": "Bills", "exclusions": ["CREDITED"]}"#);
        assert_eq!(table.lookup("AMOUNT CREDITED"), None);
        assert_eq!(table.lookup("CREDBILL").unwrap().category, "Bills");
        assert_eq!(table.lookup("CREDITED BY CREDBILL").unwrap().category, "Bills");
    }

    #[test]
    fn test_body_scan_requires_word_boundaries() {
        let table = table(r#"{"key": "OLA", "category": "Cab & Taxi"}"#);
        assert!(table.lookup("OLACABS").is_some());
        assert_eq!(table.lookup_in_body("Paid for SOLAR panel"), None);
        assert!(table.lookup_in_body("Paid to OLA via UPI").is_some());
    }

    #[test]
    fn test_invalid_tables_rejected() {
        let dup = r#"{"version": 1, "entries": [{"key": "A B", "category": "X"}, {"key": "a  b", "category": "Y"}]}"#;
        assert!(matches!(MerchantTable::from_json(dup), Err(LedgerError::MerchantTable(_))));

        let empty = r#"{"version": 1, "entries": [{"key": "  ", "category": "X"}]}"#;
        assert!(MerchantTable::from_json(empty).is_err());

        assert!(matches!(MerchantTable::from_json("not json"), Err(LedgerError::Json(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        std::fs::write(&path, r#"{"version": 9, "entries": [{"key": "ACME", "category": "Shopping"}]}"#).unwrap();
        let table = MerchantTable::from_file(&path).unwrap();
        assert_eq!(table.version, 9);
        assert!(MerchantTable::from_file(dir.path().join("missing.json")).is_err());
    }
}

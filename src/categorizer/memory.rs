// 🧠 Adaptive Memory - Merchant -> category associations the user corrected
//
// Keys are normalised merchant names. Lookup tries an exact key first, then
// a substring match either way (longest key wins, shorter keys than
// MIN_FUZZY_KEY_LEN never match fuzzily).

use crate::text::normalize_merchant;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MIN_FUZZY_KEY_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryMatchKind {
    Exact,
    Fuzzy,
}

impl MemoryMatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryMatchKind::Exact => "exact",
            MemoryMatchKind::Fuzzy => "fuzzy",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryMatch<'a> {
    pub kind: MemoryMatchKind,
    pub key: &'a str,
    pub category: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerchantMemory {
    entries: BTreeMap<String, String>,
}

impl MerchantMemory {
    pub fn new() -> Self {
        MerchantMemory {
            entries: BTreeMap::new(),
        }
    }

    /// Build from raw merchant -> category pairs; names are normalised
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut memory = MerchantMemory::new();
        for (merchant, category) in pairs {
            memory.remember(merchant.as_ref(), category);
        }
        memory
    }

    pub fn remember(&mut self, merchant: &str, category: impl Into<String>) {
        let key = normalize_merchant(merchant);
        if !key.is_empty() {
            self.entries.insert(key, category.into());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, merchant: &str) -> Option<MemoryMatch<'_>> {
        let normalized = normalize_merchant(merchant);
        if normalized.is_empty() {
            return None;
        }

        if let Some((key, category)) = self.entries.get_key_value(&normalized) {
            return Some(MemoryMatch {
                kind: MemoryMatchKind::Exact,
                key,
                category,
            });
        }

        self.entries
            .iter()
            .filter(|(key, _)| key.len() >= MIN_FUZZY_KEY_LEN && normalized.len() >= MIN_FUZZY_KEY_LEN)
            .filter(|(key, _)| normalized.contains(key.as_str()) || key.contains(normalized.as_str()))
            .max_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| b.0.cmp(a.0)))
            .map(|(key, category)| MemoryMatch {
                kind: MemoryMatchKind::Fuzzy,
                key,
                category,
            })
    }
}

// 🔍 Duplicate Detection - Content hash first, fuzzy fingerprint second
//
// The hash of the normalised body is a cheap membership test run before any
// extraction. It is a performance shortcut: genuinely different messages
// that collide are not otherwise told apart. After extraction, amount +
// time proximity + merchant similarity catch near-duplicates whose
// boilerplate (reference numbers, balances) differs.

use crate::config::PipelineConfig;
use crate::model::{ClassifiedTransaction, Direction};
use crate::text::{merchant_similarity, normalize_merchant};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

// ============================================================================
// DUPLICATE KEY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DuplicateKey(String);

impl DuplicateKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DuplicateKey {
    fn from(hex: String) -> Self {
        DuplicateKey(hex)
    }
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SHA-256 of the trimmed, whitespace-collapsed body.
///
/// `None` for an empty body; callers treat that as "not a duplicate".
pub fn compute_duplicate_key(body: &str) -> Option<DuplicateKey> {
    let normalized = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return None;
    }
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    Some(DuplicateKey(format!("{:x}", hasher.finalize())))
}

// ============================================================================
// FINGERPRINT
// ============================================================================

/// What the secondary check compares once a message has been extracted
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    pub amount_minor: i64,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
    /// Normalised merchant or counterparty name
    pub merchant: Option<String>,
}

impl Fingerprint {
    pub fn new(amount_minor: i64, direction: Direction, timestamp: DateTime<Utc>, merchant: Option<&str>) -> Self {
        Fingerprint {
            amount_minor,
            direction,
            timestamp,
            merchant: merchant
                .map(normalize_merchant)
                .filter(|m| !m.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearDuplicate {
    pub similarity: f64,
    pub reason: String,
}

// ============================================================================
// DETECTOR
// ============================================================================

pub struct DuplicateDetector {
    known: HashSet<DuplicateKey>,
    accepted: Vec<Fingerprint>,

    /// Near-duplicate time window (default: 10 minutes)
    pub window: Duration,

    /// Amount tolerance in minor units (default: exact)
    pub amount_tolerance_minor: i64,

    /// Merchant similarity needed for a near-duplicate (default: 0.85)
    pub min_merchant_similarity: f64,

    /// Confidence reported for identical hashes in batch audits (default: 1.0)
    pub exact_match_confidence: f64,

    /// Fuzzy batch-audit matches below this are dropped (default: 0.70)
    pub fuzzy_match_threshold: f64,
}

impl DuplicateDetector {
    pub fn new(config: &PipelineConfig) -> Self {
        DuplicateDetector {
            known: HashSet::new(),
            accepted: Vec::new(),
            window: Duration::minutes(config.duplicate_window_minutes),
            amount_tolerance_minor: config.duplicate_amount_tolerance_minor,
            min_merchant_similarity: 0.85,
            exact_match_confidence: 1.0,
            fuzzy_match_threshold: 0.70,
        }
    }

    /// Bulk-load hashes already persisted, once per batch
    pub fn preload(&mut self, keys: impl IntoIterator<Item = DuplicateKey>) {
        self.known.extend(keys);
    }

    pub fn is_known(&self, key: &DuplicateKey) -> bool {
        self.known.contains(key)
    }

    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    /// Record an accepted message so later ones in the batch see it
    pub fn remember(&mut self, key: Option<DuplicateKey>, fingerprint: Fingerprint) {
        if let Some(key) = key {
            self.known.insert(key);
        }
        self.accepted.push(fingerprint);
    }

    /// Compare against every message accepted earlier in this batch
    pub fn find_near_duplicate(&self, candidate: &Fingerprint) -> Option<NearDuplicate> {
        let candidate_merchant = candidate.merchant.as_deref()?;

        self.accepted
            .iter()
            .filter(|seen| seen.direction == candidate.direction)
            .filter(|seen| (seen.amount_minor - candidate.amount_minor).abs() <= self.amount_tolerance_minor)
            .filter(|seen| within(seen.timestamp, candidate.timestamp, self.window))
            .filter_map(|seen| {
                let merchant = seen.merchant.as_deref()?;
                let similarity = merchant_similarity(merchant, candidate_merchant);
                (similarity >= self.min_merchant_similarity).then(|| NearDuplicate {
                    similarity,
                    reason: format!(
                        "{} minor units at {} vs {} ({} ≈ {}, similarity {:.2})",
                        seen.amount_minor,
                        seen.timestamp.format("%Y-%m-%d %H:%M"),
                        candidate.timestamp.format("%Y-%m-%d %H:%M"),
                        merchant,
                        candidate_merchant,
                        similarity
                    ),
                })
            })
            .max_by(|a, b| a.similarity.total_cmp(&b.similarity))
    }

    // ========================================================================
    // BATCH AUDIT
    // ========================================================================

    /// Compare every pair in an accepted batch, for post-hoc review
    pub fn find_duplicates(&self, transactions: &[ClassifiedTransaction]) -> Vec<DuplicateMatch> {
        let mut matches = Vec::new();

        for i in 0..transactions.len() {
            for j in (i + 1)..transactions.len() {
                let tx1 = &transactions[i];
                let tx2 = &transactions[j];

                if let Some(m) = self.check_exact_hash(i, j, tx1, tx2) {
                    matches.push(m);
                    continue;
                }

                if let Some(m) = self.check_fuzzy_match(i, j, tx1, tx2) {
                    matches.push(m);
                }
            }
        }

        matches
    }

    fn check_exact_hash(
        &self,
        i: usize,
        j: usize,
        tx1: &ClassifiedTransaction,
        tx2: &ClassifiedTransaction,
    ) -> Option<DuplicateMatch> {
        let key1 = tx1.duplicate_key.as_deref()?;
        let key2 = tx2.duplicate_key.as_deref()?;
        if key1 != key2 {
            return None;
        }

        Some(DuplicateMatch {
            tx1_index: i,
            tx2_index: j,
            confidence: self.exact_match_confidence,
            strategy: MatchStrategy::ExactHash,
            reason: format!("Exact hash: {}", &key1[..key1.len().min(12)]),
        })
    }

    fn check_fuzzy_match(
        &self,
        i: usize,
        j: usize,
        tx1: &ClassifiedTransaction,
        tx2: &ClassifiedTransaction,
    ) -> Option<DuplicateMatch> {
        if tx1.result.direction != tx2.result.direction {
            return None;
        }

        if !within(tx1.timestamp, tx2.timestamp, self.window) {
            return None;
        }
        let time_diff_secs = (tx1.timestamp - tx2.timestamp).num_seconds().abs();

        let amount_diff = (tx1.result.amount_minor - tx2.result.amount_minor).abs();
        if amount_diff > self.amount_tolerance_minor {
            return None;
        }

        let merchant1 = tx1.result.counterparty.label()?;
        let merchant2 = tx2.result.counterparty.label()?;
        let merchant_score = merchant_similarity(merchant1, merchant2);
        if merchant_score < self.min_merchant_similarity {
            return None;
        }

        let window_secs = self.window.num_seconds().max(1) as f64;
        let time_score = 1.0 - time_diff_secs as f64 / (window_secs + 1.0);
        let amount_score = 1.0 - amount_diff as f64 / (self.amount_tolerance_minor as f64 + 1.0);

        // Weighted average: time 30%, amount 40%, merchant 30%
        let confidence = time_score * 0.3 + amount_score * 0.4 + merchant_score * 0.3;
        if confidence < self.fuzzy_match_threshold {
            return None;
        }

        Some(DuplicateMatch {
            tx1_index: i,
            tx2_index: j,
            confidence,
            strategy: MatchStrategy::FuzzyMatch,
            reason: format!(
                "Fuzzy match: {} ≈ {} | {} ≈ {} | {} ≈ {}",
                tx1.timestamp.format("%Y-%m-%d %H:%M"),
                tx2.timestamp.format("%Y-%m-%d %H:%M"),
                tx1.result.amount_minor,
                tx2.result.amount_minor,
                merchant1,
                merchant2
            ),
        })
    }
}

fn within(a: DateTime<Utc>, b: DateTime<Utc>, window: Duration) -> bool {
    (a - b).num_seconds().abs() <= window.num_seconds()
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

// ============================================================================
// MATCH RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Identical normalised body
    ExactHash,

    /// Same direction, amount within tolerance, close in time, similar merchant
    FuzzyMatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateMatch {
    /// Index of first transaction
    pub tx1_index: usize,

    /// Index of second transaction
    pub tx2_index: usize,

    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,

    pub strategy: MatchStrategy,

    /// Human-readable reason
    pub reason: String,
}

// ============================================================================
// TESTS
// ============================================================================

// ⚙️ Pipeline Configuration - Thresholds and time windows
//
// Every field has a default; a context snapshot may override any subset.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Credits at or above this amount with no identifiable source phrase are
    /// flagged "Unverified Income" (default: ₹25,000)
    pub unverified_income_threshold_minor: i64,

    /// Statistical classifier answers below this confidence are ignored (default: 0.85)
    pub min_statistical_confidence: f64,

    /// Near-duplicate time window (default: 10 minutes)
    pub duplicate_window_minutes: i64,

    /// Near-duplicate amount tolerance in minor units (default: exact)
    pub duplicate_amount_tolerance_minor: i64,

    /// Self-transfer pairing window (default: 10 minutes)
    pub self_transfer_window_minutes: i64,

    /// Statement notice -> bill payment pairing window (default: 30 days)
    pub cc_statement_window_days: i64,

    /// Bank-side bill payment -> card-side "payment received" window (default: 48 hours)
    pub cc_settlement_window_hours: i64,

    /// Links scored below this are discarded (default: 0.70)
    pub min_pairing_confidence: f64,

    /// Pair same-amount debit/credit without self-transfer evidence (default: off)
    pub allow_amount_only_self_transfer: bool,

    /// Consecutive months before a credit source is flagged as salary (default: 3)
    pub salary_streak_months: u32,

    /// Smallest credit considered by the salary tracker (default: ₹10,000)
    pub salary_min_amount_minor: i64,
}

impl PipelineConfig {
    pub fn new() -> Self {
        PipelineConfig {
            unverified_income_threshold_minor: 2_500_000,
            min_statistical_confidence: 0.85,
            duplicate_window_minutes: 10,
            duplicate_amount_tolerance_minor: 0,
            self_transfer_window_minutes: 10,
            cc_statement_window_days: 30,
            cc_settlement_window_hours: 48,
            min_pairing_confidence: 0.70,
            allow_amount_only_self_transfer: false,
            salary_streak_months: 3,
            salary_min_amount_minor: 1_000_000,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

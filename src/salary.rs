// 💼 Salary Sources - Recurring credits that look like pay
//
// Watches accepted credits during a batch scan. A named source paying a
// large enough amount in consecutive calendar months is flagged once; the
// scan report hands it to the collaborator to persist. Observations must
// arrive in non-decreasing time order.

use crate::categorizer::{OTHER_INCOME, SALARY, UNVERIFIED_INCOME};
use crate::config::PipelineConfig;
use crate::context::SalarySource;
use crate::model::{ClassificationResult, Direction};
use crate::sender::institution_code;
use chrono::{DateTime, Datelike, Utc};
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Streak {
    /// year * 12 + zero-based month
    last_month: i64,
    months: u32,
}

pub struct SalaryTracker {
    /// Consecutive months needed to flag a source (default: 3)
    pub streak_months: u32,

    /// Smallest credit that counts (default: ₹10,000)
    pub min_amount_minor: i64,

    flagged: BTreeSet<SalarySource>,
    streaks: HashMap<SalarySource, Streak>,
    last_seen: Option<DateTime<Utc>>,
}

impl SalaryTracker {
    pub fn new(config: &PipelineConfig) -> Self {
        SalaryTracker {
            streak_months: config.salary_streak_months.max(1),
            min_amount_minor: config.salary_min_amount_minor,
            flagged: BTreeSet::new(),
            streaks: HashMap::new(),
            last_seen: None,
        }
    }

    /// Sources already persisted are never flagged again
    pub fn with_known(mut self, sources: impl IntoIterator<Item = SalarySource>) -> Self {
        self.flagged.extend(sources);
        self
    }

    pub fn is_flagged(&self, source: &SalarySource) -> bool {
        self.flagged.contains(source)
    }

    /// Feed one accepted transaction. Returns the source the first time its
    /// streak reaches the threshold.
    pub fn observe(
        &mut self,
        sender: &str,
        timestamp: DateTime<Utc>,
        result: &ClassificationResult,
    ) -> Option<SalarySource> {
        if let Some(last) = self.last_seen {
            if timestamp < last {
                warn!(
                    sender = sender,
                    timestamp = %timestamp,
                    last_seen = %last,
                    "out-of-order salary observation ignored"
                );
                return None;
            }
        }
        self.last_seen = Some(timestamp);

        if !self.qualifies(result) {
            return None;
        }
        let name = result.counterparty.name.as_deref()?;
        let source = SalarySource::new(&institution_code(sender), name);
        if source.institution_code.is_empty() || source.sender_name.is_empty() {
            return None;
        }
        if self.flagged.contains(&source) {
            return None;
        }

        let month = i64::from(timestamp.year()) * 12 + i64::from(timestamp.month0());
        let streak = self
            .streaks
            .entry(source.clone())
            .and_modify(|s| {
                if month == s.last_month + 1 {
                    s.months += 1;
                    s.last_month = month;
                } else if month != s.last_month {
                    s.months = 1;
                    s.last_month = month;
                }
            })
            .or_insert(Streak {
                last_month: month,
                months: 1,
            });

        if streak.months < self.streak_months {
            return None;
        }

        info!(
            institution = %source.institution_code,
            sender_name = %source.sender_name,
            months = streak.months,
            "recurring salary source flagged"
        );
        self.streaks.remove(&source);
        self.flagged.insert(source.clone());
        Some(source)
    }

    fn qualifies(&self, result: &ClassificationResult) -> bool {
        result.direction == Direction::Credit
            && result.amount_minor >= self.min_amount_minor
            && [OTHER_INCOME, UNVERIFIED_INCOME, SALARY].contains(&result.category.as_str())
    }
}

impl Default for SalaryTracker {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryStage, Counterparty, CounterpartyKind, SenderClass, TransactionNature};
    use chrono::TimeZone;

    fn credit(name: Option<&str>, category: &str, amount_minor: i64) -> ClassificationResult {
        ClassificationResult {
            amount_minor,
            direction: Direction::Credit,
            nature: TransactionNature::Income,
            category: category.to_string(),
            category_stage: CategoryStage::GenericFallback,
            counterparty: Counterparty {
                name: name.map(str::to_string),
                handle: None,
                kind: CounterpartyKind::Merchant,
                decision_trace: Vec::new(),
                confidence: 0.8,
            },
            sender_class: SenderClass::Bank,
            unresolved: false,
            corrections: Vec::new(),
            decision_trace: Vec::new(),
        }
    }

    fn day(year: i32, month: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, d, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_three_consecutive_months_flag_source() {
        let mut tracker = SalaryTracker::default();
        let pay = credit(Some("ACME CORP"), OTHER_INCOME, 8_500_000);

        assert_eq!(tracker.observe("VM-HDFCBK", day(2024, 1, 31), &pay), None);
        assert_eq!(tracker.observe("VM-HDFCBK", day(2024, 2, 29), &pay), None);
        let flagged = tracker.observe("AD-HDFCBK", day(2024, 3, 31), &pay);

        assert_eq!(flagged, Some(SalarySource::new("HDFCBK", "ACME CORP")));
        // Flagged once only
        assert_eq!(tracker.observe("VM-HDFCBK", day(2024, 4, 30), &pay), None);
    }

    #[test]
    fn test_gap_resets_streak() {
        let mut tracker = SalaryTracker::default();
        let pay = credit(Some("ACME CORP"), UNVERIFIED_INCOME, 8_500_000);

        tracker.observe("VM-HDFCBK", day(2024, 1, 31), &pay);
        tracker.observe("VM-HDFCBK", day(2024, 2, 29), &pay);
        assert_eq!(tracker.observe("VM-HDFCBK", day(2024, 4, 30), &pay), None);
        assert_eq!(tracker.observe("VM-HDFCBK", day(2024, 5, 31), &pay), None);
        assert!(tracker.observe("VM-HDFCBK", day(2024, 6, 28), &pay).is_some());
    }

    #[test]
    fn test_same_month_counts_once() {
        let mut tracker = SalaryTracker::default();
        let pay = credit(Some("ACME CORP"), OTHER_INCOME, 8_500_000);

        tracker.observe("VM-HDFCBK", day(2024, 1, 1), &pay);
        tracker.observe("VM-HDFCBK", day(2024, 1, 15), &pay);
        assert_eq!(tracker.observe("VM-HDFCBK", day(2024, 2, 1), &pay), None);
    }

    #[test]
    fn test_year_boundary_is_consecutive() {
        let mut tracker = SalaryTracker::default();
        let pay = credit(Some("ACME CORP"), OTHER_INCOME, 8_500_000);

        tracker.observe("VM-HDFCBK", day(2023, 11, 30), &pay);
        tracker.observe("VM-HDFCBK", day(2023, 12, 29), &pay);
        assert!(tracker.observe("VM-HDFCBK", day(2024, 1, 31), &pay).is_some());
    }

    #[test]
    fn test_ineligible_credits_ignored() {
        let mut tracker = SalaryTracker::default();
        let small = credit(Some("ACME CORP"), OTHER_INCOME, 50_000);
        let unnamed = credit(None, OTHER_INCOME, 8_500_000);
        let refund = credit(Some("ACME CORP"), "Refunds", 8_500_000);

        for month in 1..=4 {
            assert_eq!(tracker.observe("VM-HDFCBK", day(2024, month, 5), &small), None);
            assert_eq!(tracker.observe("VM-HDFCBK", day(2024, month, 6), &unnamed), None);
            assert_eq!(tracker.observe("VM-HDFCBK", day(2024, month, 7), &refund), None);
        }
    }

    #[test]
    fn test_out_of_order_observation_ignored() {
        let mut tracker = SalaryTracker::default();
        let pay = credit(Some("ACME CORP"), OTHER_INCOME, 8_500_000);

        tracker.observe("VM-HDFCBK", day(2024, 1, 31), &pay);
        tracker.observe("VM-HDFCBK", day(2024, 2, 29), &pay);
        // Earlier than the last observation: no effect on the streak
        assert_eq!(tracker.observe("VM-HDFCBK", day(2023, 12, 31), &pay), None);
        assert!(tracker.observe("VM-HDFCBK", day(2024, 3, 29), &pay).is_some());
    }

    #[test]
    fn test_known_sources_not_flagged_again() {
        let known = SalarySource::new("HDFCBK", "ACME CORP");
        let mut tracker = SalaryTracker::default().with_known(vec![known.clone()]);
        let pay = credit(Some("ACME CORP"), SALARY, 8_500_000);

        assert!(tracker.is_flagged(&known));
        for month in 1..=4 {
            assert_eq!(tracker.observe("VM-HDFCBK", day(2024, month, 1), &pay), None);
        }
    }
}

// 🚦 Pipeline - Message in, outcome out
//
// `classify` is the single-message path: a pure function of the message and
// the read-only context. `BatchScanner` wraps it for a whole batch and owns
// the two pieces of mutable batch state (known duplicate hashes and salary
// streaks), so batches run sequentially.

use crate::amount::AmountDirectionExtractor;
use crate::categorizer::{CategoryInput, CategoryMapper};
use crate::context::{account_suffix, target_account_suffix, ClassificationContext, SalarySource};
use crate::counterparty::{CounterpartyExtractor, NatureHint};
use crate::deduplication::{compute_duplicate_key, DuplicateDetector, DuplicateKey, Fingerprint};
use crate::model::{
    ClassificationResult, ClassifiedTransaction, Direction, DropReason, Outcome, RawMessage,
    SenderClass,
};
use crate::nature::{NatureInput, TransactionNatureResolver};
use crate::pairing::{PairingLink, TransactionPairer};
use crate::phrases::{non_transactional, Phrase};
use crate::salary::SalaryTracker;
use crate::sender::{institution_code, SenderClassifier};
use crate::trace::{DecisionTrace, Traced};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info};
use uuid::Uuid;

// ============================================================================
// SINGLE MESSAGE
// ============================================================================

/// Classify one message. Deterministic for identical inputs.
pub fn classify(message: &RawMessage, context: &ClassificationContext) -> Outcome {
    let body = message.body.as_str();

    let sender_class = SenderClassifier::new().classify(&message.sender);
    if sender_class == SenderClass::Excluded {
        return dropped(message, DropReason::ExcludedSender);
    }

    if let Some(phrase) = non_transactional(body) {
        return dropped(message, DropReason::NonTransactional(phrase.name().to_string()));
    }

    let Traced {
        value: extracted,
        trace: amount_trace,
    } = AmountDirectionExtractor::new().extract(body);

    let Some(amount_minor) = extracted.amount_minor else {
        return dropped(message, DropReason::UnparseableAmount);
    };
    if amount_minor == 0 {
        return dropped(message, DropReason::NonTransactional("zero amount".to_string()));
    }

    let mut trace = DecisionTrace::new();
    trace.append(amount_trace);

    let direction = match extracted.direction {
        Direction::Unknown if Phrase::StatementNotice.matches(body) => {
            trace.record("direction", "statement notice without direction keyword, treated as debit");
            Direction::Debit
        }
        Direction::Unknown => return dropped(message, DropReason::IndeterminateDirection),
        known => known,
    };

    trace.record(
        "sender",
        format!("{} ({})", sender_class.as_str(), institution_code(&message.sender)),
    );

    let hint = NatureHint::infer(body, direction);
    let counterparty = CounterpartyExtractor::new().extract(body, hint);
    trace.append(DecisionTrace::from(counterparty.decision_trace.clone()));

    let category = CategoryMapper::new().categorize(&CategoryInput {
        body,
        sender: &message.sender,
        direction,
        hint,
        sender_class,
        amount_minor,
        counterparty: &counterparty,
        context,
    });
    trace.append(category.trace);

    let resolution = TransactionNatureResolver::new().resolve(&NatureInput {
        body,
        direction,
        sender_class,
        decision: &category.value,
        counterparty: &counterparty,
        context,
    });
    trace.append(resolution.trace);

    let resolved = resolution.value;
    trace.record(
        "final",
        format!("category '{}' from {}", resolved.category, resolved.category_stage),
    );

    Outcome::Classified(ClassificationResult {
        amount_minor,
        direction,
        nature: resolved.nature,
        category: resolved.category,
        category_stage: resolved.category_stage,
        counterparty: resolved.counterparty,
        sender_class,
        unresolved: resolved.unresolved,
        corrections: resolved.corrections,
        decision_trace: trace.into_entries(),
    })
}

fn dropped(message: &RawMessage, reason: DropReason) -> Outcome {
    debug!(sender = %message.sender, reason = %reason, "message dropped");
    Outcome::Dropped { reason }
}

// ============================================================================
// BATCH SCAN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedMessage {
    /// Position in the scanned slice
    pub index: usize,
    pub sender: String,
    pub reason: DropReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearDuplicateMessage {
    pub index: usize,
    pub sender: String,
    pub similarity: f64,
    pub reason: String,
}

/// A message whose classification failed unexpectedly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub index: usize,
    pub sender: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    pub scanned: usize,
    pub accepted: Vec<ClassifiedTransaction>,
    pub dropped: Vec<DroppedMessage>,
    /// Exact hash matches skipped before classification
    pub duplicates: usize,
    pub near_duplicates: Vec<NearDuplicateMessage>,
    pub failures: Vec<ScanFailure>,
    /// Newly flagged recurring salary sources, for the caller to persist
    pub salary_sources: Vec<SalarySource>,
}

impl ScanReport {
    pub fn summary(&self) -> String {
        format!(
            "scanned {} | accepted {} | dropped {} | duplicates {} | near-duplicates {} | failures {} | new salary sources {}",
            self.scanned,
            self.accepted.len(),
            self.dropped.len(),
            self.duplicates,
            self.near_duplicates.len(),
            self.failures.len(),
            self.salary_sources.len(),
        )
    }
}

pub struct BatchScanner {
    context: ClassificationContext,
    detector: DuplicateDetector,
    salary: SalaryTracker,
}

impl BatchScanner {
    /// The context is the batch's reload boundary: it is read once here and
    /// never changes during the scan.
    pub fn new(context: ClassificationContext) -> Self {
        let detector = DuplicateDetector::new(&context.config);
        let salary = SalaryTracker::new(&context.config).with_known(context.salary_sources.clone());
        BatchScanner {
            context,
            detector,
            salary,
        }
    }

    /// Hashes already persisted by the collaborator
    pub fn with_known_hashes(mut self, keys: impl IntoIterator<Item = DuplicateKey>) -> Self {
        self.detector.preload(keys);
        self
    }

    pub fn context(&self) -> &ClassificationContext {
        &self.context
    }

    /// Scan messages oldest first. Hash duplicates are skipped before any
    /// extraction; a failure in one message never stops the batch.
    pub fn scan(&mut self, messages: &[RawMessage]) -> ScanReport {
        let mut report = ScanReport {
            scanned: messages.len(),
            ..ScanReport::default()
        };

        let mut order: Vec<usize> = (0..messages.len()).collect();
        order.sort_by_key(|&i| messages[i].timestamp);

        for index in order {
            let message = &messages[index];

            // An empty body has no key; fail open
            let key = compute_duplicate_key(&message.body);
            if let Some(key) = &key {
                if self.detector.is_known(key) {
                    debug!(index, key = %key, "duplicate hash skipped");
                    report.duplicates += 1;
                    continue;
                }
            }

            let context = &self.context;
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| classify(message, context))) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let error = panic_message(payload.as_ref());
                    error!(index, sender = %message.sender, error = %error, "classification failed");
                    report.failures.push(ScanFailure {
                        index,
                        sender: message.sender.clone(),
                        error,
                    });
                    continue;
                }
            };

            let result = match outcome {
                Outcome::Classified(result) => result,
                Outcome::Dropped { reason } => {
                    report.dropped.push(DroppedMessage {
                        index,
                        sender: message.sender.clone(),
                        reason,
                    });
                    continue;
                }
            };

            let fingerprint = Fingerprint::new(
                result.amount_minor,
                result.direction,
                message.timestamp,
                result.counterparty.label(),
            );
            if let Some(near) = self.detector.find_near_duplicate(&fingerprint) {
                debug!(index, similarity = near.similarity, "near duplicate skipped");
                report.near_duplicates.push(NearDuplicateMessage {
                    index,
                    sender: message.sender.clone(),
                    similarity: near.similarity,
                    reason: near.reason,
                });
                continue;
            }
            self.detector.remember(key.clone(), fingerprint);

            if let Some(source) = self.salary.observe(&message.sender, message.timestamp, &result) {
                report.salary_sources.push(source);
            }

            report.accepted.push(ClassifiedTransaction {
                id: Uuid::new_v4().to_string(),
                sender: message.sender.clone(),
                body: message.body.clone(),
                timestamp: message.timestamp,
                duplicate_key: key.map(|k| k.to_string()),
                account_last4: account_suffix(&message.body),
                target_last4: target_account_suffix(&message.body),
                result,
                resolved: false,
            });
        }

        info!(
            scanned = report.scanned,
            accepted = report.accepted.len(),
            dropped = report.dropped.len(),
            duplicates = report.duplicates,
            near_duplicates = report.near_duplicates.len(),
            failures = report.failures.len(),
            "batch scan complete"
        );
        report
    }

    /// Link self-transfers and card settlements in an accepted batch
    pub fn pair(&self, accepted: &[ClassifiedTransaction]) -> Vec<PairingLink> {
        TransactionPairer::new(&self.context.config).pair_batch(accepted)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::is_card_purchase;
    use crate::categorizer::{P2P_TRANSFERS, SELF_TRANSFER};
    use crate::model::{CategoryStage, TransactionNature};
    use crate::naive_bayes::{Prediction, StatisticalClassifier};
    use crate::pairing::LinkKind;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use std::sync::Arc;

    const BANK: &str = "VM-HDFCBK";

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn run(body: &str) -> Outcome {
        classify(&RawMessage::new(BANK, body, at(0)), &ClassificationContext::new())
    }

    fn classified(body: &str) -> ClassificationResult {
        match run(body) {
            Outcome::Classified(result) => result,
            other => panic!("expected classification for {:?}, got {:?}", body, other),
        }
    }

    #[test]
    fn test_neft_record_between_same_person_is_self_transfer() {
        let r = classified(
            "INR 50,000.00 credited to A/c XX1234. Info: NEFT Cr-XYZ0001234-GODALA SAIKUMAR-GODALA SAIKUMAR-REF555",
        );
        assert_eq!(r.direction, Direction::Credit);
        assert_eq!(r.nature, TransactionNature::Transfer);
        assert_eq!(r.category, SELF_TRANSFER);
        assert!(r.counterparty.kind.is_account_holder());
    }

    #[test]
    fn test_card_purchase_at_swiggy() {
        let r = classified("Spent Rs.450.00 On HDFC Bank Card XX1234 At SWIGGY BANGALORE");
        assert_eq!(r.amount_minor, 45_000);
        assert_eq!(r.direction, Direction::Debit);
        assert_eq!(r.nature, TransactionNature::Expense);
        assert_eq!(r.category, "Food Delivery");
        assert_eq!(r.category_stage, CategoryStage::MerchantTable);
    }

    #[test]
    fn test_salary_wording_without_configured_company_is_other_income() {
        let context = ClassificationContext::new().with_salary_company_names(vec!["ACME CORP".to_string()]);
        let outcome = classify(
            &RawMessage::new(BANK, "Rs 50000 credited; salary for March", at(0)),
            &context,
        );
        let r = outcome.classified().unwrap();
        assert_eq!(r.category, "Other Income");
        assert_ne!(r.nature, TransactionNature::Expense);
    }

    #[test]
    fn test_outgoing_upi_to_person_is_p2p_transfer() {
        let r = classified("Rs 2000 sent to RAJESH KUMAR via UPI");
        assert_eq!(r.amount_minor, 200_000);
        assert_eq!(r.nature, TransactionNature::Transfer);
        assert_eq!(r.category, P2P_TRANSFERS);
        assert!(r.was_corrected());
        assert_eq!(
            r.decision_trace.last().map(String::as_str),
            Some("final: category 'P2P Transfers' from outgoing-p2p-invariant")
        );
    }

    #[test]
    fn test_credit_stating_time_of_day_stays_a_credit() {
        let r = classified(
            "INR 5000.00 credited to A/c no. XX1234 on 12-03-24 at 10:22:11 IST. Info- UPI/P2A/4021/RAJESH KUMAR",
        );
        assert_eq!(r.direction, Direction::Credit);
        assert_ne!(r.nature, TransactionNature::Expense);
        assert!(r.decision_trace.iter().all(|e| !e.contains("card purchase")));
    }

    #[test]
    fn test_bill_acknowledgement_is_not_card_settlement() {
        let r = classified("Rs 599.00 debited from A/c XX1234 to AIRTEL POSTPAID via UPI. Thank you for your payment.");
        assert_eq!(r.direction, Direction::Debit);
        assert_ne!(r.nature, TransactionNature::LiabilityPayment);
    }

    #[test]
    fn test_same_body_twice_is_duplicate_and_not_reclassified() {
        let body = "Spent Rs.450.00 On HDFC Bank Card XX1234 At SWIGGY BANGALORE";
        let messages = vec![RawMessage::new(BANK, body, at(0)), RawMessage::new(BANK, body, at(1))];

        let mut scanner = BatchScanner::new(ClassificationContext::new());
        let report = scanner.scan(&messages);

        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.duplicates, 1);
        assert!(report.near_duplicates.is_empty());
        assert_eq!(report.accepted[0].result.category, "Food Delivery");
    }

    #[test]
    fn test_drop_reasons() {
        assert_eq!(
            classify(
                &RawMessage::new("VM-PROMOS", "Rs 500 cashback credited", at(0)),
                &ClassificationContext::new()
            )
            .drop_reason(),
            Some(&DropReason::ExcludedSender)
        );
        assert_eq!(
            run("Your account has been debited").drop_reason(),
            Some(&DropReason::UnparseableAmount)
        );
        assert_eq!(
            run("Balance in A/c XX1234 is Rs 5,000.00").drop_reason(),
            Some(&DropReason::IndeterminateDirection)
        );
        assert!(matches!(
            run("Rs 0.00 debited from A/c XX1234").drop_reason(),
            Some(DropReason::NonTransactional(_))
        ));
        assert!(matches!(
            run("123456 is your OTP for txn of Rs 500 at AMAZON").drop_reason(),
            Some(DropReason::NonTransactional(_))
        ));
    }

    #[test]
    fn test_statement_without_direction_is_kept_as_debit() {
        let r = classified("Your HDFC Bank Credit Card XX5678 statement is generated. Total due Rs 12,500.00");
        assert_eq!(r.direction, Direction::Debit);
        assert_eq!(r.nature, TransactionNature::Statement);
        assert_eq!(r.counterparty.name.as_deref(), Some("Card Statement"));
    }

    #[test]
    fn test_trace_order_and_final_entry() {
        let r = classified("Spent Rs.450.00 On HDFC Bank Card XX1234 At SWIGGY BANGALORE");
        let trace = &r.decision_trace;

        assert!(trace[0].starts_with("amount: "));
        let position = |prefix: &str| trace.iter().position(|e| e.starts_with(prefix)).unwrap();
        assert!(position("sender: ") < position("counterparty: "));
        assert!(position("counterparty: ") < position("merchant-table: "));
        assert!(position("merchant-table: ") < position("nature: "));
        assert_eq!(
            trace.last().map(String::as_str),
            Some("final: category 'Food Delivery' from merchant-table")
        );
    }

    struct PanicsOn(&'static str);

    impl StatisticalClassifier for PanicsOn {
        fn classify(&self, text: &str) -> Option<Prediction> {
            if text.contains(self.0) {
                panic!("model blew up");
            }
            None
        }
    }

    #[test]
    fn test_failure_in_one_message_does_not_stop_batch() {
        let context = ClassificationContext::new().with_statistical(Arc::new(PanicsOn("ZQXWV")));
        let messages = vec![
            RawMessage::new(BANK, "Rs 300 debited from A/c XX1234 for ZQXWV order 55", at(0)),
            RawMessage::new(BANK, "Spent Rs.450.00 On HDFC Bank Card XX1234 At SWIGGY BANGALORE", at(1)),
        ];

        let report = BatchScanner::new(context).scan(&messages);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 0);
        assert_eq!(report.failures[0].error, "model blew up");
        assert_eq!(report.accepted.len(), 1);
    }

    #[test]
    fn test_preloaded_hashes_skip_messages() {
        let body = "Spent Rs.450.00 On HDFC Bank Card XX1234 At SWIGGY BANGALORE";
        let key = compute_duplicate_key(body).unwrap();
        let mut scanner = BatchScanner::new(ClassificationContext::new()).with_known_hashes(vec![key]);

        let report = scanner.scan(&[RawMessage::new(BANK, body, at(0))]);
        assert_eq!(report.duplicates, 1);
        assert!(report.accepted.is_empty());
    }

    #[test]
    fn test_near_duplicate_with_different_reference_is_skipped() {
        let messages = vec![
            RawMessage::new(BANK, "Spent Rs.450.00 On HDFC Bank Card XX1234 At SWIGGY BANGALORE. Ref 1111", at(0)),
            RawMessage::new(BANK, "Spent Rs.450.00 On HDFC Bank Card XX1234 At SWIGGY BANGALORE. Ref 2222", at(2)),
        ];
        let report = BatchScanner::new(ClassificationContext::new()).scan(&messages);
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.near_duplicates.len(), 1);
        assert_eq!(report.near_duplicates[0].index, 1);
    }

    #[test]
    fn test_accepted_records_carry_account_suffixes_and_pair() {
        let messages = vec![
            RawMessage::new(BANK, "Your HDFC Bank Credit Card XX5678 statement is generated. Total due Rs 12,500.00", at(0)),
            RawMessage::new(
                BANK,
                "Rs 12,500.00 paid towards your HDFC Bank Credit Card XX5678 from A/c XX1234",
                at(60 * 24 * 10),
            ),
        ];
        let mut scanner = BatchScanner::new(ClassificationContext::new());
        let report = scanner.scan(&messages);
        assert_eq!(report.accepted.len(), 2);
        assert_eq!(report.accepted[0].account_last4.as_deref(), Some("5678"));
        assert_eq!(report.accepted[1].target_last4.as_deref(), Some("5678"));

        let links = scanner.pair(&report.accepted);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link_kind, LinkKind::CcPayment);
        assert_eq!(links[0].primary_id, report.accepted[0].id);
    }

    const FRAGMENTS: &[&str] = &[
        "Rs 500",
        "INR 1,250.00",
        "debited",
        "credited",
        "from A/c XX1234",
        "to RAJESH KUMAR",
        "at SWIGGY",
        "Card XX9876",
        "refund",
        "cashback",
        "salary",
        "via UPI",
        "Info: NEFT Cr-XYZ0001234-ASHA RAO-ASHA RAO-REF1",
        "statement",
        "payment received",
        "interest",
        "at 10:22:11 IST",
        "Thank you for your payment",
    ];

    fn body_strategy() -> impl Strategy<Value = String> {
        proptest::collection::vec(proptest::sample::select(FRAGMENTS), 1..7).prop_map(|parts| parts.join(" "))
    }

    proptest! {
        #[test]
        fn prop_credit_is_never_expense(body in body_strategy()) {
            if let Outcome::Classified(r) = run(&body) {
                if r.direction == Direction::Credit {
                    prop_assert_ne!(r.nature, TransactionNature::Expense);
                }
                if body.contains("credited") && !body.contains("debited") && !is_card_purchase(&body) {
                    prop_assert_eq!(r.direction, Direction::Credit);
                }
                if r.nature == TransactionNature::Transfer {
                    prop_assert!(r.counterparty.kind.is_account_holder());
                }
                let last = r.decision_trace.last().cloned().unwrap_or_default();
                prop_assert!(last.starts_with("final: "));
                let expected_suffix = format!("from {}", r.category_stage);
                prop_assert!(last.ends_with(&expected_suffix));
            }
        }

        #[test]
        fn prop_classification_is_deterministic(body in body_strategy()) {
            let first = serde_json::to_string(&run(&body)).unwrap();
            let second = serde_json::to_string(&run(&body)).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}

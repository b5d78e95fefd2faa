// 🗂️ Category Mapper - Fourteen stages, first match wins
//
// Stages run strictly in the order of CASCADE. A stage that does not apply
// returns None and leaves no trace; the one that fires records why. The
// generic fallback always fires, so every message gets a category and the
// trace always ends with the winning stage.

pub mod memory;
pub mod merchant_table;

use crate::cascade::{run_cascade, CascadeRule, Hit};
use crate::context::{target_account_suffix, AccountKind, ClassificationContext, CREDIT_BILL_PAYMENTS};
use crate::counterparty::templates::transfer_record_parties;
use crate::counterparty::NatureHint;
use crate::model::{CategoryStage, Counterparty, Direction, SenderClass};
use crate::phrases::Phrase;
use crate::sender::institution_code;
use crate::text::{contains_whole_word, holder_name_matches, same_person};
use crate::trace::{DecisionTrace, Traced};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const SELF_TRANSFER: &str = "Self Transfer";
pub const SALARY: &str = "Salary";
pub const INTEREST: &str = "Interest";
pub const RECURRING_DEPOSIT: &str = "Recurring Deposit";
pub const CASHBACK: &str = "Cashback & Rewards";
pub const STATEMENTS: &str = "Statements";
pub const PENDING: &str = "Pending";
pub const REFUNDS: &str = "Refunds";
pub const WALLET_LOAD: &str = "Wallet Load";
pub const RETIREMENT_SAVINGS: &str = "Retirement Savings";
pub const INVESTMENTS: &str = "Investments";
pub const INSURANCE: &str = "Insurance";
pub const MISCELLANEOUS: &str = "Miscellaneous";
pub const UNCATEGORIZED: &str = "Uncategorized";
pub const OTHER_INCOME: &str = "Other Income";
pub const UNVERIFIED_INCOME: &str = "Unverified Income";
pub const P2P_TRANSFERS: &str = "P2P Transfers";

/// Everything a stage may look at. Borrowed, never mutated.
pub struct CategoryInput<'a> {
    pub body: &'a str,
    pub sender: &'a str,
    pub direction: Direction,
    pub hint: NatureHint,
    pub sender_class: SenderClass,
    pub amount_minor: i64,
    pub counterparty: &'a Counterparty,
    pub context: &'a ClassificationContext,
}

/// A stage's answer
#[derive(Debug, Clone, PartialEq)]
pub struct Categorized {
    pub category: String,
    /// Generic marker category that needs human review
    pub unresolved: bool,
}

impl Categorized {
    fn new(category: &str) -> Self {
        Categorized {
            category: category.to_string(),
            unresolved: false,
        }
    }

    fn unresolved(category: &str) -> Self {
        Categorized {
            category: category.to_string(),
            unresolved: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDecision {
    pub category: String,
    pub stage: CategoryStage,
    pub unresolved: bool,
}

// ============================================================================
// CASCADE
// ============================================================================

type Matcher = for<'a, 'b> fn(&'b CategoryInput<'a>) -> Option<Hit<Categorized>>;

pub struct CategoryRule {
    pub stage: CategoryStage,
    matcher: Matcher,
}

impl<'a> CascadeRule<CategoryInput<'a>, Categorized> for CategoryRule {
    fn name(&self) -> &str {
        self.stage.as_str()
    }

    fn apply(&self, input: &CategoryInput<'a>) -> Option<Hit<Categorized>> {
        (self.matcher)(input)
    }
}

const fn rule(stage: CategoryStage, matcher: Matcher) -> CategoryRule {
    CategoryRule { stage, matcher }
}

/// Strict priority order
pub static CASCADE: [CategoryRule; 14] = [
    rule(CategoryStage::SelfTransferRecord, self_transfer_record),
    rule(CategoryStage::KnownSalarySource, known_salary_source),
    rule(CategoryStage::SalaryCompany, salary_company),
    rule(CategoryStage::Interest, interest),
    rule(CategoryStage::UserRule, user_rule),
    rule(CategoryStage::OwnAccount, own_account),
    rule(CategoryStage::OwnName, own_name),
    rule(CategoryStage::RecurringDeposit, recurring_deposit),
    rule(CategoryStage::Cashback, cashback),
    rule(CategoryStage::MerchantTable, merchant_table_stage),
    rule(CategoryStage::AdaptiveMemory, adaptive_memory),
    rule(CategoryStage::Statistical, statistical),
    rule(CategoryStage::TypeDefault, type_default),
    rule(CategoryStage::GenericFallback, generic_fallback),
];

pub struct CategoryMapper;

impl CategoryMapper {
    pub fn new() -> Self {
        CategoryMapper
    }

    pub fn categorize(&self, input: &CategoryInput<'_>) -> Traced<CategoryDecision> {
        let mut trace = DecisionTrace::new();

        let decision = match run_cascade(&CASCADE, input, &mut trace) {
            Some(found) => CategoryDecision {
                category: found.value.category,
                stage: CASCADE[found.index].stage,
                unresolved: found.value.unresolved,
            },
            None => CategoryDecision {
                category: UNCATEGORIZED.to_string(),
                stage: CategoryStage::GenericFallback,
                unresolved: true,
            },
        };

        Traced::new(decision, trace)
    }
}

impl Default for CategoryMapper {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// STAGES
// ============================================================================

fn self_transfer_record(input: &CategoryInput<'_>) -> Option<Hit<Categorized>> {
    let (sender, receiver) = transfer_record_parties(input.body)?;
    same_person(&sender, &receiver).then(|| {
        Hit::new(
            Categorized::new(SELF_TRANSFER),
            format!("transfer record sender '{}' is receiver '{}'", sender, receiver),
        )
    })
}

fn known_salary_source(input: &CategoryInput<'_>) -> Option<Hit<Categorized>> {
    if input.direction != Direction::Credit {
        return None;
    }
    let name = input.counterparty.name.as_deref()?;
    let code = institution_code(input.sender);
    let source = input
        .context
        .salary_sources
        .iter()
        .find(|s| s.matches(&code, name))?;
    Some(Hit::new(
        Categorized::new(SALARY),
        format!(
            "recurring salary source ({}, '{}')",
            source.institution_code, source.sender_name
        ),
    ))
}

fn salary_company(input: &CategoryInput<'_>) -> Option<Hit<Categorized>> {
    if input.direction != Direction::Credit {
        return None;
    }
    let company = input
        .context
        .salary_company_names
        .iter()
        .find(|name| contains_whole_word(input.body, name))?;
    Some(Hit::new(
        Categorized::new(SALARY),
        format!("employer '{}' named in credit", company.trim()),
    ))
}

fn interest(input: &CategoryInput<'_>) -> Option<Hit<Categorized>> {
    if input.direction != Direction::Credit {
        return None;
    }
    let phrase = Phrase::Interest.find(input.body)?;
    Some(Hit::new(
        Categorized::new(INTEREST),
        format!("interest phrase '{}'", phrase),
    ))
}

fn user_rule(input: &CategoryInput<'_>) -> Option<Hit<Categorized>> {
    let rule = input.context.rules.find_match(input.counterparty)?;
    match input.context.category_name(rule.category_id) {
        Ok(name) => Some(Hit::new(
            Categorized::new(name),
            format!(
                "rule '{}' ({} '{}')",
                rule.id,
                rule.pattern_type.as_str(),
                rule.pattern
            ),
        )),
        Err(e) => {
            warn!(
                rule = %rule.id,
                error = %e,
                "user rule points at an unknown category, skipping"
            );
            None
        }
    }
}

fn own_account(input: &CategoryInput<'_>) -> Option<Hit<Categorized>> {
    let cp = input.counterparty;
    let target = if input.direction == Direction::Debit {
        target_account_suffix(input.body)
    } else {
        None
    };

    let (account, evidence) = input.context.known_accounts.iter().find_map(|account| {
        let last4 = account.last4.trim();
        if last4.is_empty() {
            return None;
        }
        if cp.name.as_deref().is_some_and(|n| n.contains(last4)) {
            return Some((account, "counterparty name"));
        }
        if cp.handle.as_deref().is_some_and(|h| h.contains(last4)) {
            return Some((account, "counterparty handle"));
        }
        if target.as_deref() == Some(last4) {
            return Some((account, "target account"));
        }
        None
    })?;

    let category = match account.kind {
        AccountKind::CreditCard => CREDIT_BILL_PAYMENTS,
        AccountKind::Bank => SELF_TRANSFER,
    };
    Some(Hit::new(
        Categorized::new(category),
        format!("{} carries own account suffix {}", evidence, account.last4),
    ))
}

fn own_name(input: &CategoryInput<'_>) -> Option<Hit<Categorized>> {
    let name = input.counterparty.name.as_deref()?;
    let holder = input
        .context
        .holder_names()
        .find(|holder| holder_name_matches(name, holder))?;
    Some(Hit::new(
        Categorized::new(SELF_TRANSFER),
        format!("counterparty '{}' matches own holder name '{}'", name, holder),
    ))
}

fn recurring_deposit(input: &CategoryInput<'_>) -> Option<Hit<Categorized>> {
    let phrase = Phrase::RecurringDeposit.find(input.body)?;
    Some(Hit::new(
        Categorized::new(RECURRING_DEPOSIT),
        format!("recurring deposit phrase '{}'", phrase),
    ))
}

fn cashback(input: &CategoryInput<'_>) -> Option<Hit<Categorized>> {
    if input.direction == Direction::Debit {
        return None;
    }
    let phrase = Phrase::Cashback.find(input.body)?;
    Some(Hit::new(
        Categorized::new(CASHBACK),
        format!("cashback phrase '{}'", phrase),
    ))
}

fn merchant_table_stage(input: &CategoryInput<'_>) -> Option<Hit<Categorized>> {
    // A refund names the merchant it came back from
    if input.direction == Direction::Credit && Phrase::Refund.matches(input.body) {
        return None;
    }

    let table = &input.context.merchant_table;
    let cp = input.counterparty;

    let found = cp
        .name
        .as_deref()
        .and_then(|name| table.lookup(name).map(|m| (m, "counterparty name")))
        .or_else(|| {
            cp.handle
                .as_deref()
                .and_then(|handle| table.lookup(handle).map(|m| (m, "counterparty handle")))
        })
        .or_else(|| {
            // People never inherit a merchant category from the message body
            if cp.kind.is_account_holder() {
                None
            } else {
                table.lookup_in_body(input.body).map(|m| (m, "message body"))
            }
        })?;

    let (matched, field) = found;
    Some(Hit::new(
        Categorized::new(matched.category),
        format!(
            "key '{}' in {} (table v{})",
            matched.key, field, table.version
        ),
    ))
}

fn adaptive_memory(input: &CategoryInput<'_>) -> Option<Hit<Categorized>> {
    let label = input.counterparty.label()?;
    let found = input.context.merchant_memory.lookup(label)?;
    Some(Hit::new(
        Categorized::new(found.category),
        format!("{} memory match on '{}'", found.kind.as_str(), found.key),
    ))
}

fn statistical(input: &CategoryInput<'_>) -> Option<Hit<Categorized>> {
    let classifier = input.context.statistical.as_ref()?;
    let text = match input.counterparty.label() {
        Some(label) => format!("{} {}", label, input.body),
        None => input.body.to_string(),
    };
    let prediction = classifier.classify(&text)?;
    let threshold = input.context.config.min_statistical_confidence;
    if prediction.confidence < threshold {
        debug!(
            category = %prediction.category,
            confidence = prediction.confidence,
            threshold,
            "statistical prediction below threshold"
        );
        return None;
    }
    Some(Hit::new(
        Categorized::new(&prediction.category),
        format!("predicted with confidence {:.2}", prediction.confidence),
    ))
}

fn type_default(input: &CategoryInput<'_>) -> Option<Hit<Categorized>> {
    let body = input.body;
    let found = |phrase: Phrase| phrase.find(body).map(|m| (phrase, m));

    if let Some((phrase, m)) =
        found(Phrase::CardPaymentReceived).or_else(|| found(Phrase::CardBillPayment))
    {
        return Some(Hit::new(
            Categorized::new(CREDIT_BILL_PAYMENTS),
            format!("{} phrase '{}'", phrase.name(), m),
        ));
    }
    if let Some(m) = Phrase::StatementNotice.find(body) {
        return Some(Hit::new(
            Categorized::new(STATEMENTS),
            format!("statement phrase '{}'", m),
        ));
    }
    if let Some(m) = Phrase::Pending.find(body) {
        return Some(Hit::new(
            Categorized::new(PENDING),
            format!("pending phrase '{}'", m),
        ));
    }
    if input.direction == Direction::Credit {
        if let Some(m) = Phrase::Refund.find(body) {
            return Some(Hit::new(
                Categorized::new(REFUNDS),
                format!("refund phrase '{}'", m),
            ));
        }
    }
    if input.direction == Direction::Debit {
        if let Some(m) = Phrase::WalletLoad.find(body) {
            return Some(Hit::new(
                Categorized::new(WALLET_LOAD),
                format!("wallet load phrase '{}'", m),
            ));
        }
    }

    match input.sender_class {
        SenderClass::Pension => Some(Hit::new(
            Categorized::new(RETIREMENT_SAVINGS),
            "pension sender",
        )),
        SenderClass::Investment => Some(Hit::new(
            Categorized::new(INVESTMENTS),
            "investment sender",
        )),
        SenderClass::Insurance => Some(Hit::new(
            Categorized::new(INSURANCE),
            "insurance sender",
        )),
        _ => Phrase::Investment.find(body).map(|m| {
            Hit::new(
                Categorized::new(INVESTMENTS),
                format!("investment phrase '{}'", m),
            )
        }),
    }
}

fn generic_fallback(input: &CategoryInput<'_>) -> Option<Hit<Categorized>> {
    let cp = input.counterparty;
    let hit = match input.direction {
        Direction::Credit => {
            let threshold = input.context.config.unverified_income_threshold_minor;
            if input.amount_minor >= threshold && !Phrase::IncomeSource.matches(input.body) {
                Hit::new(
                    Categorized::unresolved(UNVERIFIED_INCOME),
                    format!("credit of {} minor units with no source phrase", input.amount_minor),
                )
            } else {
                Hit::new(Categorized::new(OTHER_INCOME), "credit with no specific rule")
            }
        }
        Direction::Debit | Direction::Unknown => match cp.label() {
            Some(label) => Hit::new(
                Categorized::new(MISCELLANEOUS),
                format!("counterparty '{}' with no specific rule", label),
            ),
            None => Hit::new(
                Categorized::unresolved(UNCATEGORIZED),
                "no counterparty and no specific rule",
            ),
        },
    };
    Some(hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Category, KnownAccount, SalarySource, SemanticType};
    use crate::model::CounterpartyKind;
    use crate::naive_bayes::{Prediction, StatisticalClassifier};
    use crate::rules::{CategorizationRule, PatternType, UserRuleSet};
    use std::sync::Arc;

    fn person(name: &str) -> Counterparty {
        Counterparty {
            name: Some(name.to_string()),
            handle: None,
            kind: CounterpartyKind::Person,
            decision_trace: vec![],
            confidence: 0.75,
        }
    }

    fn merchant(name: &str) -> Counterparty {
        Counterparty {
            kind: CounterpartyKind::Merchant,
            ..person(name)
        }
    }

    fn categorize(
        body: &str,
        direction: Direction,
        amount_minor: i64,
        counterparty: &Counterparty,
        context: &ClassificationContext,
    ) -> Traced<CategoryDecision> {
        let input = CategoryInput {
            body,
            sender: "VM-HDFCBK",
            direction,
            hint: NatureHint::infer(body, direction),
            sender_class: SenderClass::Bank,
            amount_minor,
            counterparty,
            context,
        };
        CategoryMapper::new().categorize(&input)
    }

    struct FixedPrediction(f64);

    impl StatisticalClassifier for FixedPrediction {
        fn classify(&self, _text: &str) -> Option<Prediction> {
            Some(Prediction {
                category: "Dining Out".to_string(),
                confidence: self.0,
            })
        }
    }

    #[test]
    fn test_cascade_order_matches_stage_enum() {
        let names: Vec<&str> = CASCADE.iter().map(|r| r.stage.as_str()).collect();
        assert_eq!(names.first(), Some(&"self-transfer-record"));
        assert_eq!(names.last(), Some(&"generic-fallback"));
        assert_eq!(names.len(), 14);
    }

    #[test]
    fn test_self_transfer_record_bypasses_user_rules() {
        let ctx = ClassificationContext::new()
            .with_rules(UserRuleSet::from_rules(vec![CategorizationRule::new(
                "r1",
                PatternType::NameContains,
                "GODALA",
                5,
            )]))
            .with_categories(vec![Category {
                id: 5,
                name: "Gifts".to_string(),
                semantic_type: SemanticType::Expense,
            }]);
        let body = "INR 50,000.00 credited to A/c XX1234. Info: NEFT Cr-XYZ0001234-GODALA SAIKUMAR-GODALA SAIKUMAR-REF555";
        let d = categorize(body, Direction::Credit, 5_000_000, &person("GODALA SAIKUMAR"), &ctx);
        assert_eq!(d.value.category, SELF_TRANSFER);
        assert_eq!(d.value.stage, CategoryStage::SelfTransferRecord);
        assert_eq!(d.trace.len(), 1);
        assert!(d.trace.last().unwrap().starts_with("self-transfer-record: "));
    }

    #[test]
    fn test_self_transfer_record_ignores_direction() {
        let ctx = ClassificationContext::new();
        let body = "Rs 5000 debited from A/c XX1234. NEFT Cr-XYZ0001234-Godala Saikumar-GODALA SAIKUMAR-REF9";
        for direction in [Direction::Debit, Direction::Credit] {
            let d = categorize(body, direction, 500_000, &Counterparty::unknown(vec![]), &ctx);
            assert_eq!(d.value.category, SELF_TRANSFER);
        }
    }

    #[test]
    fn test_salary_company_requires_whole_word_in_credit() {
        let ctx = ClassificationContext::new().with_salary_company_names(vec!["ACME CORP".to_string()]);
        let cp = Counterparty::unknown(vec![]);

        let d = categorize("Rs 50000 credited by ACME CORP salary", Direction::Credit, 5_000_000, &cp, &ctx);
        assert_eq!(d.value.category, SALARY);

        let d = categorize("Rs 50000 credited; salary for March", Direction::Credit, 5_000_000, &cp, &ctx);
        assert_eq!(d.value.category, OTHER_INCOME);
        assert_eq!(d.value.stage, CategoryStage::GenericFallback);
    }

    #[test]
    fn test_known_salary_source() {
        let ctx = ClassificationContext::new()
            .with_salary_sources(vec![SalarySource::new("HDFCBK", "ACME CORP")]);
        let d = categorize(
            "Rs 80000 credited from ACME CORP PVT LTD",
            Direction::Credit,
            8_000_000,
            &merchant("ACME CORP PVT LTD"),
            &ctx,
        );
        assert_eq!(d.value.stage, CategoryStage::KnownSalarySource);
    }

    #[test]
    fn test_user_rule_with_unknown_category_is_skipped() {
        let ctx = ClassificationContext::new().with_rules(UserRuleSet::from_rules(vec![
            CategorizationRule::new("dangling", PatternType::NameContains, "SWIGGY", 404),
        ]));
        let d = categorize(
            "Spent Rs 450 on Card XX1234 at SWIGGY",
            Direction::Debit,
            45_000,
            &merchant("SWIGGY"),
            &ctx,
        );
        assert_eq!(d.value.stage, CategoryStage::MerchantTable);
        assert_eq!(d.value.category, "Food Delivery");
    }

    #[test]
    fn test_own_account_by_kind() {
        let ctx = ClassificationContext::new().with_known_accounts(vec![
            KnownAccount::new("5678", AccountKind::CreditCard),
            KnownAccount::new("4321", AccountKind::Bank),
        ]);
        let cp = Counterparty::unknown(vec![]);

        let d = categorize(
            "Rs 15000 debited from A/c XX1234 towards your credit card XX5678",
            Direction::Debit,
            1_500_000,
            &cp,
            &ctx,
        );
        assert_eq!(d.value.category, CREDIT_BILL_PAYMENTS);
        assert_eq!(d.value.stage, CategoryStage::OwnAccount);

        let d = categorize(
            "Rs 5000 transferred to A/c ending 4321",
            Direction::Debit,
            500_000,
            &cp,
            &ctx,
        );
        assert_eq!(d.value.category, SELF_TRANSFER);
    }

    #[test]
    fn test_own_name_abbreviated() {
        let ctx = ClassificationContext::new().with_known_accounts(vec![
            KnownAccount::new("1234", AccountKind::Bank).with_holder("GODALA SAIKUMAR"),
        ]);
        let d = categorize(
            "Rs 2000 sent to G SAIKUMAR via UPI",
            Direction::Debit,
            200_000,
            &person("G SAIKUMAR"),
            &ctx,
        );
        assert_eq!(d.value.category, SELF_TRANSFER);
        assert_eq!(d.value.stage, CategoryStage::OwnName);
    }

    #[test]
    fn test_surname_fragment_is_not_own_name() {
        let ctx = ClassificationContext::new().with_known_accounts(vec![
            KnownAccount::new("1234", AccountKind::Bank).with_holder("GODALA SAIKUMAR"),
        ]);
        let d = categorize(
            "Rs 2000 sent to KUMAR via UPI",
            Direction::Debit,
            200_000,
            &person("KUMAR"),
            &ctx,
        );
        assert_ne!(d.value.category, SELF_TRANSFER);
        assert_ne!(d.value.stage, CategoryStage::OwnName);
    }

    #[test]
    fn test_cashback_only_for_non_debits() {
        let ctx = ClassificationContext::new();
        let cp = Counterparty::unknown(vec![]);
        let d = categorize("Cashback of Rs 50 credited to your a/c", Direction::Credit, 5_000, &cp, &ctx);
        assert_eq!(d.value.category, CASHBACK);

        let d = categorize("Rs 50 debited, cashback offer applied", Direction::Debit, 5_000, &cp, &ctx);
        assert_ne!(d.value.category, CASHBACK);
    }

    #[test]
    fn test_longest_merchant_key_wins() {
        let ctx = ClassificationContext::new();
        let d = categorize(
            "Spent Rs 900 on Card XX1234 at SWIGGY INSTAMART",
            Direction::Debit,
            90_000,
            &merchant("SWIGGY INSTAMART"),
            &ctx,
        );
        assert_eq!(d.value.category, "Groceries");
    }

    #[test]
    fn test_credited_never_triggers_brand_key() {
        let ctx = ClassificationContext::new();
        let cp = Counterparty::unknown(vec![]);
        let d = categorize("Rs 500 CREDITED to your a/c", Direction::Credit, 50_000, &cp, &ctx);
        assert_ne!(d.value.stage, CategoryStage::MerchantTable);
    }

    #[test]
    fn test_person_never_gets_body_merchant() {
        let ctx = ClassificationContext::new();
        let d = categorize(
            "Rs 300 sent to RAJESH KUMAR for RENT via UPI",
            Direction::Debit,
            30_000,
            &person("RAJESH KUMAR"),
            &ctx,
        );
        assert_eq!(d.value.category, MISCELLANEOUS);
        assert!(d.value.stage.is_fallback());
    }

    #[test]
    fn test_adaptive_memory_after_table() {
        let ctx = ClassificationContext::new()
            .with_merchant_memory(memory::MerchantMemory::from_pairs([("CHAI POINT", "Dining Out")]));
        let d = categorize(
            "Spent Rs 120 on Card XX1234 at CHAI POINT KORAMANGALA",
            Direction::Debit,
            12_000,
            &merchant("CHAI POINT KORAMANGALA"),
            &ctx,
        );
        assert_eq!(d.value.stage, CategoryStage::AdaptiveMemory);
        assert_eq!(d.value.category, "Dining Out");
    }

    #[test]
    fn test_statistical_threshold() {
        let cp = merchant("UNKNOWN EATERY");
        let body = "Spent Rs 120 on Card XX1234 at UNKNOWN EATERY";

        let confident = ClassificationContext::new().with_statistical(Arc::new(FixedPrediction(0.93)));
        let d = categorize(body, Direction::Debit, 12_000, &cp, &confident);
        assert_eq!(d.value.stage, CategoryStage::Statistical);

        let unsure = ClassificationContext::new().with_statistical(Arc::new(FixedPrediction(0.5)));
        let d = categorize(body, Direction::Debit, 12_000, &cp, &unsure);
        assert_eq!(d.value.stage, CategoryStage::GenericFallback);
        assert_eq!(d.value.category, MISCELLANEOUS);
    }

    #[test]
    fn test_type_defaults() {
        let ctx = ClassificationContext::new();
        let cp = Counterparty::unknown(vec![]);

        let d = categorize(
            "Payment of Rs 15000 received on your credit card XX5678. Thank you",
            Direction::Credit,
            1_500_000,
            &cp,
            &ctx,
        );
        assert_eq!(d.value.category, CREDIT_BILL_PAYMENTS);
        assert_eq!(d.value.stage, CategoryStage::TypeDefault);

        let d = categorize("Rs 700 refund credited to your a/c", Direction::Credit, 70_000, &cp, &ctx);
        assert_eq!(d.value.category, REFUNDS);
    }

    #[test]
    fn test_unverified_income_and_uncategorized() {
        let ctx = ClassificationContext::new();
        let cp = Counterparty::unknown(vec![]);

        let d = categorize("Rs 90000 credited to your a/c XX1234", Direction::Credit, 9_000_000, &cp, &ctx);
        assert_eq!(d.value.category, UNVERIFIED_INCOME);
        assert!(d.value.unresolved);

        let d = categorize("Rs 90 debited from a/c XX1234", Direction::Debit, 9_000, &cp, &ctx);
        assert_eq!(d.value.category, UNCATEGORIZED);
        assert!(d.value.unresolved);
    }
}

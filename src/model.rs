// 📨 Core Types - Messages in, classified facts out
//
// RawMessage is the only input. Everything else is derived from it plus the
// read-only collaborator context. Amounts are integer minor units (paise).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// INPUT
// ============================================================================

/// One notification exactly as received. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub sender: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl RawMessage {
    pub fn new(sender: impl Into<String>, body: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        RawMessage {
            sender: sender.into(),
            body: body.into(),
            timestamp,
        }
    }
}

// ============================================================================
// EXTRACTED FACTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Money left the user's account
    Debit,
    /// Money arrived in the user's account
    Credit,
    /// No direction keyword found
    Unknown,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Debit => "DEBIT",
            Direction::Credit => "CREDIT",
            Direction::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedAmount {
    /// Amount in minor units; `None` means no amount could be parsed
    pub amount_minor: Option<i64>,
    pub direction: Direction,
}

/// Coarse class of the originating address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderClass {
    Bank,
    Pension,
    Investment,
    Insurance,
    VirtualCard,
    /// Promotional, OTP-only or unknown sender. Short-circuits the pipeline.
    Excluded,
}

impl SenderClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderClass::Bank => "BANK",
            SenderClass::Pension => "PENSION",
            SenderClass::Investment => "INVESTMENT",
            SenderClass::Insurance => "INSURANCE",
            SenderClass::VirtualCard => "VIRTUAL_CARD",
            SenderClass::Excluded => "EXCLUDED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CounterpartyKind {
    Merchant,
    Person,
    BankAccount,
    Unknown,
}

impl CounterpartyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterpartyKind::Merchant => "MERCHANT",
            CounterpartyKind::Person => "PERSON",
            CounterpartyKind::BankAccount => "BANK_ACCOUNT",
            CounterpartyKind::Unknown => "UNKNOWN",
        }
    }

    /// Transfers may only target account holders
    pub fn is_account_holder(&self) -> bool {
        matches!(self, CounterpartyKind::Person | CounterpartyKind::BankAccount)
    }
}

/// The other side of the transaction as recovered from the message text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counterparty {
    pub name: Option<String>,
    pub handle: Option<String>,
    pub kind: CounterpartyKind,
    pub decision_trace: Vec<String>,
    /// 0.0 - 1.0
    pub confidence: f64,
}

impl Counterparty {
    /// Fixed name carried by every statement notice
    pub const STATEMENT_SENTINEL: &'static str = "Card Statement";

    pub fn unknown(decision_trace: Vec<String>) -> Self {
        Counterparty {
            name: None,
            handle: None,
            kind: CounterpartyKind::Unknown,
            decision_trace,
            confidence: 0.0,
        }
    }

    pub fn statement_sentinel(decision_trace: Vec<String>) -> Self {
        Counterparty {
            name: Some(Self::STATEMENT_SENTINEL.to_string()),
            handle: None,
            kind: CounterpartyKind::Unknown,
            decision_trace,
            confidence: 1.0,
        }
    }

    pub fn is_identified(&self) -> bool {
        self.name.is_some() || self.handle.is_some()
    }

    /// Name if present, otherwise the handle
    pub fn label(&self) -> Option<&str> {
        self.name.as_deref().or(self.handle.as_deref())
    }
}

// ============================================================================
// NATURE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionNature {
    Expense,
    Income,
    Transfer,
    LiabilityPayment,
    Statement,
    Pending,
    Cashback,
    Refund,
    InvestmentContribution,
    InvestmentOutflow,
    #[default]
    Unknown,
    Ignore,
}

impl TransactionNature {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionNature::Expense => "EXPENSE",
            TransactionNature::Income => "INCOME",
            TransactionNature::Transfer => "TRANSFER",
            TransactionNature::LiabilityPayment => "LIABILITY_PAYMENT",
            TransactionNature::Statement => "STATEMENT",
            TransactionNature::Pending => "PENDING",
            TransactionNature::Cashback => "CASHBACK",
            TransactionNature::Refund => "REFUND",
            TransactionNature::InvestmentContribution => "INVESTMENT_CONTRIBUTION",
            TransactionNature::InvestmentOutflow => "INVESTMENT_OUTFLOW",
            TransactionNature::Unknown => "UNKNOWN",
            TransactionNature::Ignore => "IGNORE",
        }
    }
}

impl fmt::Display for TransactionNature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CATEGORY STAGES
// ============================================================================

/// Which step of the category cascade produced the category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryStage {
    SelfTransferRecord,
    KnownSalarySource,
    SalaryCompany,
    Interest,
    UserRule,
    OwnAccount,
    OwnName,
    RecurringDeposit,
    Cashback,
    MerchantTable,
    AdaptiveMemory,
    Statistical,
    TypeDefault,
    GenericFallback,
    /// Category rewritten by the outgoing peer-to-peer invariant
    PeerToPeerInvariant,
}

impl CategoryStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryStage::SelfTransferRecord => "self-transfer-record",
            CategoryStage::KnownSalarySource => "known-salary-source",
            CategoryStage::SalaryCompany => "salary-company",
            CategoryStage::Interest => "interest",
            CategoryStage::UserRule => "user-rule",
            CategoryStage::OwnAccount => "own-account",
            CategoryStage::OwnName => "own-name",
            CategoryStage::RecurringDeposit => "recurring-deposit",
            CategoryStage::Cashback => "cashback",
            CategoryStage::MerchantTable => "merchant-table",
            CategoryStage::AdaptiveMemory => "adaptive-memory",
            CategoryStage::Statistical => "statistical",
            CategoryStage::TypeDefault => "type-default",
            CategoryStage::GenericFallback => "generic-fallback",
            CategoryStage::PeerToPeerInvariant => "outgoing-p2p-invariant",
        }
    }

    /// Stages reached only because nothing more specific matched
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            CategoryStage::Statistical | CategoryStage::TypeDefault | CategoryStage::GenericFallback
        )
    }
}

impl fmt::Display for CategoryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RESULT
// ============================================================================

/// Hard rules the resolver enforces after its own decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Invariant {
    CreditNeverExpense,
    CardPaymentReceived,
    LiabilityCategoryNotExpense,
    OutgoingPeerToPeer,
    TransferNeedsAccountHolder,
}

impl Invariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Invariant::CreditNeverExpense => "credit-never-expense",
            Invariant::CardPaymentReceived => "card-payment-received",
            Invariant::LiabilityCategoryNotExpense => "liability-category-not-expense",
            Invariant::OutgoingPeerToPeer => "outgoing-p2p",
            Invariant::TransferNeedsAccountHolder => "transfer-needs-account-holder",
        }
    }
}

/// A resolved nature overridden by an invariant. Always logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvariantCorrection {
    pub invariant: Invariant,
    pub from: TransactionNature,
    pub to: TransactionNature,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub amount_minor: i64,
    pub direction: Direction,
    pub nature: TransactionNature,
    pub category: String,
    pub category_stage: CategoryStage,
    pub counterparty: Counterparty,
    pub sender_class: SenderClass,
    /// Emitted with a generic marker category for human review
    pub unresolved: bool,
    pub corrections: Vec<InvariantCorrection>,
    pub decision_trace: Vec<String>,
}

impl ClassificationResult {
    pub fn was_corrected(&self) -> bool {
        !self.corrections.is_empty()
    }
}

/// Why a message was intentionally excluded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "kebab-case")]
pub enum DropReason {
    ExcludedSender,
    UnparseableAmount,
    IndeterminateDirection,
    NonTransactional(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::ExcludedSender => write!(f, "excluded sender"),
            DropReason::UnparseableAmount => write!(f, "unparseable amount"),
            DropReason::IndeterminateDirection => write!(f, "indeterminate direction"),
            DropReason::NonTransactional(what) => write!(f, "non-transactional notice ({})", what),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Outcome {
    Classified(ClassificationResult),
    Dropped { reason: DropReason },
}

impl Outcome {
    pub fn classified(&self) -> Option<&ClassificationResult> {
        match self {
            Outcome::Classified(result) => Some(result),
            Outcome::Dropped { .. } => None,
        }
    }

    pub fn drop_reason(&self) -> Option<&DropReason> {
        match self {
            Outcome::Classified(_) => None,
            Outcome::Dropped { reason } => Some(reason),
        }
    }
}

// ============================================================================
// BATCH RECORD
// ============================================================================

/// An accepted message with its classification, as handed to persistence
/// and to the pairer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedTransaction {
    /// Stable identity (UUID) assigned at acceptance
    pub id: String,
    pub sender: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub duplicate_key: Option<String>,
    pub result: ClassificationResult,
    /// Last four digits of the user's own account named in the message
    pub account_last4: Option<String>,
    /// Last four digits of the account the money went to, if stated
    pub target_last4: Option<String>,
    /// Already linked or manually settled; the pairer skips it
    #[serde(default)]
    pub resolved: bool,
}

/// Render minor units as a plain decimal string ("450.00")
pub fn format_minor(amount_minor: i64) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

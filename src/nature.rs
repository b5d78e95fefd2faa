// ⚖️ Transaction Nature - Authoritative type plus hard invariants
//
// Resolution walks the message phrasing in a fixed order. Invariants run
// afterwards and may override the resolved nature; every override is
// recorded as an InvariantCorrection, logged at warn and traced.

use crate::amount::is_card_purchase;
use crate::categorizer::{
    CategoryDecision, CASHBACK, INVESTMENTS, P2P_TRANSFERS, RECURRING_DEPOSIT, REFUNDS, SELF_TRANSFER,
};
use crate::context::ClassificationContext;
use crate::model::{
    CategoryStage, Counterparty, CounterpartyKind, Direction, Invariant, InvariantCorrection,
    SenderClass, TransactionNature,
};
use crate::phrases::Phrase;
use crate::trace::{DecisionTrace, Traced};
use tracing::{debug, warn};

const STAGE: &str = "nature";
const INVARIANT: &str = "invariant";

pub struct NatureInput<'a> {
    pub body: &'a str,
    pub direction: Direction,
    pub sender_class: SenderClass,
    pub decision: &'a CategoryDecision,
    pub counterparty: &'a Counterparty,
    pub context: &'a ClassificationContext,
}

/// Final nature, plus the category and counterparty as the invariants left them
#[derive(Debug, Clone, PartialEq)]
pub struct NatureResolution {
    pub nature: TransactionNature,
    pub category: String,
    pub category_stage: CategoryStage,
    pub unresolved: bool,
    pub counterparty: Counterparty,
    pub corrections: Vec<InvariantCorrection>,
}

pub struct TransactionNatureResolver;

impl TransactionNatureResolver {
    pub fn new() -> Self {
        TransactionNatureResolver
    }

    pub fn resolve(&self, input: &NatureInput<'_>) -> Traced<NatureResolution> {
        let mut trace = DecisionTrace::new();
        let (nature, reason) = resolve_nature(input);
        debug!(nature = nature.as_str(), reason = %reason, "nature resolved");
        trace.record(STAGE, format!("{} ({})", nature, reason));

        let mut resolution = NatureResolution {
            nature,
            category: input.decision.category.clone(),
            category_stage: input.decision.stage,
            unresolved: input.decision.unresolved,
            counterparty: input.counterparty.clone(),
            corrections: Vec::new(),
        };

        enforce_invariants(input, &mut resolution, &mut trace);
        Traced::new(resolution, trace)
    }
}

impl Default for TransactionNatureResolver {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

fn resolve_nature(input: &NatureInput<'_>) -> (TransactionNature, String) {
    let body = input.body;
    let category = input.decision.category.as_str();

    if let Some(m) = Phrase::Declined.find(body) {
        return (TransactionNature::Ignore, format!("declined phrase '{}'", m));
    }
    if let Some(m) = Phrase::Pending.find(body) {
        return (TransactionNature::Pending, format!("pending phrase '{}'", m));
    }
    if let Some(m) = Phrase::CardPaymentReceived
        .find(body)
        .or_else(|| Phrase::CardBillPayment.find(body))
    {
        return (
            TransactionNature::LiabilityPayment,
            format!("card settlement phrase '{}'", m),
        );
    }
    if input.context.is_liability_category(category) {
        return (
            TransactionNature::LiabilityPayment,
            format!("liability category '{}'", category),
        );
    }
    if let Some(m) = Phrase::StatementNotice.find(body) {
        return (TransactionNature::Statement, format!("statement phrase '{}'", m));
    }
    if input.direction == Direction::Debit && is_card_purchase(body) {
        return (TransactionNature::Expense, "card purchase phrasing".to_string());
    }
    if category == SELF_TRANSFER {
        return (TransactionNature::Transfer, "self-transfer evidence".to_string());
    }

    match input.direction {
        Direction::Credit => {
            if category == REFUNDS || Phrase::Refund.matches(body) {
                return (TransactionNature::Refund, "refund on a credit".to_string());
            }
            if category == CASHBACK || Phrase::Cashback.matches(body) {
                return (TransactionNature::Cashback, "cashback on a credit".to_string());
            }
            return (TransactionNature::Income, "credit".to_string());
        }
        Direction::Unknown => {
            return (TransactionNature::Unknown, "no direction".to_string());
        }
        Direction::Debit => {}
    }

    if input.sender_class == SenderClass::Pension
        || category == RECURRING_DEPOSIT
        || Phrase::RecurringDeposit.matches(body)
    {
        return (
            TransactionNature::InvestmentContribution,
            "pension or recurring deposit contribution".to_string(),
        );
    }
    if input.sender_class == SenderClass::Investment
        || category == INVESTMENTS
        || Phrase::Investment.matches(body)
    {
        return (
            TransactionNature::InvestmentOutflow,
            "investment platform debit".to_string(),
        );
    }

    (TransactionNature::Expense, "debit".to_string())
}

// ============================================================================
// INVARIANTS
// ============================================================================

fn correct(
    resolution: &mut NatureResolution,
    trace: &mut DecisionTrace,
    invariant: Invariant,
    to: TransactionNature,
    reason: String,
) {
    let from = resolution.nature;
    warn!(
        invariant = invariant.as_str(),
        from = from.as_str(),
        to = to.as_str(),
        reason = %reason,
        "invariant forced a nature correction"
    );
    trace.record(
        INVARIANT,
        format!("{} forced {} -> {} ({})", invariant.as_str(), from, to, reason),
    );
    resolution.nature = to;
    resolution.corrections.push(InvariantCorrection {
        invariant,
        from,
        to,
        reason,
    });
}

fn enforce_invariants(input: &NatureInput<'_>, resolution: &mut NatureResolution, trace: &mut DecisionTrace) {
    // Card payment received is a liability settlement, never anything else
    if let Some(m) = Phrase::CardPaymentReceived.find(input.body) {
        if !matches!(
            resolution.nature,
            TransactionNature::LiabilityPayment | TransactionNature::Pending
        ) {
            correct(
                resolution,
                trace,
                Invariant::CardPaymentReceived,
                TransactionNature::LiabilityPayment,
                format!("body states '{}'", m),
            );
        }
    }

    if resolution.nature == TransactionNature::Expense
        && input.context.is_liability_category(&resolution.category)
    {
        let reason = format!("category '{}' is a liability payment", resolution.category);
        correct(
            resolution,
            trace,
            Invariant::LiabilityCategoryNotExpense,
            TransactionNature::LiabilityPayment,
            reason,
        );
    }

    // Outgoing money to a person is not consumption just because nothing
    // more specific matched
    if resolution.nature == TransactionNature::Expense
        && resolution.category_stage.is_fallback()
        && input.direction == Direction::Debit
        && resolution.counterparty.is_identified()
        && resolution.counterparty.kind.is_account_holder()
        && resolution.category != SELF_TRANSFER
    {
        let reason = format!(
            "fallback category '{}' for outgoing payment to {} '{}'",
            resolution.category,
            resolution.counterparty.kind.as_str(),
            resolution.counterparty.label().unwrap_or_default()
        );
        correct(
            resolution,
            trace,
            Invariant::OutgoingPeerToPeer,
            TransactionNature::Transfer,
            reason,
        );
        trace.record(
            INVARIANT,
            format!(
                "{} recategorised '{}' -> '{}'",
                Invariant::OutgoingPeerToPeer.as_str(),
                resolution.category,
                P2P_TRANSFERS
            ),
        );
        resolution.category = P2P_TRANSFERS.to_string();
        resolution.category_stage = CategoryStage::PeerToPeerInvariant;
        resolution.unresolved = false;
    }

    // Transfers target account holders
    if resolution.nature == TransactionNature::Transfer && !resolution.counterparty.kind.is_account_holder() {
        if resolution.category == SELF_TRANSFER {
            trace.record(
                INVARIANT,
                format!(
                    "{} set counterparty kind {} -> {} (own account)",
                    Invariant::TransferNeedsAccountHolder.as_str(),
                    resolution.counterparty.kind.as_str(),
                    CounterpartyKind::BankAccount.as_str()
                ),
            );
            resolution.counterparty.kind = CounterpartyKind::BankAccount;
        } else {
            let to = if input.direction == Direction::Credit {
                TransactionNature::Income
            } else {
                TransactionNature::Expense
            };
            let reason = format!(
                "counterparty kind {} cannot receive a transfer",
                resolution.counterparty.kind.as_str()
            );
            correct(resolution, trace, Invariant::TransferNeedsAccountHolder, to, reason);
        }
    }

    if input.direction == Direction::Credit && resolution.nature == TransactionNature::Expense {
        correct(
            resolution,
            trace,
            Invariant::CreditNeverExpense,
            TransactionNature::Income,
            "money arrived".to_string(),
        );
    }

    // Statements carry the fixed sentinel, never a parsed merchant
    if resolution.nature == TransactionNature::Statement
        && resolution.counterparty.name.as_deref() != Some(Counterparty::STATEMENT_SENTINEL)
    {
        trace.record(
            INVARIANT,
            format!(
                "statement counterparty '{}' replaced with '{}'",
                resolution.counterparty.label().unwrap_or("none"),
                Counterparty::STATEMENT_SENTINEL
            ),
        );
        let mut entries = std::mem::take(&mut resolution.counterparty.decision_trace);
        entries.push(format!(
            "{}: statement notice uses the fixed sentinel",
            INVARIANT
        ));
        resolution.counterparty = Counterparty::statement_sentinel(entries);
    }
}

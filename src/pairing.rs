// 🔗 Transaction Pairing - One real-world event seen twice
//
// Runs after a batch has been classified and handed to persistence. Three
// passes, each greedy over candidates sorted by confidence:
//   1. Self-transfer: an unresolved debit and a credit minutes apart. One
//      side must already carry self-transfer evidence unless amount-only
//      pairing is switched on.
//   2. Statement -> bill payment: a card statement and the payment that
//      settles it, days apart.
//   3. Bill payment -> payment received: the bank-side debit and the card
//      issuer's acknowledgement, hours apart.
// A transaction takes part in at most one link per pass.

use crate::categorizer::SELF_TRANSFER;
use crate::config::PipelineConfig;
use crate::model::{ClassifiedTransaction, Direction, TransactionNature};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkKind {
    SelfTransfer,
    CcPayment,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::SelfTransfer => "SELF_TRANSFER",
            LinkKind::CcPayment => "CC_PAYMENT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairingLink {
    pub primary_id: String,
    pub secondary_id: String,
    pub link_kind: LinkKind,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub reason: String,
}

/// A scored candidate before greedy selection
struct Candidate {
    primary: usize,
    secondary: usize,
    confidence: f64,
    reason: String,
}

pub struct TransactionPairer {
    /// Self-transfer window (default: 10 minutes)
    pub self_transfer_window: Duration,

    /// Statement -> payment window (default: 30 days)
    pub cc_statement_window: Duration,

    /// Payment -> payment received window (default: 48 hours)
    pub cc_settlement_window: Duration,

    /// Links below this confidence are discarded (default: 0.70)
    pub min_confidence: f64,

    /// Pair equal amounts with no self-transfer evidence (default: off)
    pub allow_amount_only: bool,
}

impl TransactionPairer {
    pub fn new(config: &PipelineConfig) -> Self {
        TransactionPairer {
            self_transfer_window: Duration::minutes(config.self_transfer_window_minutes),
            cc_statement_window: Duration::days(config.cc_statement_window_days),
            cc_settlement_window: Duration::hours(config.cc_settlement_window_hours),
            min_confidence: config.min_pairing_confidence,
            allow_amount_only: config.allow_amount_only_self_transfer,
        }
    }

    /// Link pairs in an already-classified batch. Deterministic for a given
    /// input order.
    pub fn pair_batch(&self, transactions: &[ClassifiedTransaction]) -> Vec<PairingLink> {
        let open: Vec<bool> = transactions.iter().map(|tx| !tx.resolved).collect();

        let mut links = Vec::new();
        let self_transfers = self.select(self.self_transfer_candidates(transactions, &open));
        let mut linked: HashSet<usize> = HashSet::new();
        for c in &self_transfers {
            linked.insert(c.primary);
            linked.insert(c.secondary);
        }
        links.extend(to_links(transactions, self_transfers, LinkKind::SelfTransfer));

        let open: Vec<bool> = open
            .iter()
            .enumerate()
            .map(|(i, o)| *o && !linked.contains(&i))
            .collect();
        links.extend(to_links(
            transactions,
            self.select(self.statement_candidates(transactions, &open)),
            LinkKind::CcPayment,
        ));
        links.extend(to_links(
            transactions,
            self.select(self.settlement_candidates(transactions, &open)),
            LinkKind::CcPayment,
        ));

        debug!(links = links.len(), batch = transactions.len(), "pairing complete");
        links
    }

    /// Greedy: best confidence first, ties by position, each side once
    fn select(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.retain(|c| c.confidence >= self.min_confidence);
        candidates.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.primary.cmp(&b.primary))
                .then_with(|| a.secondary.cmp(&b.secondary))
        });

        let mut used = HashSet::new();
        let mut chosen = Vec::new();
        for candidate in candidates {
            if used.contains(&candidate.primary) || used.contains(&candidate.secondary) {
                continue;
            }
            used.insert(candidate.primary);
            used.insert(candidate.secondary);
            chosen.push(candidate);
        }
        chosen
    }

    // ========================================================================
    // SELF-TRANSFERS
    // ========================================================================

    fn self_transfer_candidates(&self, txs: &[ClassifiedTransaction], open: &[bool]) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for (i, debit) in txs.iter().enumerate() {
            if !open[i] || debit.result.direction != Direction::Debit || !is_movable(debit) {
                continue;
            }
            for (j, credit) in txs.iter().enumerate() {
                if !open[j] || credit.result.direction != Direction::Credit || !is_movable(credit) {
                    continue;
                }
                if let Some(c) = self.score_self_transfer(i, debit, j, credit) {
                    candidates.push(c);
                }
            }
        }

        candidates
    }

    fn score_self_transfer(
        &self,
        i: usize,
        debit: &ClassifiedTransaction,
        j: usize,
        credit: &ClassifiedTransaction,
    ) -> Option<Candidate> {
        let gap = (credit.timestamp - debit.timestamp).num_seconds().abs();
        if gap > self.self_transfer_window.num_seconds() {
            return None;
        }

        // Same account on both sides is not a transfer between accounts
        if let (Some(a), Some(b)) = (&debit.account_last4, &credit.account_last4) {
            if a == b {
                return None;
            }
        }

        let suffix_match = matches!(
            (&debit.target_last4, &credit.account_last4),
            (Some(target), Some(account)) if target == account
        );
        let evidence_sides = [debit, credit].iter().filter(|tx| has_self_transfer_evidence(tx)).count();

        let (evidence, evidence_reason) = if suffix_match {
            (1.0, "target account suffix matches credited account")
        } else if evidence_sides == 2 {
            (1.0, "both sides carry self-transfer evidence")
        } else if evidence_sides == 1 {
            (0.8, "one side carries self-transfer evidence")
        } else if self.allow_amount_only {
            (0.5, "amount and time only")
        } else {
            return None;
        };

        let amount = amount_score(debit.result.amount_minor, credit.result.amount_minor);
        let time = 1.0 - gap as f64 / (self.self_transfer_window.num_seconds().max(1) as f64 + 1.0);
        let confidence = evidence * 0.5 + amount * 0.3 + time * 0.2;

        Some(Candidate {
            primary: i,
            secondary: j,
            confidence,
            reason: format!(
                "{}; amounts {} / {}; {}s apart",
                evidence_reason, debit.result.amount_minor, credit.result.amount_minor, gap
            ),
        })
    }

    // ========================================================================
    // CREDIT CARD SETTLEMENT
    // ========================================================================

    fn statement_candidates(&self, txs: &[ClassifiedTransaction], open: &[bool]) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for (i, statement) in txs.iter().enumerate() {
            if !open[i] || statement.result.nature != TransactionNature::Statement {
                continue;
            }
            for (j, payment) in txs.iter().enumerate() {
                if !open[j] || !is_bank_side_payment(payment) {
                    continue;
                }
                let gap = payment.timestamp - statement.timestamp;
                if gap < Duration::zero() || gap > self.cc_statement_window {
                    continue;
                }
                if let Some(c) = score_card_link(
                    i,
                    statement.account_last4.as_deref(),
                    statement.result.amount_minor,
                    j,
                    payment.target_last4.as_deref(),
                    payment.result.amount_minor,
                    gap,
                    self.cc_statement_window,
                ) {
                    candidates.push(c);
                }
            }
        }

        candidates
    }

    fn settlement_candidates(&self, txs: &[ClassifiedTransaction], open: &[bool]) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for (i, payment) in txs.iter().enumerate() {
            if !open[i] || !is_bank_side_payment(payment) {
                continue;
            }
            for (j, receipt) in txs.iter().enumerate() {
                if !open[j]
                    || receipt.result.nature != TransactionNature::LiabilityPayment
                    || receipt.result.direction != Direction::Credit
                {
                    continue;
                }
                let gap = receipt.timestamp - payment.timestamp;
                if gap < Duration::zero() || gap > self.cc_settlement_window {
                    continue;
                }
                if let Some(c) = score_card_link(
                    i,
                    payment.target_last4.as_deref(),
                    payment.result.amount_minor,
                    j,
                    receipt.account_last4.as_deref(),
                    receipt.result.amount_minor,
                    gap,
                    self.cc_settlement_window,
                ) {
                    candidates.push(c);
                }
            }
        }

        candidates
    }
}

impl Default for TransactionPairer {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

/// Shared account suffix 50%, amount proximity 30%, time proximity 20%.
/// Conflicting suffixes never pair.
#[allow(clippy::too_many_arguments)]
fn score_card_link(
    primary: usize,
    primary_card: Option<&str>,
    primary_amount: i64,
    secondary: usize,
    secondary_card: Option<&str>,
    secondary_amount: i64,
    gap: Duration,
    window: Duration,
) -> Option<Candidate> {
    let suffix = match (primary_card, secondary_card) {
        (Some(a), Some(b)) if a == b => 1.0,
        (Some(_), Some(_)) => return None,
        _ => 0.5,
    };
    let amount = amount_score(primary_amount, secondary_amount);
    let time = 1.0 - gap.num_seconds() as f64 / (window.num_seconds().max(1) as f64 + 1.0);
    let confidence = suffix * 0.5 + amount * 0.3 + time * 0.2;

    Some(Candidate {
        primary,
        secondary,
        confidence,
        reason: format!(
            "card {} / {}; amounts {} / {}; {}h apart",
            primary_card.unwrap_or("?"),
            secondary_card.unwrap_or("?"),
            primary_amount,
            secondary_amount,
            gap.num_hours()
        ),
    })
}

/// 1.0 for equal amounts, falling with the relative difference
fn amount_score(a: i64, b: i64) -> f64 {
    let larger = a.abs().max(b.abs());
    if larger == 0 {
        return 0.0;
    }
    1.0 - (a - b).abs() as f64 / larger as f64
}

fn has_self_transfer_evidence(tx: &ClassifiedTransaction) -> bool {
    tx.result.category == SELF_TRANSFER
}

fn is_movable(tx: &ClassifiedTransaction) -> bool {
    !matches!(
        tx.result.nature,
        TransactionNature::Ignore
            | TransactionNature::Pending
            | TransactionNature::Statement
            | TransactionNature::LiabilityPayment
    )
}

fn is_bank_side_payment(tx: &ClassifiedTransaction) -> bool {
    tx.result.nature == TransactionNature::LiabilityPayment && tx.result.direction == Direction::Debit
}

fn to_links(txs: &[ClassifiedTransaction], chosen: Vec<Candidate>, kind: LinkKind) -> Vec<PairingLink> {
    chosen
        .into_iter()
        .map(|c| PairingLink {
            primary_id: txs[c.primary].id.clone(),
            secondary_id: txs[c.secondary].id.clone(),
            link_kind: kind,
            confidence: c.confidence,
            reason: c.reason,
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

// 👥 Counterparty Extraction - Who was on the other side?
//
// Templates are evaluated strictly in order by the cascade runner. A
// template only wins if one of its candidates passes validation; otherwise
// the next template is tried. All knowledge lives in static tables, so
// extraction is idempotent.

pub mod handle;
pub mod templates;

use crate::amount::is_card_purchase;
use crate::cascade::{run_cascade, CascadeRule, Hit};
use crate::model::{Counterparty, CounterpartyKind, Direction};
use crate::trace::DecisionTrace;
use handle::{is_known_brand, parse_handle, ParsedHandle};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use templates::{templates, Producer, Template};

const STAGE: &str = "counterparty";

/// Words that make a capture boilerplate rather than a party
const STRUCTURAL_WORDS: &[&str] = &[
    "THE", "YOUR", "MY", "A", "AN", "TO", "FROM", "BY", "ON", "AT", "IN", "FOR", "OF", "WITH",
    "VIA", "UPI", "IMPS", "NEFT", "RTGS", "ACCOUNT", "ACCT", "AC", "REF", "REFERENCE", "TXN",
    "TRANSACTION", "BANK", "CARD", "CREDIT", "DEBIT", "VPA", "MOBILE", "NUMBER", "NO", "AVL",
    "AVAILABLE", "BALANCE", "BAL", "INFO", "DEAR", "CUSTOMER", "SIR", "MADAM", "YOU", "SELF",
    "BENEFICIARY", "LINKED", "WALLET", "RS", "INR",
];

const MONTHS: &[&str] = &[
    "JAN", "JANUARY", "FEB", "FEBRUARY", "MAR", "MARCH", "APR", "APRIL", "MAY", "JUN", "JUNE",
    "JUL", "JULY", "AUG", "AUGUST", "SEP", "SEPT", "SEPTEMBER", "OCT", "OCTOBER", "NOV",
    "NOVEMBER", "DEC", "DECEMBER",
];

/// Legal-entity suffixes, business words and brokerages that rule out a person
const CORPORATE_TOKENS: &[&str] = &[
    "PVT", "PRIVATE", "LTD", "LIMITED", "LLP", "INC", "CORP", "CORPORATION", "CO", "COMPANY",
    "SERVICES", "TECHNOLOGIES", "TECH", "SOLUTIONS", "ENTERPRISES", "INDUSTRIES", "BROKING",
    "SECURITIES", "CAPITAL", "FINANCE", "FINSERV", "INSURANCE", "MUTUAL", "FUND", "BANK",
    "STORE", "STORES", "MART", "RESTAURANT", "CAFE", "HOTEL", "PHARMACY", "MEDICAL", "TRADERS",
    "AGENCIES", "PAYMENTS", "RETAIL", "ONLINE", "INDIA", "ZERODHA", "GROWW", "UPSTOX", "ANGEL",
    "SHAREKHAN", "MOTILAL", "KUVERA",
];

/// Coarse reading of the message before the category cascade runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NatureHint {
    Purchase,
    Transfer,
    Income,
    Other,
}

const PURCHASE_WORDS: &str = r"(?i)\b(?:spent|purchase|purchased|POS)\b";
const TRANSFER_WORDS: &str =
    r"(?i)\b(?:sent|transferred|transfer|UPI|IMPS|NEFT|RTGS|VPA)\b|\bpaid to\b";

fn purchase_words() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PURCHASE_WORDS).expect("invalid purchase words regex"))
}

fn transfer_words() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TRANSFER_WORDS).expect("invalid transfer words regex"))
}

impl NatureHint {
    pub fn infer(body: &str, direction: Direction) -> Self {
        if is_card_purchase(body) {
            return NatureHint::Purchase;
        }
        match direction {
            Direction::Credit => NatureHint::Income,
            Direction::Debit if purchase_words().is_match(body) => NatureHint::Purchase,
            Direction::Debit if transfer_words().is_match(body) => NatureHint::Transfer,
            _ => NatureHint::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NatureHint::Purchase => "PURCHASE",
            NatureHint::Transfer => "TRANSFER",
            NatureHint::Income => "INCOME",
            NatureHint::Other => "OTHER",
        }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Clean a raw capture and check it names a party.
///
/// Trailing digits and punctuation are stripped before the checks run.
pub fn validate_candidate(raw: &str) -> Result<String, &'static str> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned = collapsed
        .trim_end_matches(|c: char| c.is_ascii_digit() || c.is_ascii_punctuation() || c.is_whitespace())
        .trim_start_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_string();

    if cleaned.chars().count() < 3 {
        return Err("shorter than 3 characters");
    }
    if cleaned.chars().all(|c| c.is_ascii_digit() || c.is_whitespace()) {
        return Err("purely numeric");
    }

    let upper = cleaned.to_uppercase();
    if upper.contains("A/C") || upper.contains("ACCOUNT") || upper.contains("ACCT") {
        return Err("account boilerplate");
    }

    let first_word = upper
        .split(|c: char| !c.is_alphanumeric())
        .find(|w| !w.is_empty())
        .unwrap_or_default();
    if STRUCTURAL_WORDS.contains(&first_word) || STRUCTURAL_WORDS.contains(&upper.as_str()) {
        return Err("structural word");
    }
    if MONTHS.contains(&first_word) {
        return Err("date fragment");
    }

    Ok(cleaned)
}

/// 1 to 4 alphabetic words with no corporate or brokerage token
pub fn looks_like_person(name: &str) -> bool {
    let words: Vec<String> = name
        .split_whitespace()
        .map(|w| w.trim_end_matches('.').to_uppercase())
        .collect();
    if words.is_empty() || words.len() > 4 {
        return false;
    }
    if !words
        .iter()
        .all(|w| !w.is_empty() && w.chars().all(|c| c.is_alphabetic()))
    {
        return false;
    }
    !words
        .iter()
        .any(|w| CORPORATE_TOKENS.contains(&w.as_str()) || is_known_brand(w))
}

// ============================================================================
// EXTRACTION
// ============================================================================

pub struct ExtractionInput<'a> {
    pub body: &'a str,
    pub hint: NatureHint,
}

/// A template's answer before it becomes a `Counterparty`
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    name: Option<String>,
    handle: Option<String>,
    kind: CounterpartyKind,
    confidence: f64,
}

fn kind_for_name(name: &str, producer: Producer, hint: NatureHint) -> CounterpartyKind {
    if producer == Producer::Merchant || hint == NatureHint::Purchase {
        return CounterpartyKind::Merchant;
    }
    if looks_like_person(name) {
        CounterpartyKind::Person
    } else {
        CounterpartyKind::Merchant
    }
}

fn from_handle(parsed: ParsedHandle, hint: NatureHint, confidence: f64) -> Resolved {
    let kind = if parsed.curated {
        CounterpartyKind::Merchant
    } else {
        kind_for_name(&parsed.name, Producer::Handle, hint)
    };
    Resolved {
        name: Some(parsed.name),
        handle: Some(parsed.handle),
        kind,
        confidence,
    }
}

impl<'a> CascadeRule<ExtractionInput<'a>, Resolved> for Template {
    fn name(&self) -> &str {
        self.name
    }

    fn apply(&self, input: &ExtractionInput<'a>) -> Option<Hit<Resolved>> {
        for raw in self.candidates(input.body) {
            if self.producer == Producer::Handle || raw.contains('@') {
                let handle_text = raw.split_whitespace().find(|w| w.contains('@')).unwrap_or(raw);
                if let Some(parsed) = parse_handle(handle_text) {
                    let reason = format!(
                        "handle '{}' -> '{}'{}",
                        parsed.handle,
                        parsed.name,
                        if parsed.curated { " (curated)" } else { "" }
                    );
                    return Some(Hit::new(from_handle(parsed, input.hint, self.confidence), reason));
                }
                continue;
            }

            if let Ok(name) = validate_candidate(raw) {
                let kind = kind_for_name(&name, self.producer, input.hint);
                let reason = format!("matched '{}' as {}", name, kind.as_str());
                return Some(Hit::new(
                    Resolved {
                        name: Some(name),
                        handle: None,
                        kind,
                        confidence: self.confidence,
                    },
                    reason,
                ));
            }
        }
        None
    }
}

pub struct CounterpartyExtractor;

impl CounterpartyExtractor {
    pub fn new() -> Self {
        CounterpartyExtractor
    }

    pub fn extract(&self, body: &str, hint: NatureHint) -> Counterparty {
        let mut trace = DecisionTrace::new();
        trace.record(STAGE, format!("nature hint {}", hint.as_str()));

        let input = ExtractionInput { body, hint };
        match run_cascade(templates(), &input, &mut trace) {
            Some(found) => {
                let resolved = found.value;
                Counterparty {
                    name: resolved.name,
                    handle: resolved.handle,
                    kind: resolved.kind,
                    decision_trace: trace.into_entries(),
                    confidence: resolved.confidence,
                }
            }
            None => {
                trace.record(STAGE, "no template produced a valid candidate");
                Counterparty::unknown(trace.into_entries())
            }
        }
    }
}

impl Default for CounterpartyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

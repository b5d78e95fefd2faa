// 💰 Amount & Direction Extraction
//
// Amount: ordered currency-marker patterns, then word-adjacency patterns.
// The first pattern that yields a parseable amount wins.
//
// Direction: debit and credit keyword sets. When both appear, the earliest
// keyword wins: institutions describe the user's own account first
// ("A/c XX12 debited ...; RAJESH credited").

use crate::model::{Direction, ExtractedAmount};
use crate::trace::{DecisionTrace, Traced};
use regex::Regex;
use std::sync::OnceLock;

const STAGE: &str = "amount";

/// (name, pattern) in evaluation order. Group 1 is the number.
const AMOUNT_PATTERNS: &[(&str, &str)] = &[
    (
        "currency-code",
        r"(?i)(?:\bINR|\bRs\.?|₹)\s*\.?\s*([0-9][0-9,]*(?:\.[0-9]{1,2})?)",
    ),
    (
        "currency-code-suffix",
        r"(?i)\b([0-9][0-9,]*(?:\.[0-9]{1,2})?)\s*(?:INR|rupees)\b",
    ),
    (
        "word-adjacency",
        r"(?i)\b(?:debited|credited|spent|paid|sent|received|deposited|withdrawn)\s+(?:by|of|for|with|amount)?\s*([0-9][0-9,]*(?:\.[0-9]{1,2})?)\b",
    ),
];

const DEBIT_KEYWORDS: &str =
    r"(?i)\b(?:debited|debit|spent|paid|sent|withdrawn|withdrawal|deducted|purchase|purchased|transferred|dr)\b";

const CREDIT_KEYWORDS: &str =
    r"(?i)\b(?:credited|credit|received|deposited|refunded|reversed|added)\b";

/// Card network or product word
const CARD_MENTION: &str = r"(?i)\b(?:card|visa|mastercard|master\s+card|rupay|amex|diners)\b";

/// Masked number. Group 1 is set when an account word precedes it, which
/// makes it an account mask rather than a card.
const MASKED_NUMBER: &str =
    r"(?i)(\b(?:a/c|ac|acct|account)(?:\s*(?:no\.?|number))?\s*:?\s*)?[xX*]{2,}\s?[0-9]{4}\b";

/// "at <merchant>": the merchant starts with a letter, so "at 10:22:11" is not one
const AT_MERCHANT: &str = r"(?i)\bat\s+[A-Za-z][A-Za-z0-9&'.*-]";

fn amount_patterns() -> &'static [(&'static str, Regex)] {
    static RE: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    RE.get_or_init(|| {
        AMOUNT_PATTERNS
            .iter()
            .map(|(name, pattern)| (*name, Regex::new(pattern).expect("invalid amount pattern")))
            .collect()
    })
}

fn debit_keywords() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DEBIT_KEYWORDS).expect("invalid debit keyword regex"))
}

fn credit_keywords() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CREDIT_KEYWORDS).expect("invalid credit keyword regex"))
}

fn card_mention() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CARD_MENTION).expect("invalid card mention regex"))
}

fn masked_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(MASKED_NUMBER).expect("invalid masked number regex"))
}

fn at_merchant() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(AT_MERCHANT).expect("invalid at-merchant regex"))
}

/// Parse "1,23,456.5" into minor units (12345650). Rejects overflow.
pub fn parse_minor_units(raw: &str) -> Option<i64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let (whole, fraction) = match cleaned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (cleaned.as_str(), ""),
    };
    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = whole.parse().ok()?;
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };

    whole.checked_mul(100)?.checked_add(fraction)
}

fn mentions_card(body: &str) -> bool {
    card_mention().is_match(body)
        || masked_number()
            .captures_iter(body)
            .any(|caps| caps.get(1).is_none())
}

/// Card mention plus "at <merchant>": always a purchase
pub fn is_card_purchase(body: &str) -> bool {
    at_merchant().is_match(body) && mentions_card(body)
}

/// Blank out "credit card" / "debit card" so the product name is not read
/// as a direction keyword. Byte positions are preserved.
fn mask_card_products(body: &str) -> String {
    let lower = body.to_lowercase();
    if lower.len() != body.len() {
        return body.to_string();
    }
    let mut masked = body.to_string();
    for phrase in ["credit card", "debit card"] {
        let mut start = 0;
        while let Some(pos) = lower[start..].find(phrase) {
            let begin = start + pos;
            let word_len = phrase.find(' ').unwrap_or(phrase.len());
            masked.replace_range(begin..begin + word_len, &"_".repeat(word_len));
            start = begin + phrase.len();
        }
    }
    masked
}

pub struct AmountDirectionExtractor;

impl AmountDirectionExtractor {
    pub fn new() -> Self {
        AmountDirectionExtractor
    }

    pub fn extract(&self, body: &str) -> Traced<ExtractedAmount> {
        let mut trace = DecisionTrace::new();
        let amount_minor = self.extract_amount(body, &mut trace);
        let direction = self.extract_direction(body, &mut trace);
        Traced::new(
            ExtractedAmount {
                amount_minor,
                direction,
            },
            trace,
        )
    }

    fn extract_amount(&self, body: &str, trace: &mut DecisionTrace) -> Option<i64> {
        for (name, pattern) in amount_patterns() {
            let Some(caps) = pattern.captures(body) else {
                continue;
            };
            let Some(raw) = caps.get(1) else {
                continue;
            };
            if let Some(minor) = parse_minor_units(raw.as_str()) {
                trace.record(STAGE, format!("{} matched '{}'", name, raw.as_str()));
                return Some(minor);
            }
        }
        trace.record(STAGE, "no amount pattern matched");
        None
    }

    fn extract_direction(&self, body: &str, trace: &mut DecisionTrace) -> Direction {
        if is_card_purchase(body) {
            trace.record("direction", "card purchase phrasing (card + 'at <merchant>') is a debit");
            return Direction::Debit;
        }

        let masked = mask_card_products(body);
        let debit = debit_keywords().find(&masked);
        let credit = credit_keywords().find(&masked);

        match (debit, credit) {
            (Some(d), None) => {
                trace.record("direction", format!("debit keyword '{}'", d.as_str()));
                Direction::Debit
            }
            (None, Some(c)) => {
                trace.record("direction", format!("credit keyword '{}'", c.as_str()));
                Direction::Credit
            }
            (Some(d), Some(c)) => {
                if d.start() <= c.start() {
                    trace.record(
                        "direction",
                        format!("debit '{}' precedes credit '{}'", d.as_str(), c.as_str()),
                    );
                    Direction::Debit
                } else {
                    trace.record(
                        "direction",
                        format!("credit '{}' precedes debit '{}'", c.as_str(), d.as_str()),
                    );
                    Direction::Credit
                }
            }
            (None, None) => {
                trace.record("direction", "no debit or credit keyword");
                Direction::Unknown
            }
        }
    }
}

impl Default for AmountDirectionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(body: &str) -> ExtractedAmount {
        AmountDirectionExtractor::new().extract(body).value
    }

    #[test]
    fn test_parse_minor_units() {
        assert_eq!(parse_minor_units("450.00"), Some(45000));
        assert_eq!(parse_minor_units("1,23,456.5"), Some(12345650));
        assert_eq!(parse_minor_units("2000"), Some(200000));
        assert_eq!(parse_minor_units("12.345"), None);
        assert_eq!(parse_minor_units(""), None);
        assert_eq!(parse_minor_units("99999999999999999999"), None);
    }

    #[test]
    fn test_card_purchase_amount_and_direction() {
        let e = extract("Spent Rs.450.00 On HDFC Bank Card XX1234 At SWIGGY BANGALORE On 2024-03-12");
        assert_eq!(e.amount_minor, Some(45000));
        assert_eq!(e.direction, Direction::Debit);
    }

    #[test]
    fn test_currency_marker_before_word_adjacency() {
        let e = extract("Your a/c is debited by 300 for order. Avl bal INR 12,000.00");
        assert_eq!(e.amount_minor, Some(1_200_000));
    }

    #[test]
    fn test_word_adjacency_fallback() {
        let e = extract("Your a/c XX99 is debited by 300.50 on 12-03");
        assert_eq!(e.amount_minor, Some(30050));
        assert_eq!(e.direction, Direction::Debit);
    }

    #[test]
    fn test_rupee_symbol_and_suffix() {
        assert_eq!(extract("₹1,250 credited to your wallet").amount_minor, Some(125000));
        assert_eq!(extract("You received 700 INR from Asha").amount_minor, Some(70000));
    }

    #[test]
    fn test_earliest_keyword_wins() {
        let e = extract("Acct XX1234 debited for Rs 500.00; RAJESH KUMAR credited. UPI Ref 1234");
        assert_eq!(e.direction, Direction::Debit);

        let e = extract("Rs 500 credited to A/c XX1234 by a/c linked to VPA x@y (UPI debited from sender)");
        assert_eq!(e.direction, Direction::Credit);
    }

    #[test]
    fn test_credit_card_product_name_is_not_a_credit() {
        let e = extract("Rs 1,200 spent on your ICICI Credit Card XX4321 on 12-Mar");
        assert_eq!(e.direction, Direction::Debit);

        let e = extract("Your Credit Card bill of Rs 5,000 is due on 15-Mar");
        assert_eq!(e.direction, Direction::Unknown);
    }

    #[test]
    fn test_card_at_merchant_overrides_credit_words() {
        let e = extract("Card XX1234 used at AMAZON for Rs 999. Reward points credited");
        assert_eq!(e.direction, Direction::Debit);
    }

    #[test]
    fn test_time_of_day_is_not_a_merchant() {
        let body = "INR 5000.00 credited to A/c no. XX1234 on 12-03-24 at 10:22:11 IST. Info- UPI/P2A/4021/RAJESH KUMAR";
        assert!(!is_card_purchase(body));
        assert_eq!(extract(body).direction, Direction::Credit);
    }

    #[test]
    fn test_account_mask_is_not_a_card() {
        assert!(!is_card_purchase("Rs 200 credited to Acct XX1234 at BRANCH MUMBAI"));
        assert!(!is_card_purchase("Rs 200 credited to A/c no. XX1234 at BRANCH MUMBAI"));
        assert!(is_card_purchase("Rs 200 spent on XX5678 at AMAZON"));
    }

    #[test]
    fn test_no_keywords_is_unknown() {
        let e = extract("Dear customer, your statement for Rs 100 is ready");
        assert_eq!(e.direction, Direction::Unknown);
        assert_eq!(e.amount_minor, Some(10000));
    }

    #[test]
    fn test_no_amount() {
        let e = extract("Your account has been debited");
        assert_eq!(e.amount_minor, None);
    }

    #[test]
    fn test_trace_names_matching_pattern() {
        let traced = AmountDirectionExtractor::new().extract("Rs 10 debited");
        assert!(traced.trace.entries()[0].contains("currency-code"));
    }
}

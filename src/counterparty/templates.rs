// 📐 Counterparty Templates - Ordered, most structural first
//
// Each template is a pattern plus a producer declaring what it yields. The
// extractor walks them in order and the first one whose candidate survives
// validation wins.

use regex::Regex;
use std::sync::OnceLock;

/// What a template's capture represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Producer {
    /// Always a merchant (card purchase wording)
    Merchant,
    /// A name whose kind is decided by the person heuristic
    Inferred,
    /// A payment handle, parsed by `handle::parse_handle`
    Handle,
}

#[derive(Debug)]
pub struct Template {
    pub name: &'static str,
    pub regex: Regex,
    pub producer: Producer,
    pub confidence: f64,
}

/// (name, pattern, producer, confidence) in evaluation order.
/// Name templates capture `name`, handle templates capture `handle`.
const TEMPLATE_TABLE: &[(&str, &str, Producer, f64)] = &[
    (
        "p2p-sent-to",
        r"(?i)\bSent\s+(?:Rs\.?|INR|₹)\s*[0-9][0-9,.]*(?:[^\n]*\n)+?\s*To:?\s+(?P<name>[^\n]+?)\s*\n\s*On\b",
        Producer::Inferred,
        0.9,
    ),
    (
        "neft-credit-record",
        r"(?i)\b(?:NEFT|RTGS|IMPS)\s*Cr-[A-Z0-9]+-(?P<name>[A-Za-z][A-Za-z .&]*?)-[A-Za-z][A-Za-z .&]*?-",
        Producer::Inferred,
        0.9,
    ),
    (
        "card-at-merchant",
        r"(?i)(?:\bcard\b|\b[xX*]{2,}\s?[0-9]{4}\b)[^\n]*?\bat\s+(?P<name>[A-Za-z0-9][A-Za-z0-9 &'._*-]*?)(?:\s+on\s|\s+for\s|\s+via\s|\.\s|\.?$|\.?\s*Avl\b|\s*,|\s*\n)",
        Producer::Merchant,
        0.9,
    ),
    (
        "info-merchant",
        r"(?i)\bInfo:\s*(?P<name>[A-Za-z][A-Za-z0-9 &._-]*?)(?:\*|\.\s|\.?$|\s*\n|\s+Avl\b|\s+-)",
        Producer::Merchant,
        0.9,
    ),
    (
        "paid-to-handle",
        r"(?i)\bpaid to\s+(?P<handle>[A-Za-z0-9._-]+@[A-Za-z][A-Za-z0-9.-]*)",
        Producer::Handle,
        0.6,
    ),
    (
        "sent-to-name",
        r"(?i)\b(?:sent|transferred|paid|transfer)\s+(?:[^\n]{0,40}?\s)?to\s+(?P<name>[A-Za-z][A-Za-z .&'-]*?)(?:\s+(?:via|on|using|through|for|ref|upi|imps|neft|rtgs)\b|\s*[.,;(]|\s*\n|\s*$)",
        Producer::Inferred,
        0.75,
    ),
    (
        "to-vpa",
        r"(?i)\bto\s+(?:VPA\s+)?(?P<handle>[A-Za-z0-9._-]+@[A-Za-z][A-Za-z0-9.-]*)",
        Producer::Handle,
        0.6,
    ),
    (
        "received-from",
        r"(?i)\b(?:received from|credited by|from)\s+(?:VPA\s+)?(?P<name>[A-Za-z][A-Za-z0-9 .&'@_-]*?)(?:\s+(?:via|on|using|through|for|ref|upi|imps|neft|rtgs|is|has|thru)\b|\s*[,;(]|\.\s|\.?$|\s*\n)",
        Producer::Inferred,
        0.75,
    ),
    (
        "on-merchant",
        r"(?i)\bspent\b[^\n]*?\bon\s+(?P<name>[A-Za-z][A-Za-z0-9 &'*_-]*?)\.(?:\s|$)",
        Producer::Merchant,
        0.75,
    ),
    (
        "ist-avl-limit",
        r"(?i)\bIST\s+(?P<name>[A-Za-z0-9][A-Za-z0-9 &'*._-]*?)\s+Avl\s+(?:Limit|Lmt)\b",
        Producer::Merchant,
        0.9,
    ),
    (
        "generic-handle",
        r"(?P<handle>\b[A-Za-z0-9._-]{2,}@[A-Za-z][A-Za-z0-9.-]*)",
        Producer::Handle,
        0.4,
    ),
];

pub fn templates() -> &'static [Template] {
    static TEMPLATES: OnceLock<Vec<Template>> = OnceLock::new();
    TEMPLATES.get_or_init(|| {
        TEMPLATE_TABLE
            .iter()
            .map(|(name, pattern, producer, confidence)| Template {
                name: *name,
                regex: Regex::new(pattern).expect("invalid counterparty template"),
                producer: *producer,
                confidence: *confidence,
            })
            .collect()
    })
}

impl Template {
    /// Every raw candidate this template captures, in order of appearance
    pub fn candidates<'a>(&self, body: &'a str) -> Vec<&'a str> {
        self.regex
            .captures_iter(body)
            .filter_map(|caps| {
                caps.name("name")
                    .or_else(|| caps.name("handle"))
                    .map(|m| m.as_str())
            })
            .collect()
    }
}

// ============================================================================
// TRANSFER RECORDS
// ============================================================================

/// "NEFT Cr-<ref>-<sender>-<receiver>-" with both parties present
const TRANSFER_RECORD: &str =
    r"(?i)\b(?:NEFT|RTGS|IMPS)\s*Cr-[A-Z0-9]+-(?P<sender>[A-Za-z][A-Za-z .&]*?)-(?P<receiver>[A-Za-z][A-Za-z .&]*?)-";

fn transfer_record() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TRANSFER_RECORD).expect("invalid transfer record regex"))
}

/// Sender and receiver names of a structural transfer record
pub fn transfer_record_parties(body: &str) -> Option<(String, String)> {
    let caps = transfer_record().captures(body)?;
    let sender = caps.name("sender")?.as_str().trim().to_string();
    let receiver = caps.name("receiver")?.as_str().trim().to_string();
    Some((sender, receiver))
}

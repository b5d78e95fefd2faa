// 🏦 Sender Classification - Which kind of institution sent this?
//
// Pure lookup over disjoint keyword sets, checked in priority order:
// excluded, bank, virtual card, pension, investment, insurance.
// Excluded goes first so a promotional sender that shares a substring with
// a bank code is never treated as financial. Unmatched senders are excluded.

use crate::model::SenderClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Promotional shortcode prefixes
const EXCLUDED_PREFIXES: &[&str] = &["+91", "140", "1909", "57575", "56161"];

/// Non-financial brands and OTP-only senders
const EXCLUDED_CODES: &[&str] = &[
    "OTP", "PROMO", "OFFERS", "SWIGGY", "ZOMATO", "AMAZON", "AMAZN", "FLPKRT", "FLIPKT", "MYNTRA",
    "JIOINF", "JIOSVC", "AIRTEL", "AIRPRO", "VFCARE", "VIPROM", "OLACAB", "UBERIN", "DOMINO",
    "BIGBSK", "PAYTMM", "PHONPE", "DREAM11", "MEESHO", "NYKAA", "IRCTCI", "REDBUS", "MAKEMY",
];

const BANK_CODES: &[&str] = &[
    "HDFCBK", "HDFCBN", "ICICIB", "ICICIT", "SBIINB", "SBIPSG", "SBMSMS", "CBSSBI", "ATMSBI",
    "AXISBK", "AXISMR", "KOTAKB", "KOTAKM", "IDFCFB", "YESBNK", "YESBK", "INDUSB", "PNBSMS",
    "BOIIND", "BARODA", "BOBTXN", "CANBNK", "UNIONB", "FEDBNK", "AUBANK", "PAYTMB", "AIRBNK",
    "IOBCHN", "CENTBK", "RBLBNK", "IDBIBK", "SCBANK", "HSBCIN", "CITIBK", "DBSBNK", "EQUTAS",
    "UJJIVN", "JANABK", "KVBANK", "SIBSMS", "CUBANK", "TMBANK", "DCBBNK", "BANDHN",
];

const VIRTUAL_CARD_CODES: &[&str] = &[
    "ONECRD", "ONECARD", "SLCEIT", "SLICEIT", "UNICRD", "UNICARD", "JUPITR", "FIBEAI", "KIWIAP",
    "SCAPIA", "POSTPE", "LAZYPY", "SIMPLA",
];

const PENSION_CODES: &[&str] = &["NPSCRA", "NSDLCR", "NPSTRU", "EPFOHO", "EPFIND", "UMANG", "PFRDA", "KFINPN"];

const INVESTMENT_CODES: &[&str] = &[
    "ZERODH", "GROWWS", "GROWW", "UPSTOX", "CAMSMF", "KFINTK", "NSEIND", "NSESMS", "BSELTD",
    "CDSLIN", "CDSLEV", "NSDLDP", "MFCENT", "KUVERA", "COINDC", "ANGELB", "ICICIS", "HDFCSC",
    "MOSLSL", "PAYTMN",
];

const INSURANCE_CODES: &[&str] = &[
    "HDFCLF", "HDFCER", "LICIND", "LICHFL", "ICICIP", "ICICIL", "SBILIF", "SBIGEN", "MAXLIF",
    "TATAAI", "TATAAG", "BAJAJA", "BAJAJG", "POLBAZ", "ACKOIN", "DIGITI", "NIVABU", "STARHL",
    "CAREHL",
];

pub struct SenderClassifier;

impl SenderClassifier {
    pub fn new() -> Self {
        SenderClassifier
    }

    pub fn classify(&self, sender: &str) -> SenderClass {
        let normalized = sender.trim().to_uppercase();
        if normalized.is_empty() || is_excluded(&normalized) {
            return SenderClass::Excluded;
        }

        let ordered: [(&[&str], SenderClass); 5] = [
            (BANK_CODES, SenderClass::Bank),
            (VIRTUAL_CARD_CODES, SenderClass::VirtualCard),
            (PENSION_CODES, SenderClass::Pension),
            (INVESTMENT_CODES, SenderClass::Investment),
            (INSURANCE_CODES, SenderClass::Insurance),
        ];

        for (codes, class) in ordered {
            if codes.iter().any(|code| normalized.contains(code)) {
                return class;
            }
        }

        SenderClass::Excluded
    }
}

impl Default for SenderClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn is_excluded(normalized: &str) -> bool {
    let digits_only = normalized.trim_start_matches('+');
    if !digits_only.is_empty() && digits_only.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    if EXCLUDED_PREFIXES.iter().any(|p| normalized.starts_with(p)) {
        return true;
    }
    let core = institution_code(normalized);
    EXCLUDED_CODES.iter().any(|code| core.contains(code))
}

/// Core header of a sender id: operator prefix and route suffix removed.
///
/// "VM-HDFCBK-S" -> "HDFCBK", "AD-ICICIB" -> "ICICIB", "HDFCBK" -> "HDFCBK"
pub fn institution_code(sender: &str) -> String {
    let upper = sender.trim().to_uppercase();
    let parts: Vec<&str> = upper.split('-').filter(|p| !p.is_empty()).collect();
    let core: &str = match parts.as_slice() {
        [] => "",
        [only] => *only,
        [prefix, rest @ ..] if prefix.len() == 2 => rest
            .iter()
            .copied()
            .find(|p| p.len() > 1)
            .unwrap_or(*prefix),
        [first, ..] => *first,
    };
    core.to_string()
}

// ============================================================================
// SENDER PATTERN REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderStats {
    pub sender: String,
    pub class: SenderClass,
    pub count: usize,
    /// Up to five body samples, 100 characters each
    pub samples: Vec<String>,
}

/// Per-sender message counts with a few samples, most frequent first
pub fn analyze_senders<'a>(messages: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<SenderStats> {
    let classifier = SenderClassifier::new();
    let mut stats: BTreeMap<String, SenderStats> = BTreeMap::new();

    for (sender, body) in messages {
        let entry = stats.entry(sender.to_string()).or_insert_with(|| SenderStats {
            sender: sender.to_string(),
            class: classifier.classify(sender),
            count: 0,
            samples: Vec::new(),
        });
        entry.count += 1;
        if entry.samples.len() < 5 {
            entry.samples.push(body.chars().take(100).collect());
        }
    }

    let mut report: Vec<SenderStats> = stats.into_values().collect();
    report.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.sender.cmp(&b.sender)));
    report
}

/// Markdown table: sender, class, count, samples
pub fn render_sender_report(report: &[SenderStats]) -> String {
    let mut out = String::from("# Sender Pattern Analysis\n\n");
    out.push_str("| Sender | Class | Count | Common Patterns |\n");
    out.push_str("|---|---|---|---|\n");
    for stats in report {
        let samples = stats
            .samples
            .iter()
            .map(|s| s.replace('\n', " ").replace('|', ""))
            .collect::<Vec<_>>()
            .join("<br>");
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            stats.sender,
            stats.class.as_str(),
            stats.count,
            samples
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(sender: &str) -> SenderClass {
        SenderClassifier::new().classify(sender)
    }

    #[test]
    fn test_banks() {
        assert_eq!(classify("VM-HDFCBK"), SenderClass::Bank);
        assert_eq!(classify("ad-icicib-s"), SenderClass::Bank);
        assert_eq!(classify("JD-SBIINB"), SenderClass::Bank);
    }

    #[test]
    fn test_other_financial_classes() {
        assert_eq!(classify("VK-ONECRD"), SenderClass::VirtualCard);
        assert_eq!(classify("BZ-NPSCRA"), SenderClass::Pension);
        assert_eq!(classify("VM-ZERODH"), SenderClass::Investment);
        assert_eq!(classify("TX-LICIND"), SenderClass::Insurance);
    }

    #[test]
    fn test_excluded_checked_first() {
        // Shares "PAYTM" with the payments bank code but is a marketplace
        assert_eq!(classify("VM-PAYTMM"), SenderClass::Excluded);
        assert_eq!(classify("AD-SWIGGY"), SenderClass::Excluded);
    }

    #[test]
    fn test_numeric_and_unknown_senders_excluded() {
        assert_eq!(classify("+919876543210"), SenderClass::Excluded);
        assert_eq!(classify("56161"), SenderClass::Excluded);
        assert_eq!(classify("VM-RANDOM"), SenderClass::Excluded);
        assert_eq!(classify(""), SenderClass::Excluded);
    }

    #[test]
    fn test_institution_code() {
        assert_eq!(institution_code("VM-HDFCBK-S"), "HDFCBK");
        assert_eq!(institution_code("ad-icicib"), "ICICIB");
        assert_eq!(institution_code("HDFCBK"), "HDFCBK");
        assert_eq!(institution_code("VM-HDFCBK-T"), "HDFCBK");
    }

    #[test]
    fn test_analyze_senders_sorted_by_count() {
        let messages = vec![
            ("VM-HDFCBK", "Rs 10 debited"),
            ("VM-ICICIB", "Rs 20 debited"),
            ("VM-HDFCBK", "Rs 30 credited"),
        ];
        let report = analyze_senders(messages);
        assert_eq!(report[0].sender, "VM-HDFCBK");
        assert_eq!(report[0].count, 2);
        assert_eq!(report[0].samples.len(), 2);
        assert_eq!(report[1].class, SenderClass::Bank);

        let md = render_sender_report(&report);
        assert!(md.contains("| VM-HDFCBK | BANK | 2 |"));
    }
}

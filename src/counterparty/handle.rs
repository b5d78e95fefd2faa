// 📮 Payment Handles - "name@provider" to a display name
//
// Well-known prefixes map straight to canonical merchant names. Gateway,
// numeric and junk prefixes carry no identity and are rejected. Anything
// else is humanised: separators become spaces, digits go, title case.

use crate::text::title_case;

/// (handle prefix, canonical merchant)
const CURATED_HANDLES: &[(&str, &str)] = &[
    ("swiggy", "Swiggy"),
    ("swiggystores", "Swiggy"),
    ("swiggyinstamart", "Swiggy Instamart"),
    ("instamart", "Swiggy Instamart"),
    ("zomato", "Zomato"),
    ("zomatoorder", "Zomato"),
    ("blinkit", "Blinkit"),
    ("zepto", "Zepto"),
    ("bigbasket", "BigBasket"),
    ("dunzo", "Dunzo"),
    ("amazon", "Amazon"),
    ("amazonpay", "Amazon"),
    ("amazonupi", "Amazon"),
    ("flipkart", "Flipkart"),
    ("myntra", "Myntra"),
    ("irctc", "IRCTC"),
    ("irctcipay", "IRCTC"),
    ("uber", "Uber"),
    ("uberindia", "Uber"),
    ("olacabs", "Ola"),
    ("ola", "Ola"),
    ("rapido", "Rapido"),
    ("netflix", "Netflix"),
    ("spotify", "Spotify"),
    ("bookmyshow", "BookMyShow"),
    ("airtel", "Airtel"),
    ("airtelpayments", "Airtel"),
    ("jio", "Jio"),
    ("myjio", "Jio"),
    ("zerodha", "Zerodha"),
    ("zerodhabroking", "Zerodha"),
    ("groww", "Groww"),
    ("growwpay", "Groww"),
    ("upstox", "Upstox"),
    ("cred", "CRED"),
    ("credclub", "CRED"),
];

/// Gateway and placeholder prefixes that say nothing about the payee
const NOISE_PREFIXES: &[&str] = &[
    "paytm", "paytmqr", "bharatpe", "razorpay", "rzp", "payu", "cashfree", "billdesk", "ccavenue",
    "juspay", "instamojo", "pinelabs", "ezetap", "mswipe", "vyapar", "gpay", "phonepe", "ybl",
    "bhim", "upi", "pay", "q", "merchant", "pos", "pg", "na", "null", "unknown", "test",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedHandle {
    /// The full handle as written, lowercased
    pub handle: String,
    pub name: String,
    /// Came from the curated table, so it is a known merchant
    pub curated: bool,
}

fn local_part(handle: &str) -> Option<&str> {
    let (local, domain) = handle.trim().split_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(local)
}

/// Split on separators and digit runs: "rajesh.k_99" -> ["rajesh", "k"]
fn words(local: &str) -> Vec<String> {
    local
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub fn curated_name(local: &str) -> Option<&'static str> {
    let lower = local.to_lowercase();
    let compact: String = lower.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let first_word = words(&lower).into_iter().next().unwrap_or_default();

    CURATED_HANDLES
        .iter()
        .find(|(prefix, _)| compact == *prefix || first_word == *prefix)
        .map(|(_, name)| *name)
}

/// A bare word that names a curated brand ("SWIGGY", "Ola")
pub fn is_known_brand(word: &str) -> bool {
    let lower = word.trim().to_lowercase();
    CURATED_HANDLES.iter().any(|(prefix, _)| *prefix == lower)
}

fn is_noise(local: &str) -> bool {
    let lower = local.to_lowercase();
    let letters = lower.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let digits = lower.chars().filter(|c| c.is_ascii_digit()).count();
    if letters == 0 || digits > letters {
        return true;
    }

    let tokens = words(&lower);
    match tokens.first() {
        Some(first) => NOISE_PREFIXES.iter().any(|noise| {
            first == noise || (first.starts_with(noise) && digits > 0 && tokens.len() == 1)
        }),
        None => true,
    }
}

/// Parse a payment handle into a display name, or `None` if it carries no
/// usable identity.
pub fn parse_handle(handle: &str) -> Option<ParsedHandle> {
    let local = local_part(handle)?;
    let normalized = handle.trim().to_lowercase();

    if let Some(name) = curated_name(local) {
        return Some(ParsedHandle {
            handle: normalized,
            name: name.to_string(),
            curated: true,
        });
    }

    if is_noise(local) {
        return None;
    }

    let name = title_case(&words(local).join(" "));
    if name.chars().filter(|c| c.is_alphabetic()).count() < 3 {
        return None;
    }

    Some(ParsedHandle {
        handle: normalized,
        name,
        curated: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curated_prefix_bypasses_humanisation() {
        let parsed = parse_handle("olacabs@ybl").unwrap();
        assert_eq!(parsed.name, "Ola");
        assert!(parsed.curated);

        assert_eq!(parse_handle("swiggy.stores@axb").unwrap().name, "Swiggy");
        assert_eq!(parse_handle("Zomato-Order@paytm").unwrap().name, "Zomato");
    }

    #[test]
    fn test_humanised_handle() {
        let parsed = parse_handle("rajesh.kumar99@okaxis").unwrap();
        assert_eq!(parsed.name, "Rajesh Kumar");
        assert_eq!(parsed.handle, "rajesh.kumar99@okaxis");
        assert!(!parsed.curated);
    }

    #[test]
    fn test_noise_prefixes_rejected() {
        assert_eq!(parse_handle("9876543210@ybl"), None);
        assert_eq!(parse_handle("paytmqr2810050501@paytm"), None);
        assert_eq!(parse_handle("q123456789@ybl"), None);
        assert_eq!(parse_handle("upi@hdfc"), None);
        assert_eq!(parse_handle("no-at-sign"), None);
    }

    #[test]
    fn test_known_brand() {
        assert!(is_known_brand("SWIGGY"));
        assert!(!is_known_brand("RAJESH"));
    }
}

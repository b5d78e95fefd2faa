// 🔤 Text Helpers - Normalisation and fuzzy name comparison
//
// Shared by counterparty validation, self-transfer detection, own-name
// matching, adaptive memory and near-duplicate checks.

use std::collections::BTreeSet;

/// Honorifics and filler that never count as a significant name token
const NAME_STOPWORDS: &[&str] = &[
    "MR", "MRS", "MS", "MISS", "SHRI", "SRI", "SMT", "KUM", "DR", "M/S", "MS.", "THE", "AND",
];

/// Uppercase, keep letters/digits/spaces, collapse whitespace.
///
/// "Godala  Saikumar." -> "GODALA SAIKUMAR"
pub fn normalize_name(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalise a merchant string for memory lookups and duplicate checks.
///
/// Drops store/location codes ("*123", "#456", bare digit runs) and common
/// corporate suffixes.
pub fn normalize_merchant(s: &str) -> String {
    let words: Vec<String> = s
        .split_whitespace()
        .filter_map(|word| {
            let trimmed = word.trim_start_matches(['*', '#']);
            if trimmed.is_empty() || trimmed.chars().all(|c| c.is_ascii_digit()) {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect();

    let mut normalized = normalize_name(&words.join(" "));

    for suffix in [" PVT LTD", " PRIVATE LIMITED", " LIMITED", " LTD", " LLP", " INC", " CORP"] {
        if let Some(stripped) = normalized.strip_suffix(suffix) {
            normalized = stripped.to_string();
        }
    }

    normalized.trim().to_string()
}

/// Tokens of length >= 3 that are not honorifics
pub fn significant_tokens(s: &str) -> BTreeSet<String> {
    normalize_name(s)
        .split(' ')
        .filter(|t| t.len() >= 3 && !NAME_STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

pub fn shared_significant_tokens(a: &str, b: &str) -> usize {
    let left = significant_tokens(a);
    let right = significant_tokens(b);
    left.intersection(&right).count()
}

/// Case-insensitive containment of `needle` as whole words in `haystack`
pub fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    let hay = haystack.to_uppercase();
    let needle = needle.trim().to_uppercase();
    if needle.is_empty() {
        return false;
    }

    let bytes = hay.as_bytes();
    let mut start = 0;
    while let Some(pos) = hay[start..].find(&needle) {
        let begin = start + pos;
        let end = begin + needle.len();
        let before_ok = begin == 0 || !bytes[begin - 1].is_ascii_alphanumeric();
        let after_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return true;
        }
        start = begin + 1;
        while start < hay.len() && !hay.is_char_boundary(start) {
            start += 1;
        }
    }
    false
}

/// Two names refer to the same person: equal after normalisation, or at
/// least two shared significant tokens.
pub fn same_person(a: &str, b: &str) -> bool {
    let left = normalize_name(a);
    let right = normalize_name(b);
    if left.is_empty() || right.is_empty() {
        return false;
    }
    left == right || shared_significant_tokens(&left, &right) >= 2
}

/// Fuzzy match of a counterparty against a holder name of the user's own
/// accounts: whole-word containment either way, two shared significant tokens, or an
/// abbreviated form ("G SAIKUMAR" vs "GODALA SAIKUMAR").
pub fn holder_name_matches(candidate: &str, holder: &str) -> bool {
    let cand = normalize_name(candidate);
    let hold = normalize_name(holder);
    if cand.len() < 3 || hold.len() < 3 {
        return false;
    }

    if contains_whole_word(&hold, &cand) || contains_whole_word(&cand, &hold) {
        return true;
    }

    if shared_significant_tokens(&cand, &hold) >= 2 {
        return true;
    }

    initials_match(&cand, &hold)
}

/// Every token of the shorter name pairs with a distinct token of the longer
/// one (equal, or an initial of it), with at least one full-word match.
fn initials_match(a: &str, b: &str) -> bool {
    let left: Vec<&str> = a.split(' ').collect();
    let right: Vec<&str> = b.split(' ').collect();
    let (short, long) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    if short.len() < 2 {
        return false;
    }

    let mut used = vec![false; long.len()];
    let mut full_matches = 0;

    for token in &short {
        let found = long.iter().enumerate().find(|(i, other)| {
            !used[*i] && (*other == token || is_initial_of(token, other) || is_initial_of(other, token))
        });
        match found {
            Some((i, other)) => {
                used[i] = true;
                if other == token && token.len() > 1 {
                    full_matches += 1;
                }
            }
            None => return false,
        }
    }

    full_matches >= 1
}

fn is_initial_of(initial: &str, word: &str) -> bool {
    initial.len() == 1 && word.len() > 1 && word.starts_with(initial)
}

/// Minimum number of single-character edits turning `a` into `b`
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        current[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            current[j] = (previous[j] + 1) // deletion
                .min(current[j - 1] + 1) // insertion
                .min(previous[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Similarity of two merchant strings in [0, 1] after normalisation.
///
/// 1.0 for equal names, 0.9 when one contains the other, otherwise
/// 1 - edit distance / longer length.
pub fn merchant_similarity(a: &str, b: &str) -> f64 {
    let left = normalize_merchant(a);
    let right = normalize_merchant(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    if left == right {
        return 1.0;
    }
    if left.contains(&right) || right.contains(&left) {
        return 0.9;
    }

    let longest = left.chars().count().max(right.chars().count());
    1.0 - levenshtein_distance(&left, &right) as f64 / longest as f64
}

/// "rajesh kumar" -> "Rajesh Kumar"
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// 🏷️ Categorization Rules - User rules as data
// Read-only snapshot of the user's rules, sorted once by specificity

use crate::model::Counterparty;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;

// ============================================================================
// RULE DEFINITION
// ============================================================================

/// Which counterparty field a rule looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternType {
    /// Payment handle equals the pattern
    HandleExact,
    /// Counterparty name contains the pattern
    NameContains,
    /// Name or handle contains the pattern
    PayeeContains,
}

impl PatternType {
    /// Lower ranks are more specific and are tried first
    fn rank(&self) -> u8 {
        match self {
            PatternType::HandleExact => 0,
            PatternType::NameContains => 1,
            PatternType::PayeeContains => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::HandleExact => "HANDLE_EXACT",
            PatternType::NameContains => "NAME_CONTAINS",
            PatternType::PayeeContains => "PAYEE_CONTAINS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizationRule {
    /// Rule ID for tracking
    pub id: String,

    pub pattern_type: PatternType,

    /// Pattern to match (contains rules support wildcards with *)
    pub pattern: String,

    /// Category assigned on match, resolved through the category table
    pub category_id: i64,

    /// Priority (higher = applied first within a pattern type)
    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub description: Option<String>,
}

impl CategorizationRule {
    pub fn new(id: &str, pattern_type: PatternType, pattern: &str, category_id: i64) -> Self {
        CategorizationRule {
            id: id.to_string(),
            pattern_type,
            pattern: pattern.to_string(),
            category_id,
            priority: 0,
            description: None,
        }
    }

    /// Builder pattern: set priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Check the rule against the field its pattern type declares
    pub fn matches(&self, counterparty: &Counterparty) -> bool {
        match self.pattern_type {
            PatternType::HandleExact => counterparty
                .handle
                .as_deref()
                .map(|h| h.trim().eq_ignore_ascii_case(self.pattern.trim()))
                .unwrap_or(false),
            PatternType::NameContains => counterparty
                .name
                .as_deref()
                .map(|name| wildcard_contains(&self.pattern, name))
                .unwrap_or(false),
            PatternType::PayeeContains => [counterparty.name.as_deref(), counterparty.handle.as_deref()]
                .into_iter()
                .flatten()
                .any(|field| wildcard_contains(&self.pattern, field)),
        }
    }

    fn specificity_order(&self, other: &Self) -> Ordering {
        self.pattern_type
            .rank()
            .cmp(&other.pattern_type.rank())
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| other.pattern.len().cmp(&self.pattern.len()))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Case-insensitive containment. With `*`, the pieces must appear in order.
fn wildcard_contains(pattern: &str, text: &str) -> bool {
    let pattern_lower = pattern.trim().to_lowercase();
    let text_lower = text.to_lowercase();
    if pattern_lower.is_empty() {
        return false;
    }

    if !pattern_lower.contains('*') {
        return text_lower.contains(&pattern_lower);
    }

    let mut current_pos = 0;
    for part in pattern_lower.split('*').filter(|p| !p.is_empty()) {
        match text_lower[current_pos..].find(part) {
            Some(pos) => current_pos += pos + part.len(),
            None => return false,
        }
    }
    true
}

// ============================================================================
// RULE SET
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct UserRuleSet {
    rules: Vec<CategorizationRule>,
}

impl UserRuleSet {
    /// Create a new empty rule set
    pub fn new() -> Self {
        UserRuleSet { rules: Vec::new() }
    }

    /// Load rules from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let rules: Vec<CategorizationRule> =
            serde_json::from_str(&content).context("Failed to parse rules JSON")?;

        Ok(UserRuleSet::from_rules(rules))
    }

    /// Create a rule set from a list of rules, most specific first
    pub fn from_rules(mut rules: Vec<CategorizationRule>) -> Self {
        rules.sort_by(|a, b| a.specificity_order(b));
        UserRuleSet { rules }
    }

    /// Add a single rule
    pub fn add_rule(&mut self, rule: CategorizationRule) {
        self.rules.push(rule);
        self.rules.sort_by(|a, b| a.specificity_order(b));
    }

    /// First rule (in specificity order) matching the counterparty
    pub fn find_match(&self, counterparty: &Counterparty) -> Option<&CategorizationRule> {
        self.rules.iter().find(|rule| rule.matches(counterparty))
    }

    pub fn rules(&self) -> &[CategorizationRule] {
        &self.rules
    }

    /// Get number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CounterpartyKind;
    use std::io::Write;

    fn counterparty(name: Option<&str>, handle: Option<&str>) -> Counterparty {
        Counterparty {
            name: name.map(str::to_string),
            handle: handle.map(str::to_string),
            kind: CounterpartyKind::Merchant,
            decision_trace: vec![],
            confidence: 0.9,
        }
    }

    #[test]
    fn test_handle_exact_match() {
        let rule = CategorizationRule::new("r1", PatternType::HandleExact, "Rajesh.K@okaxis", 7);
        assert!(rule.matches(&counterparty(None, Some("rajesh.k@okaxis"))));
        assert!(!rule.matches(&counterparty(None, Some("rajesh.k@okaxis.x"))));
        assert!(!rule.matches(&counterparty(Some("rajesh.k@okaxis"), None)));
    }

    #[test]
    fn test_wildcard_pattern() {
        let rule = CategorizationRule::new("r2", PatternType::NameContains, "SWIGGY*BANGALORE", 3);
        assert!(rule.matches(&counterparty(Some("swiggy store bangalore"), None)));
        assert!(!rule.matches(&counterparty(Some("bangalore swiggy"), None)));
    }

    #[test]
    fn test_payee_contains_checks_handle_too() {
        let rule = CategorizationRule::new("r3", PatternType::PayeeContains, "netflix", 4);
        assert!(rule.matches(&counterparty(None, Some("netflix@ybl"))));
        assert!(rule.matches(&counterparty(Some("NETFLIX INDIA"), None)));
        assert!(!rule.matches(&counterparty(None, None)));
    }

    #[test]
    fn test_handle_exact_outranks_name_contains() {
        let set = UserRuleSet::from_rules(vec![
            CategorizationRule::new("name", PatternType::NameContains, "RAJESH", 1).with_priority(100),
            CategorizationRule::new("handle", PatternType::HandleExact, "rajesh@okaxis", 2),
        ]);
        let cp = counterparty(Some("RAJESH KUMAR"), Some("rajesh@okaxis"));
        assert_eq!(set.find_match(&cp).map(|r| r.id.as_str()), Some("handle"));
    }

    #[test]
    fn test_priority_then_length_within_kind() {
        let mut set = UserRuleSet::new();
        set.add_rule(CategorizationRule::new("short", PatternType::NameContains, "AMAZON", 1));
        set.add_rule(CategorizationRule::new("long", PatternType::NameContains, "AMAZON PRIME", 2));
        let cp = counterparty(Some("AMAZON PRIME VIDEO"), None);
        assert_eq!(set.find_match(&cp).map(|r| r.id.as_str()), Some("long"));

        set.add_rule(CategorizationRule::new("boosted", PatternType::NameContains, "AMAZON", 3).with_priority(5));
        assert_eq!(set.find_match(&cp).map(|r| r.id.as_str()), Some("boosted"));
        assert_eq!(set.rule_count(), 3);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "r1", "pattern_type": "NAME_CONTAINS", "pattern": "ZOMATO", "category_id": 2}}]"#
        )
        .unwrap();

        let set = UserRuleSet::from_file(file.path()).unwrap();
        assert_eq!(set.rule_count(), 1);
        assert_eq!(set.rules()[0].priority, 0);
    }

    #[test]
    fn test_from_file_missing_path_has_context() {
        let err = UserRuleSet::from_file("/nonexistent/rules.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read rules file"));
    }
}

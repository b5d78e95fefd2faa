// 🗃️ Classification Context - Read-only collaborator snapshot
//
// Rules, categories, known accounts, salary sources, merchant memory and the
// optional statistical classifier are bulk-loaded once at the start of a
// batch and shared immutably by every classification. Reloading means
// building a new context.

use crate::categorizer::memory::MerchantMemory;
use crate::categorizer::merchant_table::MerchantTable;
use crate::config::PipelineConfig;
use crate::error::LedgerError;
use crate::naive_bayes::{NaiveBayesClassifier, StatisticalClassifier};
use crate::rules::{CategorizationRule, UserRuleSet};
use crate::text::{normalize_name, same_person};
use anyhow::{Context as AnyhowContext, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

// ============================================================================
// COLLABORATOR TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    Bank,
    CreditCard,
}

/// An account the user is known to hold, discovered from earlier messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownAccount {
    pub last4: String,
    pub kind: AccountKind,
    #[serde(default)]
    pub holder_name: Option<String>,
}

impl KnownAccount {
    pub fn new(last4: &str, kind: AccountKind) -> Self {
        KnownAccount {
            last4: last4.to_string(),
            kind,
            holder_name: None,
        }
    }

    pub fn with_holder(mut self, holder_name: &str) -> Self {
        self.holder_name = Some(holder_name.to_string());
        self
    }
}

/// A credit source previously flagged as recurring salary
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SalarySource {
    pub institution_code: String,
    pub sender_name: String,
}

impl SalarySource {
    pub fn new(institution_code: &str, sender_name: &str) -> Self {
        SalarySource {
            institution_code: institution_code.trim().to_uppercase(),
            sender_name: normalize_name(sender_name),
        }
    }

    pub fn matches(&self, institution_code: &str, counterparty_name: &str) -> bool {
        if !self.institution_code.eq_ignore_ascii_case(institution_code.trim()) {
            return false;
        }
        let name = normalize_name(counterparty_name);
        let pattern = normalize_name(&self.sender_name);
        !name.is_empty() && (name.contains(&pattern) || same_person(&name, &pattern))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemanticType {
    Expense,
    Income,
    Transfer,
    LiabilityPayment,
    Investment,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub semantic_type: SemanticType,
}

/// Category name that always means "paying down a liability"
pub const CREDIT_BILL_PAYMENTS: &str = "Credit Bill Payments";

// ============================================================================
// CONTEXT
// ============================================================================

#[derive(Clone)]
pub struct ClassificationContext {
    pub rules: UserRuleSet,
    pub categories: BTreeMap<i64, Category>,
    pub known_accounts: Vec<KnownAccount>,
    pub salary_sources: Vec<SalarySource>,
    pub salary_company_names: Vec<String>,
    pub merchant_memory: MerchantMemory,
    pub merchant_table: Arc<MerchantTable>,
    pub statistical: Option<Arc<dyn StatisticalClassifier>>,
    pub config: PipelineConfig,
}

fn bundled_table() -> Arc<MerchantTable> {
    static TABLE: OnceLock<Arc<MerchantTable>> = OnceLock::new();
    TABLE
        .get_or_init(|| Arc::new(MerchantTable::bundled().expect("invalid bundled merchant table")))
        .clone()
}

impl ClassificationContext {
    /// Empty collaborators, bundled merchant table, default config
    pub fn new() -> Self {
        ClassificationContext {
            rules: UserRuleSet::new(),
            categories: BTreeMap::new(),
            known_accounts: Vec::new(),
            salary_sources: Vec::new(),
            salary_company_names: Vec::new(),
            merchant_memory: MerchantMemory::new(),
            merchant_table: bundled_table(),
            statistical: None,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_rules(mut self, rules: UserRuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories = categories.into_iter().map(|c| (c.id, c)).collect();
        self
    }

    pub fn with_known_accounts(mut self, accounts: Vec<KnownAccount>) -> Self {
        self.known_accounts = accounts;
        self
    }

    pub fn with_salary_sources(mut self, sources: Vec<SalarySource>) -> Self {
        self.salary_sources = sources;
        self
    }

    pub fn with_salary_company_names(mut self, names: Vec<String>) -> Self {
        self.salary_company_names = names;
        self
    }

    pub fn with_merchant_memory(mut self, memory: MerchantMemory) -> Self {
        self.merchant_memory = memory;
        self
    }

    pub fn with_merchant_table(mut self, table: MerchantTable) -> Self {
        self.merchant_table = Arc::new(table);
        self
    }

    pub fn with_statistical(mut self, classifier: Arc<dyn StatisticalClassifier>) -> Self {
        self.statistical = Some(classifier);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn category_name(&self, id: i64) -> crate::error::Result<&str> {
        self.categories
            .get(&id)
            .map(|c| c.name.as_str())
            .ok_or(LedgerError::UnknownCategory(id))
    }

    /// Tagged as a liability payment in the category table, or the built-in
    /// bill payment category
    pub fn is_liability_category(&self, name: &str) -> bool {
        name == CREDIT_BILL_PAYMENTS
            || self
                .categories
                .values()
                .any(|c| c.name == name && c.semantic_type == SemanticType::LiabilityPayment)
    }

    /// Holder names of the user's own accounts
    pub fn holder_names(&self) -> impl Iterator<Item = &str> {
        self.known_accounts
            .iter()
            .filter_map(|a| a.holder_name.as_deref())
    }

    /// Build from a snapshot. Relative model/table paths resolve against
    /// `base_dir`.
    pub fn from_snapshot(snapshot: ContextSnapshot, base_dir: &Path) -> Result<Self> {
        let mut context = ClassificationContext::new()
            .with_rules(UserRuleSet::from_rules(snapshot.rules))
            .with_categories(snapshot.categories)
            .with_known_accounts(snapshot.known_accounts)
            .with_salary_sources(snapshot.salary_sources)
            .with_salary_company_names(snapshot.salary_company_names)
            .with_merchant_memory(MerchantMemory::from_pairs(snapshot.merchant_memory))
            .with_config(snapshot.config);

        if let Some(path) = snapshot.merchant_table {
            context = context.with_merchant_table(MerchantTable::from_file(base_dir.join(path))?);
        }
        if let Some(path) = snapshot.naive_bayes_model {
            let classifier = NaiveBayesClassifier::from_file(base_dir.join(path))?;
            context = context.with_statistical(Arc::new(classifier));
        }

        Ok(context)
    }

    /// Load a JSON context snapshot
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read context snapshot: {:?}", path))?;
        let snapshot: ContextSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse context snapshot: {:?}", path))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_snapshot(snapshot, base_dir)
    }
}

impl Default for ClassificationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClassificationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassificationContext")
            .field("rules", &self.rules.rule_count())
            .field("categories", &self.categories.len())
            .field("known_accounts", &self.known_accounts.len())
            .field("salary_sources", &self.salary_sources.len())
            .field("merchant_memory", &self.merchant_memory.len())
            .field("merchant_table_version", &self.merchant_table.version)
            .field("statistical", &self.statistical.is_some())
            .finish()
    }
}

/// On-disk form of the collaborator snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSnapshot {
    pub rules: Vec<CategorizationRule>,
    pub categories: Vec<Category>,
    pub known_accounts: Vec<KnownAccount>,
    pub salary_sources: Vec<SalarySource>,
    pub salary_company_names: Vec<String>,
    /// merchant -> category
    pub merchant_memory: BTreeMap<String, String>,
    pub naive_bayes_model: Option<PathBuf>,
    pub merchant_table: Option<PathBuf>,
    pub config: PipelineConfig,
}

// ============================================================================
// ACCOUNT SUFFIXES
// ============================================================================

/// The user's own account: "A/c XX1234", "Card ending 5678", "a/c *4321"
const OWN_ACCOUNT: &str = r"(?i)\b(?:a/c|acct|account|card|ac)\s*(?:no\.?\s*)?(?:ending\s+(?:with\s+|in\s+)?)?[xX*]*\s?([0-9]{3,4})\b|\b[xX*]{2,}\s?([0-9]{4})\b";

/// Where money went: "towards your credit card XX5678", "to A/c ending 4321"
const TARGET_ACCOUNT: &str = r"(?i)\b(?:to|towards)\s+(?:your\s+)?(?:[A-Za-z]+\s+){0,3}?(?:card|a/c|acct|account|ac)\s*(?:no\.?\s*)?(?:ending\s+(?:with\s+|in\s+)?)?[xX*]*\s?([0-9]{4})\b";

fn own_account() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(OWN_ACCOUNT).expect("invalid own account regex"))
}

fn target_account() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TARGET_ACCOUNT).expect("invalid target account regex"))
}

/// Last digits of the first masked account mentioned
pub fn account_suffix(body: &str) -> Option<String> {
    let caps = own_account().captures(body)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Last four digits of the account the money was sent to
pub fn target_account_suffix(body: &str) -> Option<String> {
    target_account()
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

// 📊 Statistical Fallback - Pluggable classifier contract + Naive Bayes
//
// The category cascade only needs `classify(text) -> (category, confidence)`.
// The bundled implementation scores a multinomial Naive Bayes model exported
// as JSON by an offline trainer (training is not part of this crate).

use crate::error::{LedgerError, Result as LedgerResult};
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub category: String,
    /// Normalised posterior of the winning class, 0.0 - 1.0
    pub confidence: f64,
}

/// External collaborator contract for the statistical stage
pub trait StatisticalClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Option<Prediction>;
}

// ============================================================================
// MODEL
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub vocab_size: Option<usize>,
    #[serde(default)]
    pub doc_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayesModel {
    #[serde(default)]
    pub metadata: ModelMetadata,
    /// category -> log P(category)
    pub priors: BTreeMap<String, f64>,
    /// category -> token -> log P(token | category)
    pub likelihoods: BTreeMap<String, BTreeMap<String, f64>>,
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z0-9]+").expect("invalid token regex"))
}

/// Lowercase alphanumeric runs
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    token_regex()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub struct NaiveBayesClassifier {
    model: NaiveBayesModel,
}

impl NaiveBayesClassifier {
    pub fn new(model: NaiveBayesModel) -> LedgerResult<Self> {
        if model.priors.is_empty() {
            return Err(LedgerError::Model("model has no classes".to_string()));
        }
        if let Some(missing) = model.priors.keys().find(|c| !model.likelihoods.contains_key(*c)) {
            return Err(LedgerError::Model(format!(
                "class '{}' has a prior but no likelihoods",
                missing
            )));
        }
        Ok(NaiveBayesClassifier { model })
    }

    pub fn from_json(content: &str) -> LedgerResult<Self> {
        let model: NaiveBayesModel = serde_json::from_str(content)?;
        Self::new(model)
    }

    /// Load an exported model
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read model file: {:?}", path.as_ref()))?;
        Self::from_json(&content).with_context(|| format!("Invalid model file: {:?}", path.as_ref()))
    }

    pub fn class_count(&self) -> usize {
        self.model.priors.len()
    }

    fn in_vocabulary(&self, token: &str) -> bool {
        self.model.likelihoods.values().any(|table| table.contains_key(token))
    }
}

impl StatisticalClassifier for NaiveBayesClassifier {
    fn classify(&self, text: &str) -> Option<Prediction> {
        let tokens: Vec<String> = tokenize(text)
            .into_iter()
            .filter(|t| self.in_vocabulary(t))
            .collect();
        if tokens.is_empty() {
            return None;
        }

        let scores: Vec<(&String, f64)> = self
            .model
            .priors
            .iter()
            .map(|(category, prior)| {
                let table = &self.model.likelihoods[category];
                let score = tokens
                    .iter()
                    .filter_map(|t| table.get(t))
                    .fold(*prior, |acc, log_p| acc + log_p);
                (category, score)
            })
            .collect();

        // BTreeMap order makes the first maximum deterministic
        let (best_category, best_score) = scores
            .iter()
            .fold(None::<(&String, f64)>, |best, (c, s)| match best {
                Some((_, bs)) if bs >= *s => best,
                _ => Some((*c, *s)),
            })?;

        // Softmax over log scores, shifted by the maximum for stability
        let total: f64 = scores.iter().map(|(_, s)| (s - best_score).exp()).sum();
        if !total.is_finite() || total <= 0.0 {
            return None;
        }

        Some(Prediction {
            category: best_category.clone(),
            confidence: 1.0 / total,
        })
    }
}

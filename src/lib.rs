// SMS Ledger - Core Library
// Bank notification messages in, categorized ledger transactions out

pub mod model;
pub mod trace;
pub mod cascade;
pub mod text;
pub mod error;
pub mod config;
pub mod amount;          // Amount + direction extraction
pub mod sender;          // Sender classes and pattern report
pub mod phrases;         // Shared institutional phrase detectors
pub mod counterparty;    // Template-based counterparty extraction
pub mod rules;           // User categorization rules
pub mod naive_bayes;     // Statistical fallback classifier
pub mod context;         // Read-only collaborator snapshot
pub mod categorizer;     // 14-stage category cascade
pub mod nature;          // Transaction nature + invariants
pub mod deduplication;   // Hash + fuzzy duplicate detection
pub mod pairing;         // Self-transfer and card settlement links
pub mod salary;          // Recurring salary-source tracking
pub mod pipeline;        // classify() and the batch scanner
pub mod decision_log;    // JSONL decision log + audit
pub mod input;           // JSONL / CSV message loading

// Re-export commonly used types
pub use model::{
    RawMessage, Direction, ExtractedAmount, SenderClass,
    Counterparty, CounterpartyKind, TransactionNature, CategoryStage,
    Invariant, InvariantCorrection, ClassificationResult,
    DropReason, Outcome, ClassifiedTransaction,
};
pub use error::{LedgerError, Result};
pub use config::PipelineConfig;
pub use amount::AmountDirectionExtractor;
pub use sender::{SenderClassifier, SenderStats, analyze_senders, render_sender_report};
pub use counterparty::{CounterpartyExtractor, NatureHint};
pub use rules::{CategorizationRule, PatternType, UserRuleSet};
pub use naive_bayes::{NaiveBayesClassifier, Prediction, StatisticalClassifier};
pub use context::{
    AccountKind, Category, ClassificationContext, ContextSnapshot,
    KnownAccount, SalarySource, SemanticType,
};
pub use categorizer::{CategoryDecision, CategoryMapper};
pub use nature::TransactionNatureResolver;
pub use deduplication::{
    DuplicateDetector, DuplicateKey, DuplicateMatch, MatchStrategy, compute_duplicate_key,
};
pub use pairing::{LinkKind, PairingLink, TransactionPairer};
pub use salary::SalaryTracker;
pub use pipeline::{BatchScanner, ScanReport, classify};
pub use decision_log::{AuditReport, DecisionRecord, audit_log, write_log};
pub use input::load_messages;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

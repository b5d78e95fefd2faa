// 📒 Decision Log - One JSON line per accepted transaction
//
// The log is the external audit surface: raw input, parsed fields, the final
// decision and the full decision trace. The auditor reads it back and flags
// records that need a human look.

use crate::categorizer::{UNCATEGORIZED, UNVERIFIED_INCOME};
use crate::error::Result;
use crate::model::{ClassificationResult, ClassifiedTransaction, CounterpartyKind, Direction, TransactionNature};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

// ============================================================================
// RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInput {
    pub sender: String,
    pub full_message_text: String,
    /// Minor units
    pub amount: i64,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFields {
    pub merchant_name: Option<String>,
    pub handle: Option<String>,
    pub counterparty_kind: CounterpartyKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalDecision {
    pub transaction_type: TransactionNature,
    pub category_name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    pub transaction_id: String,
    pub raw_input: RawInput,
    pub parsed_fields: ParsedFields,
    pub final_decision: FinalDecision,
    pub decision_trace: Vec<String>,
}

impl DecisionRecord {
    pub fn from_transaction(tx: &ClassifiedTransaction) -> Self {
        let result = &tx.result;
        DecisionRecord {
            transaction_id: tx.id.clone(),
            raw_input: RawInput {
                sender: tx.sender.clone(),
                full_message_text: tx.body.clone(),
                amount: result.amount_minor,
                direction: result.direction,
                timestamp: tx.timestamp,
            },
            parsed_fields: ParsedFields {
                merchant_name: result.counterparty.name.clone(),
                handle: result.counterparty.handle.clone(),
                counterparty_kind: result.counterparty.kind,
            },
            final_decision: FinalDecision {
                transaction_type: result.nature,
                category_name: result.category.clone(),
                confidence: decision_confidence(result),
            },
            decision_trace: result.decision_trace.clone(),
        }
    }
}

/// Coarse confidence of the category decision, by how it was reached
pub fn decision_confidence(result: &ClassificationResult) -> f64 {
    if result.unresolved {
        0.3
    } else if result.category_stage.is_fallback() {
        0.6
    } else if result.was_corrected() {
        0.8
    } else {
        0.95
    }
}

// ============================================================================
// WRITING / READING
// ============================================================================

/// Appends JSON lines to any writer
pub struct DecisionLogWriter<W: Write> {
    out: W,
    written: usize,
}

impl<W: Write> DecisionLogWriter<W> {
    pub fn new(out: W) -> Self {
        DecisionLogWriter { out, written: 0 }
    }

    pub fn append(&mut self, record: &DecisionRecord) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Write a whole batch to a new file
pub fn write_log<P: AsRef<Path>>(path: P, transactions: &[ClassifiedTransaction]) -> anyhow::Result<usize> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create decision log: {:?}", path))?;

    let mut writer = DecisionLogWriter::new(BufWriter::new(file));
    for tx in transactions {
        writer
            .append(&DecisionRecord::from_transaction(tx))
            .with_context(|| format!("Failed to write decision log: {:?}", path))?;
    }
    let written = writer.written();
    writer
        .finish()
        .with_context(|| format!("Failed to flush decision log: {:?}", path))?;
    Ok(written)
}

/// One line of a log as read back: a record, or the reason it would not parse
pub type LogLine = std::result::Result<DecisionRecord, String>;

pub fn parse_log(content: &str) -> Vec<(usize, LogLine)> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let parsed = serde_json::from_str::<DecisionRecord>(line).map_err(|e| e.to_string());
            (i + 1, parsed)
        })
        .collect()
}

pub fn read_log<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<(usize, LogLine)>> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read decision log: {:?}", path))?;
    Ok(parse_log(&content))
}

// ============================================================================
// AUDIT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    InvalidJson,
    MissingCounterparty,
    EmptyCounterparty,
    AmbiguousCounterparty,
    UnknownNature,
    UnresolvedCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditIssue {
    /// 1-based line in the log
    pub line: usize,
    pub kind: IssueKind,
    pub detail: String,
}

impl fmt::Display for AuditIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line, self.detail)
    }
}

/// Flag one record. A record may carry several issues.
pub fn audit_record(line: usize, record: &DecisionRecord) -> Vec<AuditIssue> {
    let mut issues = Vec::new();
    let mut flag = |kind: IssueKind, detail: String| issues.push(AuditIssue { line, kind, detail });

    match record.parsed_fields.merchant_name.as_deref() {
        None if record.parsed_fields.handle.is_none() => {
            flag(IssueKind::MissingCounterparty, "Missing counterparty".to_string());
        }
        None => {}
        Some(name) if name.trim().is_empty() => {
            flag(IssueKind::EmptyCounterparty, "Empty counterparty".to_string());
        }
        Some(name) if name.contains("...") || name.contains('\n') => {
            flag(
                IssueKind::AmbiguousCounterparty,
                format!("Ambiguous counterparty: {}", name.replace('\n', "\\n")),
            );
        }
        Some(_) => {}
    }

    if record.final_decision.transaction_type == TransactionNature::Unknown {
        flag(IssueKind::UnknownNature, "Unknown transaction type".to_string());
    }

    let category = record.final_decision.category_name.as_str();
    if category == UNCATEGORIZED || category == UNVERIFIED_INCOME {
        flag(
            IssueKind::UnresolvedCategory,
            format!("Unresolved category: {}", category),
        );
    }

    issues
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub lines_scanned: usize,
    pub issues: Vec<AuditIssue>,
}

impl AuditReport {
    /// At most `limit` issues are listed
    pub fn render(&self, limit: usize) -> String {
        let mut out = format!(
            "Total lines scanned: {}\nTotal issues found: {}\n",
            self.lines_scanned,
            self.issues.len()
        );
        for issue in self.issues.iter().take(limit) {
            out.push_str(&format!("{}\n", issue));
        }
        if self.issues.len() > limit {
            out.push_str(&format!("... and {} more issues\n", self.issues.len() - limit));
        }
        out
    }
}

pub fn audit_lines(lines: &[(usize, LogLine)]) -> AuditReport {
    let mut report = AuditReport {
        lines_scanned: lines.len(),
        issues: Vec::new(),
    };
    for (line, parsed) in lines {
        match parsed {
            Ok(record) => report.issues.extend(audit_record(*line, record)),
            Err(e) => report.issues.push(AuditIssue {
                line: *line,
                kind: IssueKind::InvalidJson,
                detail: format!("Invalid JSON ({})", e),
            }),
        }
    }
    report
}

pub fn audit_log<P: AsRef<Path>>(path: P) -> anyhow::Result<AuditReport> {
    Ok(audit_lines(&read_log(path)?))
}

// ⚠️ Error Types - Everything that can fail outside a single classification
//
// Classifying one message never fails (it yields an Outcome). Errors only
// come from loading collaborator data: snapshots, rule files, models, tables.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid merchant table: {0}")]
    MerchantTable(String),

    #[error("Invalid classifier model: {0}")]
    Model(String),

    #[error("Unknown category id: {0}")]
    UnknownCategory(i64),

    #[error("Invalid message record: {0}")]
    InvalidMessage(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

// 📥 Message Input - Raw notifications from JSONL or CSV exports
//
// Both formats carry sender, body and timestamp. Timestamps may be RFC 3339
// text or epoch milliseconds, the two shapes message exports use.

use crate::deduplication::DuplicateKey;
use crate::error::{LedgerError, Result};
use crate::model::RawMessage;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTimestamp {
    Millis(i64),
    Text(String),
}

#[derive(Deserialize)]
struct JsonRecord {
    sender: String,
    body: String,
    timestamp: JsonTimestamp,
}

#[derive(Deserialize)]
struct CsvRecord {
    sender: String,
    body: String,
    timestamp: String,
}

/// RFC 3339 text, or a run of digits read as epoch milliseconds
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        let millis: i64 = raw
            .parse()
            .map_err(|_| LedgerError::InvalidMessage(format!("timestamp out of range: {}", raw)))?;
        return from_millis(millis);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LedgerError::InvalidMessage(format!("bad timestamp '{}': {}", raw, e)))
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| LedgerError::InvalidMessage(format!("timestamp out of range: {}", millis)))
}

/// One JSON object per line; blank lines are skipped
pub fn parse_jsonl(content: &str) -> Result<Vec<RawMessage>> {
    let mut messages = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: JsonRecord = serde_json::from_str(line)?;
        let timestamp = match record.timestamp {
            JsonTimestamp::Millis(ms) => from_millis(ms),
            JsonTimestamp::Text(text) => parse_timestamp(&text),
        }
        .map_err(|e| LedgerError::InvalidMessage(format!("line {}: {}", i + 1, e)))?;
        messages.push(RawMessage::new(record.sender, record.body, timestamp));
    }
    Ok(messages)
}

/// Header row `sender,body,timestamp`
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RawMessage>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut messages = Vec::new();
    for record in csv_reader.deserialize() {
        let record: CsvRecord = record?;
        let timestamp = parse_timestamp(&record.timestamp)?;
        messages.push(RawMessage::new(record.sender, record.body, timestamp));
    }
    Ok(messages)
}

/// Load messages, choosing the format by extension (`.csv`, else JSONL)
pub fn load_messages<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<RawMessage>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let messages = if is_csv {
        let file = fs::File::open(path).with_context(|| format!("Failed to open messages file: {:?}", path))?;
        read_csv(file).with_context(|| format!("Failed to parse CSV messages: {:?}", path))?
    } else {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read messages file: {:?}", path))?;
        parse_jsonl(&content).with_context(|| format!("Failed to parse JSONL messages: {:?}", path))?
    };
    Ok(messages)
}

/// Hashes already persisted, one hex key per line
pub fn load_known_hashes<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<DuplicateKey>> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read known hashes: {:?}", path))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| DuplicateKey::from(l.to_lowercase()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-12T09:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-12T14:30:00+05:30").unwrap(), expected);
        assert_eq!(parse_timestamp("1710234000000").unwrap(), expected);
        assert!(parse_timestamp("12/03/2024").is_err());
    }

    #[test]
    fn test_jsonl_with_mixed_timestamps() {
        let content = r#"{"sender":"VM-HDFCBK","body":"Rs 10 debited","timestamp":1710234000000}

{"sender":"AD-ICICIB","body":"Rs 20 credited","timestamp":"2024-03-12T09:05:00Z"}
"#;
        let messages = parse_jsonl(content).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, "VM-HDFCBK");
        assert_eq!(messages[1].body, "Rs 20 credited");
        assert!(messages[0].timestamp < messages[1].timestamp);
    }

    #[test]
    fn test_jsonl_bad_timestamp_names_line() {
        let content = r#"{"sender":"VM-HDFCBK","body":"x","timestamp":"yesterday"}"#;
        let err = parse_jsonl(content).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_csv_with_quoted_commas() {
        let data = "sender,body,timestamp\nVM-HDFCBK,\"Rs 1,250.00 debited, thanks\",2024-03-12T09:00:00Z\n";
        let messages = read_csv(data.as_bytes()).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "Rs 1,250.00 debited, thanks");
    }

    #[test]
    fn test_load_messages_by_extension() {
        let mut csv_file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(csv_file, "sender,body,timestamp").unwrap();
        writeln!(csv_file, "VM-HDFCBK,Rs 10 debited,1710234000000").unwrap();
        assert_eq!(load_messages(csv_file.path()).unwrap().len(), 1);

        let mut jsonl_file = NamedTempFile::new().unwrap();
        writeln!(
            jsonl_file,
            r#"{{"sender":"VM-HDFCBK","body":"Rs 10 debited","timestamp":1710234000000}}"#
        )
        .unwrap();
        assert_eq!(load_messages(jsonl_file.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file_error_names_path() {
        let err = load_messages("/nonexistent/messages.jsonl").unwrap_err();
        assert!(format!("{:#}", err).contains("messages.jsonl"));
    }

    #[test]
    fn test_known_hashes_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ABCDEF\n\n  123abc  ").unwrap();
        let keys = load_known_hashes(file.path()).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].as_str(), "abcdef");
    }
}

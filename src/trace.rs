// 🧾 Decision Trace - Append-only audit log carried next to every answer
//
// Each component returns its answer together with the trace entries that
// explain it, instead of writing into a shared list passed around by
// reference.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionTrace {
    entries: Vec<String>,
}

impl DecisionTrace {
    pub fn new() -> Self {
        DecisionTrace { entries: Vec::new() }
    }

    /// Append `"<stage>: <detail>"`
    pub fn record(&mut self, stage: &str, detail: impl AsRef<str>) {
        self.entries.push(format!("{}: {}", stage, detail.as_ref()));
    }

    pub fn append(&mut self, other: DecisionTrace) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

impl From<Vec<String>> for DecisionTrace {
    fn from(entries: Vec<String>) -> Self {
        DecisionTrace { entries }
    }
}

/// An answer plus the trace that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Traced<T> {
    pub value: T,
    pub trace: DecisionTrace,
}

impl<T> Traced<T> {
    pub fn new(value: T, trace: DecisionTrace) -> Self {
        Traced { value, trace }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Traced<U> {
        Traced {
            value: f(self.value),
            trace: self.trace,
        }
    }
}

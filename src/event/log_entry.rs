use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::LogKey;

/// Loosely typed sensor attribute. Ingest writes readings either as strings
/// or as raw numbers, so every attribute accepts any JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
    Other(Value),
}

impl Reading {
    /// `true` only for a string reading equal to `expected`
    pub fn is_text(
        &self,
        expected: &str,
    ) -> bool {
        matches!(self, Reading::Text(s) if s == expected)
    }
}

impl fmt::Display for Reading {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Reading::Text(s) => f.write_str(s),
            Reading::Number(n) => write!(f, "{n}"),
            Reading::Flag(b) => write!(f, "{b}"),
            Reading::Other(v) => write!(f, "{v}"),
        }
    }
}

/// One sensor-log record.
///
/// Every attribute is optional; absent and JSON `null` are the same. Fields
/// other than the four below are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Classification, e.g. `"FLAME DETECTED"`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoke: Option<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Reading>,
    /// `"YES"` when a flame was sensed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flame: Option<Reading>,
}

impl LogEntry {
    /// Classification text, `None` when absent or empty
    pub fn classification(&self) -> Option<String> {
        self.kind
            .as_ref()
            .map(Reading::to_string)
            .filter(|kind| !kind.is_empty())
    }
}

/// A user's log collection, ordered by [`LogKey`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserLogs {
    entries: BTreeMap<LogKey, LogEntry>,
}

impl UserLogs {
    /// Builds the collection from the subtree stored under a user.
    ///
    /// Objects are keyed by child key, arrays by index. Children that are
    /// not records are dropped.
    pub fn from_value(value: Value) -> Self {
        let children: Vec<(String, Value)> = match value {
            Value::Object(map) => map.into_iter().collect(),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Vec::new(),
        };

        let mut entries = BTreeMap::new();
        for (key, child) in children {
            if !child.is_object() {
                continue;
            }
            match serde_json::from_value::<LogEntry>(child) {
                Ok(entry) => {
                    entries.insert(LogKey::new(key), entry);
                }
                Err(e) => debug!("skipping log {}: {}", key, e),
            }
        }

        Self { entries }
    }

    /// Most recently appended entry: the one with the greatest key
    pub fn latest(&self) -> Option<(&LogKey, &LogEntry)> {
        self.entries.last_key_value()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        entry: LogEntry,
    ) {
        self.entries.insert(LogKey::new(key), entry);
    }
}

/// A user id that newly appeared under the logs collection, with that user's
/// full collection as observed at that moment.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildAdded {
    pub user_id: String,
    pub logs: UserLogs,
}

impl ChildAdded {
    pub fn new(
        user_id: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            logs: UserLogs::from_value(data),
        }
    }
}

//! Run-scoped execution history
//!
//! Append-only ledger of every request sent during a run and what came back.
//! The ledger is what the oracle sees when it substitutes placeholders such as
//! "token from the login response" into later requests.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::ExecutionRecord;

/// A recorded step: the key it was stored under and the exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub key: String,
    #[serde(flatten)]
    pub record: ExecutionRecord,
}

/// Insertion-ordered, append-only execution ledger.
///
/// Keys are unique: recording under a key that already exists stores the
/// record as `"{key} #2"`, `"{key} #3"` and so on. Earlier entries never change.
#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    index: HashMap<String, usize>,
}

impl HistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; returns the key it was actually stored under.
    pub fn record(&mut self, key: &str, record: ExecutionRecord) -> String {
        let key = self.free_key(key);
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push(HistoryEntry {
            key: key.clone(),
            record,
        });
        key
    }

    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&ExecutionRecord> {
        self.index.get(key).map(|&i| &self.entries[i].record)
    }

    /// All entries in insertion order.
    #[must_use]
    pub fn all(&self) -> &[HistoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything (start of a new run).
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// JSON array of `{key, request, response}` objects, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(&self.entries).unwrap_or_else(|_| serde_json::Value::Array(vec![]))
    }

    fn free_key(&self, key: &str) -> String {
        if !self.index.contains_key(key) {
            return key.to_string();
        }
        (2..)
            .map(|n| format!("{key} #{n}"))
            .find(|candidate| !self.index.contains_key(candidate))
            .unwrap_or_else(|| key.to_string())
    }
}

//! Transaction stream handed over by the legacy-source driver.
//!
//! One JSON object per line, in any order; the engine sorts by ordinal id.

use std::io::BufRead;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transaction::{TransactionRecord, TxId, DEFAULT_BRANCH};

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

/// One observation of a legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub tx_id: TxId,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_from: Option<String>,
}

impl TransactionInput {
    pub fn new(tx_id: u64, branch: impl Into<String>) -> Self {
        Self {
            tx_id: TxId(tx_id),
            branch: branch.into(),
            path: String::new(),
            version: 0,
            comment: String::new(),
            login: String::new(),
            timestamp: None,
            merged_from: None,
        }
    }

    pub fn merged_from(mut self, branch: impl Into<String>) -> Self {
        self.merged_from = Some(branch.into());
        self
    }

    /// Overwrite the descriptive fields of `record` with this observation.
    pub fn apply_to(&self, record: &mut TransactionRecord) {
        record.path = self.path.clone();
        record.version = self.version;
        record.comment = self.comment.clone();
        record.login = self.login.clone();
        record.timestamp = self.timestamp;
        record.merged_from = self
            .merged_from
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }
}

/// Read a JSON Lines transaction stream. Blank lines are ignored.
pub fn read_transactions<R: BufRead>(reader: R) -> Result<Vec<TransactionInput>> {
    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        out.push(serde_json::from_str(line)?);
    }
    Ok(out)
}

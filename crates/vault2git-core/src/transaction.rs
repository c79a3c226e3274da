//! Legacy transactions and the ordered registry used for resumption.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Branch every transaction belongs to unless told otherwise.
pub const DEFAULT_BRANCH: &str = "master";

/// Ordinal id assigned by the legacy source. Unique per run and monotonically
/// increasing in history order; doubles as the record's handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TxId {
    fn from(value: u64) -> Self {
        TxId(value)
    }
}

/// One legacy transaction. The ordinal id and branch are fixed at creation;
/// the descriptive fields are refreshed by later observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    tx_id: TxId,
    branch: String,
    pub path: String,
    pub version: u64,
    pub comment: String,
    pub login: String,
    pub timestamp: Option<DateTime<Utc>>,
    /// Branch label this transaction merged from, if any.
    pub merged_from: Option<String>,
}

impl TransactionRecord {
    pub fn new(tx_id: TxId, branch: impl Into<String>) -> Self {
        Self {
            tx_id,
            branch: branch.into(),
            path: String::new(),
            version: 0,
            comment: String::new(),
            login: String::new(),
            timestamp: None,
            merged_from: None,
        }
    }

    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Merge source, with empty labels treated as absent.
    pub fn merge_source(&self) -> Option<&str> {
        self.merged_from
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Ordered table of transactions keyed by ordinal id.
#[derive(Debug, Clone, Default)]
pub struct TransactionRegistry {
    records: BTreeMap<TxId, TransactionRecord>,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Return the existing record for `tx_id`, or create a minimally
    /// populated one on `branch`. An existing record keeps its branch.
    pub fn intern(&mut self, tx_id: TxId, branch: &str) -> &mut TransactionRecord {
        self.records
            .entry(tx_id)
            .or_insert_with(|| TransactionRecord::new(tx_id, branch))
    }

    pub fn get(&self, tx_id: TxId) -> Option<&TransactionRecord> {
        self.records.get(&tx_id)
    }

    pub fn get_mut(&mut self, tx_id: TxId) -> Option<&mut TransactionRecord> {
        self.records.get_mut(&tx_id)
    }

    pub fn contains(&self, tx_id: TxId) -> bool {
        self.records.contains_key(&tx_id)
    }

    /// Every record with an id strictly greater than `threshold`, ascending.
    pub fn after(&self, threshold: TxId) -> BTreeMap<TxId, TransactionRecord> {
        self.records
            .range((std::ops::Bound::Excluded(threshold), std::ops::Bound::Unbounded))
            .map(|(id, record)| (*id, record.clone()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records.values()
    }
}

//! Transaction → commit associations, ordered by ordinal id.

use std::collections::BTreeMap;

use crate::commit::CommitId;
use crate::transaction::{TransactionRecord, TxId};

/// Immutable pairing of one transaction with one commit.
///
/// The branch is copied from the transaction at creation; both it and the
/// ordinal id are immutable on the record, so the copy never goes stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    tx_id: TxId,
    branch: String,
    commit: CommitId,
}

impl Mapping {
    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn commit(&self) -> CommitId {
        self.commit
    }
}

/// Append-only table of mappings keyed by ordinal id.
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    entries: BTreeMap<TxId, Mapping>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record `transaction` → `commit`. A repeat call for an ordinal id that
    /// is already mapped returns the existing entry and ignores `commit`.
    pub fn add(&mut self, commit: CommitId, transaction: &TransactionRecord) -> &Mapping {
        self.entries
            .entry(transaction.tx_id())
            .or_insert_with(|| Mapping {
                tx_id: transaction.tx_id(),
                branch: transaction.branch().to_string(),
                commit,
            })
    }

    pub fn get(&self, tx_id: TxId) -> Option<&Mapping> {
        self.entries.get(&tx_id)
    }

    pub fn contains(&self, tx_id: TxId) -> bool {
        self.entries.contains_key(&tx_id)
    }

    /// Ordinal id of the highest mapped transaction.
    pub fn last_processed(&self) -> Option<TxId> {
        self.entries.keys().next_back().copied()
    }

    pub fn as_ordered_map(&self) -> &BTreeMap<TxId, Mapping> {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mapping> {
        self.entries.values()
    }
}

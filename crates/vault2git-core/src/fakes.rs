//! In-memory fakes for the target sink (testing only)
//!
//! `MemorySink` records every request and derives replacement hashes
//! deterministically, so graft passes can be asserted without a git binary.

use std::collections::{BTreeMap, HashMap};

use sha2::{Digest, Sha256};

use crate::error::{MigrationError, Result};
use crate::hash::OID_LEN;
use crate::sink::TargetSink;
use crate::target_log::LogEntry;

/// A graft the engine asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraftRequest {
    pub commit: String,
    pub parents: Vec<String>,
}

/// In-memory target sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub branches: BTreeMap<String, String>,
    pub grafts: Vec<GraftRequest>,
    pub log: Vec<LogEntry>,
    replacements: HashMap<String, String>,
    pinned: HashMap<String, String>,
    /// Fail every graft with this message.
    fail_grafts: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: Vec<LogEntry>) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Force the replacement reported after grafting `commit`.
    pub fn pin_replacement(&mut self, commit: &str, replacement: &str) {
        self.pinned
            .insert(commit.to_string(), replacement.to_string());
    }

    pub fn fail_grafts(&mut self, message: &str) {
        self.fail_grafts = Some(message.to_string());
    }

    /// 40-hex replacement derived from the commit and its new parents.
    pub fn derived_replacement(commit: &str, parents: &[String]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(commit.as_bytes());
        for parent in parents {
            hasher.update([0u8]);
            hasher.update(parent.as_bytes());
        }
        hex::encode(&hasher.finalize()[..OID_LEN])
    }
}

impl TargetSink for MemorySink {
    fn create_branch(&mut self, name: &str, at: &str) -> Result<()> {
        self.branches.insert(name.to_string(), at.to_string());
        Ok(())
    }

    fn graft(&mut self, commit: &str, parents: &[String]) -> Result<()> {
        if let Some(message) = &self.fail_grafts {
            return Err(MigrationError::Sink(message.clone()));
        }
        self.grafts.push(GraftRequest {
            commit: commit.to_string(),
            parents: parents.to_vec(),
        });
        let replacement = self
            .pinned
            .get(commit)
            .cloned()
            .unwrap_or_else(|| Self::derived_replacement(commit, parents));
        self.replacements.insert(commit.to_string(), replacement);
        Ok(())
    }

    fn replacement_of(&mut self, commit: &str) -> Result<String> {
        Ok(self
            .replacements
            .get(commit)
            .cloned()
            .unwrap_or_else(|| commit.to_string()))
    }

    fn log_entries(&mut self) -> Result<Vec<LogEntry>> {
        Ok(self.log.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TxId;

    const H1: &str = "1111111111111111111111111111111111111111";
    const H2: &str = "2222222222222222222222222222222222222222";

    #[test]
    fn unreplaced_commit_reports_itself() {
        let mut sink = MemorySink::new();
        assert_eq!(sink.replacement_of(H1).unwrap(), H1);
    }

    #[test]
    fn graft_records_request_and_derives_replacement() {
        let mut sink = MemorySink::new();
        let parents = vec![H2.to_string()];
        sink.graft(H1, &parents).unwrap();

        assert_eq!(sink.grafts.len(), 1);
        let replacement = sink.replacement_of(H1).unwrap();
        assert_eq!(replacement.len(), 40);
        assert_ne!(replacement, H1);
        assert_eq!(replacement, MemorySink::derived_replacement(H1, &parents));
    }

    #[test]
    fn pinned_replacement_wins() {
        let mut sink = MemorySink::new();
        sink.pin_replacement(H1, H2);
        sink.graft(H1, &[]).unwrap();
        assert_eq!(sink.replacement_of(H1).unwrap(), H2);
    }

    #[test]
    fn failing_graft_is_sink_error() {
        let mut sink = MemorySink::new();
        sink.fail_grafts("git exited with 128");
        assert!(matches!(sink.graft(H1, &[]), Err(MigrationError::Sink(_))));
        assert!(sink.grafts.is_empty());
    }

    #[test]
    fn log_entries_after_filters_by_tag() {
        let entry = |hash: &str, msg: &str| LogEntry {
            hash: hash.to_string(),
            parents: vec![],
            decorations: vec![],
            author_email: String::new(),
            message: msg.to_string(),
        };
        let mut sink = MemorySink::with_log(vec![
            entry(H1, "[git-vault-id] $/A@master/1/5"),
            entry(H2, "[git-vault-id] $/A@master/2/9"),
            entry(H2, "untagged"),
        ]);
        let after = sink.log_entries_after(TxId(5)).unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].tag().unwrap().tx_id, TxId(9));
    }
}

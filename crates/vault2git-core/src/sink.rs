//! Boundary to the target version-control system.
//!
//! The engine never touches the target repository itself; it asks a
//! [`TargetSink`] to create branches, graft commits and report replacements.

use crate::error::Result;
use crate::target_log::LogEntry;
use crate::transaction::TxId;

/// Operations the engine requests from the target system.
pub trait TargetSink {
    /// Create branch `name` pointing at commit `at`.
    fn create_branch(&mut self, name: &str, at: &str) -> Result<()>;

    /// Replace the recorded parent list of `commit` with `parents`.
    fn graft(&mut self, commit: &str, parents: &[String]) -> Result<()>;

    /// Hash `commit` currently resolves to; `commit` itself when it has not
    /// been replaced.
    fn replacement_of(&mut self, commit: &str) -> Result<String>;

    /// Every entry of the target log.
    fn log_entries(&mut self) -> Result<Vec<LogEntry>>;

    /// Tagged log entries for transactions after `threshold`.
    fn log_entries_after(&mut self, threshold: TxId) -> Result<Vec<LogEntry>> {
        Ok(self
            .log_entries()?
            .into_iter()
            .filter(|entry| entry.tag().is_some_and(|tag| tag.tx_id > threshold))
            .collect())
    }
}

//! Structured observability hooks for migration runs.
//!
//! Every event carries an `event` field so log pipelines can filter on it.

use tracing::{info, warn};

use crate::transaction::TxId;

/// RAII guard that enters a run-scoped tracing span.
///
/// ```ignore
/// let _span = MigrationSpan::enter(&run_id);
/// // every event below is tagged with run_id
/// ```
pub struct MigrationSpan {
    _span: tracing::span::EnteredSpan,
}

impl MigrationSpan {
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("vault2git.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }

    /// Enter a span tagged with a fresh random run id, returning both.
    pub fn enter_new() -> (String, Self) {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = Self::enter(&run_id);
        (run_id, span)
    }
}

pub fn emit_state_loaded(transactions: usize, mappings: usize, last_processed: Option<TxId>) {
    info!(
        event = "state.loaded",
        transactions = transactions,
        mappings = mappings,
        last_processed = last_processed.map(|t| t.0),
    );
}

pub fn emit_mapping_created(tx_id: TxId, branch: &str, commit: &str) {
    info!(event = "mapping.created", tx_id = tx_id.0, branch = %branch, commit = %commit);
}

pub fn emit_frontier_missing(branch: &str, fallback: Option<&str>) {
    warn!(event = "frontier.missing", branch = %branch, fallback = ?fallback);
}

pub fn emit_graft_applied(tx_id: TxId, original: &str, replacement: &str, parents: usize) {
    info!(
        event = "graft.applied",
        tx_id = tx_id.0,
        original = %original,
        replacement = %replacement,
        parents = parents,
    );
}

pub fn emit_graft_skipped(tx_id: TxId, source_branch: &str) {
    warn!(event = "graft.skipped", tx_id = tx_id.0, source_branch = %source_branch);
}

pub fn emit_state_corrupt(path: &str, error: &dyn std::fmt::Display) {
    warn!(event = "state.corrupt", path = %path, error = %error);
}

pub fn emit_state_saved(path: &str, entries: usize) {
    info!(event = "state.saved", path = %path, entries = entries);
}

//! Retroactive merge repair.
//!
//! A merge can be committed before its source branch has any commit, so its
//! parent list misses the source tip. Once every mapping exists, a second
//! ordered scan recomputes branch frontiers and grafts the missing parent on.
//! The target assigns the grafted commit a new hash; forwarding the original
//! identity to it updates every mapping at once.

use std::collections::HashMap;

use serde::Serialize;

use crate::commit::CommitId;
use crate::error::Result;
use crate::hash::CommitHash;
use crate::metrics::METRICS;
use crate::obs;
use crate::sink::TargetSink;
use crate::state::ConversionState;
use crate::transaction::TxId;

/// One graft the pass issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraftOutcome {
    pub tx_id: TxId,
    /// Unfollowed hash the graft was requested for.
    pub original: String,
    /// Hash the target reported afterwards.
    pub replacement: String,
    /// Complete parent list sent with the request.
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraftReport {
    /// Mappings scanned.
    pub examined: usize,
    /// Mappings whose transaction merged from another branch.
    pub merges_seen: usize,
    pub grafted: Vec<GraftOutcome>,
    /// Merges whose source tip was already a parent.
    pub already_parented: usize,
    /// Merges left with their recorded parents: (merge, source branch).
    pub missing_frontier: Vec<(TxId, String)>,
}

impl ConversionState {
    /// Scan mappings in ordinal order and graft each merge's source branch
    /// frontier onto it where missing. Safe to run repeatedly.
    pub fn graft_pass(&mut self, sink: &mut dyn TargetSink) -> Result<GraftReport> {
        let mut report = GraftReport::default();
        let ordered: Vec<(TxId, String, CommitId)> = self
            .mappings()
            .iter()
            .map(|m| (m.tx_id(), m.branch().to_string(), m.commit()))
            .collect();

        let mut frontier: HashMap<String, TxId> = HashMap::new();
        for (tx_id, branch, commit) in ordered {
            report.examined += 1;
            let branch_key = self.branch_name(&branch);
            let source = self
                .transactions()
                .get(tx_id)
                .and_then(|record| record.merge_source())
                .map(str::to_string);

            if let Some(source) = source {
                let source_key = self.branch_name(&source);
                if source_key != branch_key {
                    report.merges_seen += 1;
                    let source_hash = frontier
                        .get(&source_key)
                        .and_then(|source_tx| self.mapping(*source_tx))
                        .map(|m| self.commits().commit(m.commit()).hash());
                    match source_hash {
                        None => {
                            METRICS.inc_frontier_misses();
                            obs::emit_graft_skipped(tx_id, &source);
                            report.missing_frontier.push((tx_id, source));
                        }
                        Some(source_hash) if self.commits().has_parent(commit, source_hash) => {
                            report.already_parented += 1;
                        }
                        Some(source_hash) => {
                            let outcome = self.apply_graft(tx_id, commit, source_hash, sink)?;
                            report.grafted.push(outcome);
                        }
                    }
                }
            }

            frontier.insert(branch_key, tx_id);
        }

        tracing::info!(
            examined = report.examined,
            merges = report.merges_seen,
            grafted = report.grafted.len(),
            missing = report.missing_frontier.len(),
            "graft pass complete"
        );
        Ok(report)
    }

    fn apply_graft(
        &mut self,
        tx_id: TxId,
        commit: CommitId,
        source: CommitHash,
        sink: &mut dyn TargetSink,
    ) -> Result<GraftOutcome> {
        let hash = self.commits().commit(commit).hash();
        let original = self.commits().hash_hex(commit, false);
        let mut parents = self.commits().parent_hexes(commit);
        parents.push(self.commits().hashes().to_hex(source, true));

        // the registry only learns the parent once the target accepted it
        sink.graft(&original, &parents)?;
        METRICS.inc_grafts_applied();
        let replacement = sink.replacement_of(&original)?.to_ascii_lowercase();

        let commits = self.commits_mut();
        commits.add_parent(commit, source);
        if replacement != commits.hash_hex(commit, true) {
            commits.replace_hash(hash, &replacement)?;
            METRICS.inc_replacements_issued();
        }
        obs::emit_graft_applied(tx_id, &original, &replacement, parents.len());

        Ok(GraftOutcome {
            tx_id,
            original,
            replacement,
            parents,
        })
    }
}

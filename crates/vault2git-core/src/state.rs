//! Conversion state: the registries of one run plus the operations a driver
//! calls between legacy transactions.
//!
//! A run is strictly sequential. The driver loads state, asks for pending
//! transactions in ordinal order, resolves a fork point for each new branch,
//! commits externally and reports the result through
//! [`ConversionState::create_mapping`]. The graft pass (see `graft.rs`) runs
//! once all mappings exist.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Serialize;

use crate::commit::{CommitId, CommitRegistry};
use crate::config::MigrationConfig;
use crate::error::{MigrationError, Result};
use crate::hash::CommitHash;
use crate::mapping::{Mapping, MappingRegistry};
use crate::metrics::METRICS;
use crate::obs;
use crate::persist::{PersistedEntry, PersistedState};
use crate::rename::{AuthorIdentity, RenameTables};
use crate::source::TransactionInput;
use crate::tag::CorrelationTag;
use crate::target_log::LogEntry;
use crate::transaction::{TransactionRecord, TransactionRegistry, TxId, DEFAULT_BRANCH};

/// What happened to the prior state file during [`ConversionState::load_state`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorState {
    /// No file was given, or it does not exist yet.
    #[default]
    Missing,
    Loaded,
    /// Unreadable; the run was rebuilt from the target log alone.
    Corrupt(String),
}

/// Counters describing one [`ConversionState::load_state`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub transactions_observed: usize,
    pub log_commits: usize,
    pub log_replaced_skipped: usize,
    /// Replaced hashes forwarded to the log entry carrying the same tag.
    pub log_replaced_forwarded: usize,
    /// Log entries dropped because a hash did not parse.
    pub log_malformed: usize,
    /// Mappings created from correlation tags in the target log.
    pub log_mappings: usize,
    /// Mappings created from prior state entries.
    pub prior_mappings: usize,
    /// Prior state entries for ids the target log had already mapped.
    pub prior_absorbed: usize,
    pub prior_state: PriorState,
}

/// Registries and rename tables for one migration run.
#[derive(Debug)]
pub struct ConversionState {
    commits: CommitRegistry,
    transactions: TransactionRegistry,
    mappings: MappingRegistry,
    /// Normalized branch name → ordinal id of its most recent mapping.
    frontier: HashMap<String, TxId>,
    renames: RenameTables,
    default_branch: String,
    git_domain: String,
}

impl Default for ConversionState {
    fn default() -> Self {
        Self {
            commits: CommitRegistry::new(),
            transactions: TransactionRegistry::new(),
            mappings: MappingRegistry::new(),
            frontier: HashMap::new(),
            renames: RenameTables::new(),
            default_branch: DEFAULT_BRANCH.to_string(),
            git_domain: "localhost".to_string(),
        }
    }
}

impl ConversionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &MigrationConfig) -> Self {
        Self {
            default_branch: config.default_branch.clone(),
            git_domain: config.git_domain.clone(),
            ..Self::default()
        }
    }

    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    pub fn commits(&self) -> &CommitRegistry {
        &self.commits
    }

    pub(crate) fn commits_mut(&mut self) -> &mut CommitRegistry {
        &mut self.commits
    }

    pub fn transactions(&self) -> &TransactionRegistry {
        &self.transactions
    }

    pub fn mappings(&self) -> &MappingRegistry {
        &self.mappings
    }

    pub fn renames(&self) -> &RenameTables {
        &self.renames
    }

    // ------------------------------------------------------------------
    // Interning
    // ------------------------------------------------------------------

    pub fn intern_commit(&mut self, hex: &str) -> Result<CommitId> {
        self.commits.intern(hex)
    }

    pub fn intern_commit_with_parents<S: AsRef<str>>(
        &mut self,
        hex: &str,
        parents: &[S],
    ) -> Result<CommitId> {
        self.commits.intern_with_parents(hex, parents)
    }

    pub fn intern_transaction(&mut self, tx_id: TxId, branch: &str) -> &mut TransactionRecord {
        self.transactions.intern(tx_id, branch)
    }

    /// Intern the transaction an input describes and refresh its fields.
    pub fn observe_transaction(&mut self, input: &TransactionInput) -> TxId {
        let record = self.transactions.intern(input.tx_id, &input.branch);
        if record.branch() != input.branch {
            tracing::warn!(
                tx_id = input.tx_id.0,
                recorded = %record.branch(),
                observed = %input.branch,
                "transaction re-observed on a different branch; keeping the first"
            );
        }
        input.apply_to(record);
        input.tx_id
    }

    // ------------------------------------------------------------------
    // Mappings and frontiers
    // ------------------------------------------------------------------

    /// Record that `tx_id` produced `commit` and make it its branch's
    /// frontier. A repeat call for a mapped id keeps the first commit.
    pub fn create_mapping(&mut self, tx_id: TxId, commit: CommitId) -> Result<&Mapping> {
        let record = self
            .transactions
            .get(tx_id)
            .ok_or(MigrationError::UnknownTransaction(tx_id))?;
        let is_new = !self.mappings.contains(tx_id);
        let mapping = self.mappings.add(commit, record);
        self.frontier
            .insert(self.renames.branch_name(mapping.branch()), mapping.tx_id());
        if is_new {
            METRICS.inc_mappings_created();
            obs::emit_mapping_created(
                tx_id,
                mapping.branch(),
                &self.commits.hash_hex(mapping.commit(), true),
            );
        }
        Ok(mapping)
    }

    pub fn mapping(&self, tx_id: TxId) -> Option<&Mapping> {
        self.mappings.get(tx_id)
    }

    /// Followed hex of the commit a mapping points at.
    pub fn mapping_hex(&self, mapping: &Mapping) -> String {
        self.commits.hash_hex(mapping.commit(), true)
    }

    /// Most recent mapping on `branch`, without falling back.
    pub fn branch_frontier(&self, branch: &str) -> Option<&Mapping> {
        self.frontier
            .get(&self.renames.branch_name(branch))
            .and_then(|tx_id| self.mappings.get(*tx_id))
    }

    /// Fork point for a new branch created from `source_branch`: that
    /// branch's frontier, else the default branch's frontier.
    pub fn branch_start_point(&self, source_branch: &str) -> Result<&Mapping> {
        if let Some(mapping) = self.branch_frontier(source_branch) {
            return Ok(mapping);
        }
        METRICS.inc_frontier_misses();
        obs::emit_frontier_missing(source_branch, Some(&self.default_branch));
        self.branch_frontier(&self.default_branch)
            .ok_or_else(|| MigrationError::MissingBranchFrontier {
                branch: source_branch.to_string(),
            })
    }

    fn rebuild_frontiers(&mut self) {
        self.frontier.clear();
        for mapping in self.mappings.iter() {
            self.frontier
                .insert(self.renames.branch_name(mapping.branch()), mapping.tx_id());
        }
    }

    /// Ordinal id of the highest mapped transaction.
    pub fn last_processed(&self) -> Option<TxId> {
        self.mappings.last_processed()
    }

    /// Transactions strictly after the last processed one, ascending.
    pub fn pending_transactions(&self) -> BTreeMap<TxId, TransactionRecord> {
        match self.last_processed() {
            Some(threshold) => self.transactions.after(threshold),
            None => self
                .transactions
                .iter()
                .map(|record| (record.tx_id(), record.clone()))
                .collect(),
        }
    }

    // ------------------------------------------------------------------
    // Renames
    // ------------------------------------------------------------------

    pub fn merge_renames(&mut self, renames: RenameTables) {
        self.renames.merge(renames);
    }

    /// Target branch name for a legacy branch label.
    pub fn branch_name(&self, legacy: &str) -> String {
        self.renames.branch_name(legacy)
    }

    pub fn author(&self, login: &str) -> AuthorIdentity {
        self.renames.author(login, &self.git_domain)
    }

    // ------------------------------------------------------------------
    // Loading and saving
    // ------------------------------------------------------------------

    /// Rebuild the run from its three sources: `transactions` declared by the
    /// legacy driver, the target repository's log, and the prior state file.
    ///
    /// The target log is authoritative. A prior entry only creates a mapping
    /// for an id the log did not mention, and an unreadable prior file is
    /// logged and ignored. Log entries with a malformed hash are skipped and
    /// counted. A replaced entry's hash is forwarded to the entry carrying
    /// the same correlation tag.
    pub fn load_state<I>(
        &mut self,
        renames: RenameTables,
        prior_state: Option<&Path>,
        transactions: I,
        target_log: &[LogEntry],
    ) -> Result<LoadReport>
    where
        I: IntoIterator<Item = TransactionInput>,
    {
        let mut report = LoadReport::default();
        self.merge_renames(renames);

        for input in transactions {
            self.observe_transaction(&input);
            report.transactions_observed += 1;
        }

        let mut tagged: Vec<(CorrelationTag, CommitId)> = Vec::new();
        let mut replaced: Vec<(CorrelationTag, CommitHash)> = Vec::new();
        for entry in target_log {
            if entry.is_replaced() {
                // git lists a grafted commit under its original hash; later
                // commits still name that hash as a parent
                report.log_replaced_skipped += 1;
                match self.commits.hashes_mut().intern_hex(&entry.hash) {
                    Ok(hash) => {
                        if let Some(tag) = entry.tag() {
                            replaced.push((tag, hash));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            hash = %entry.hash,
                            error = %e,
                            "skipping malformed target log entry"
                        );
                        report.log_malformed += 1;
                    }
                }
                continue;
            }
            let commit = match self.commits.intern_with_parents(&entry.hash, &entry.parents) {
                Ok(commit) => commit,
                Err(e) => {
                    tracing::warn!(
                        hash = %entry.hash,
                        error = %e,
                        "skipping malformed target log entry"
                    );
                    report.log_malformed += 1;
                    continue;
                }
            };
            report.log_commits += 1;
            if let Some(tag) = entry.tag() {
                if self.commits.commit(commit).comment.is_empty() {
                    self.commits.set_comment(commit, entry.message.trim());
                }
                tagged.push((tag, commit));
            }
        }
        // stable, so duplicate tags keep log order
        tagged.sort_by_key(|(tag, _)| tag.tx_id);
        for (tag, commit) in tagged {
            let record = self.transactions.intern(tag.tx_id, &tag.branch);
            if record.path.is_empty() {
                record.path = tag.path;
            }
            if record.version == 0 {
                record.version = tag.version;
            }
            if !self.mappings.contains(tag.tx_id) {
                report.log_mappings += 1;
            }
            self.create_mapping(tag.tx_id, commit)?;
        }

        for (tag, original) in replaced {
            let Some(target) = self
                .mappings
                .get(tag.tx_id)
                .map(|m| self.commits.commit(m.commit()).hash())
            else {
                continue;
            };
            if self.commits.hashes().same(original, target) {
                continue;
            }
            match self.commits.hashes_mut().replace(original, target) {
                Ok(_) => report.log_replaced_forwarded += 1,
                Err(e) => tracing::warn!(
                    tx_id = tag.tx_id.0,
                    error = %e,
                    "replaced commit not forwarded"
                ),
            }
        }

        if let Some(path) = prior_state {
            match PersistedState::load(path) {
                Ok(Some(state)) => {
                    report.prior_state = PriorState::Loaded;
                    let mut entries = state.entries;
                    entries.sort_by_key(|entry| entry.tx_id);
                    for entry in entries {
                        if self.mappings.contains(entry.tx_id) {
                            report.prior_absorbed += 1;
                            continue;
                        }
                        let hash = self.commits.hashes_mut().intern_oid(entry.commit);
                        let commit = self.commits.intern_hash(hash);
                        let record = self.transactions.intern(entry.tx_id, &entry.branch);
                        if record.version == 0 {
                            record.version = entry.version;
                        }
                        self.create_mapping(entry.tx_id, commit)?;
                        report.prior_mappings += 1;
                    }
                }
                Ok(None) => report.prior_state = PriorState::Missing,
                Err(e) => {
                    obs::emit_state_corrupt(&path.display().to_string(), &e);
                    report.prior_state = PriorState::Corrupt(e.to_string());
                }
            }
        }

        self.rebuild_frontiers();
        obs::emit_state_loaded(
            self.transactions.len(),
            self.mappings.len(),
            self.last_processed(),
        );
        Ok(report)
    }

    /// Every mapping in ordinal order, with normalized branch and followed hash.
    pub fn to_persisted(&self) -> PersistedState {
        let entries = self
            .mappings
            .iter()
            .map(|mapping| {
                let hash = self.commits.commit(mapping.commit()).hash();
                PersistedEntry {
                    tx_id: mapping.tx_id(),
                    branch: self.renames.branch_name(mapping.branch()),
                    commit: self.commits.hashes().oid(hash, true),
                    version: self
                        .transactions
                        .get(mapping.tx_id())
                        .map(|record| record.version)
                        .unwrap_or_default(),
                }
            })
            .collect();
        PersistedState::new(entries)
    }

    pub fn save_state(&self, path: &Path) -> Result<()> {
        let state = self.to_persisted();
        state.save(path)?;
        obs::emit_state_saved(&path.display().to_string(), state.entries.len());
        Ok(())
    }
}

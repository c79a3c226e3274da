//! Resumption: prior state file, target log and declared transactions merged
//! into one consistent run.

use vault2git_core::{
    ConversionState, LogEntry, PersistedEntry, PersistedState, PriorState, RenameTables,
    TransactionInput, TxId,
};

const INITIAL: &str = "0000000000000000000000000000000000000001";
const STALE: &str = "5555555555555555555555555555555555555555";
const FRESH: &str = "7777777777777777777777777777777777777777";
const OTHER: &str = "9999999999999999999999999999999999999999";

fn entry(hash: &str, parents: &[&str], message: &str) -> LogEntry {
    LogEntry {
        hash: hash.to_string(),
        parents: parents.iter().map(|p| p.to_string()).collect(),
        decorations: vec![],
        author_email: "jdoe@example.com".to_string(),
        message: message.to_string(),
    }
}

fn prior(entries: &[(u64, &str, &str)]) -> PersistedState {
    PersistedState::new(
        entries
            .iter()
            .map(|(tx, branch, hash)| PersistedEntry {
                tx_id: TxId(*tx),
                branch: branch.to_string(),
                commit: hash.parse().unwrap(),
                version: 0,
            })
            .collect(),
    )
}

#[test]
fn fresh_log_entry_wins_over_stale_prior_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    prior(&[(7, "master", STALE)]).save(&path).unwrap();

    let log = vec![
        entry(FRESH, &[INITIAL], "edit\n\n[git-vault-id] $/Proj/a.txt@master/3/7"),
        entry(INITIAL, &[], "[git-vault-id] initial commit @master/0/0"),
    ];
    let mut state = ConversionState::new();
    let report = state
        .load_state(RenameTables::new(), Some(path.as_path()), Vec::new(), &log)
        .unwrap();

    assert_eq!(report.prior_state, PriorState::Loaded);
    assert_eq!(report.prior_absorbed, 1);
    assert_eq!(report.prior_mappings, 0);
    let mapping = state.mapping(TxId(7)).unwrap();
    assert_eq!(state.mapping_hex(mapping), FRESH);
}

#[test]
fn prior_entries_fill_gaps_the_log_does_not_cover() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    prior(&[(4, "dev", OTHER), (7, "master", STALE)]).save(&path).unwrap();

    let log = vec![entry(FRESH, &[], "[git-vault-id] $/Proj@master/3/7")];
    let mut state = ConversionState::new();
    let report = state
        .load_state(RenameTables::new(), Some(path.as_path()), Vec::new(), &log)
        .unwrap();

    assert_eq!(report.prior_mappings, 1);
    assert_eq!(state.mappings().len(), 2);
    let dev = state.branch_start_point("dev").unwrap();
    assert_eq!(dev.tx_id(), TxId(4));
    assert_eq!(state.mapping_hex(dev), OTHER);
}

#[test]
fn corrupt_prior_state_rebuilds_from_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ not json").unwrap();

    let log = vec![
        entry(INITIAL, &[], "[git-vault-id] initial commit @master/0/0"),
        entry(FRESH, &[INITIAL], "[git-vault-id] $/Proj@master/1/3"),
    ];
    let mut state = ConversionState::new();
    let report = state
        .load_state(
            RenameTables::new(),
            Some(path.as_path()),
            vec![TransactionInput::new(3, "master"), TransactionInput::new(6, "master")],
            &log,
        )
        .unwrap();

    assert!(matches!(report.prior_state, PriorState::Corrupt(_)));
    assert_eq!(state.last_processed(), Some(TxId(3)));
    let pending: Vec<TxId> = state.pending_transactions().keys().copied().collect();
    assert_eq!(pending, vec![TxId(6)]);
}

#[test]
fn saved_state_resumes_without_a_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let mut first = ConversionState::new();
    for (tx, branch, hash) in [(1, "master", INITIAL), (2, "Dev Line", OTHER)] {
        first.observe_transaction(&TransactionInput::new(tx, branch));
        let commit = first.intern_commit(hash).unwrap();
        first.create_mapping(TxId(tx), commit).unwrap();
    }
    first.save_state(&path).unwrap();

    let mut second = ConversionState::new();
    let report = second
        .load_state(
            RenameTables::new(),
            Some(path.as_path()),
            vec![
                TransactionInput::new(1, "master"),
                TransactionInput::new(2, "Dev Line"),
                TransactionInput::new(3, "master"),
                TransactionInput::new(4, "Dev Line"),
            ],
            &[],
        )
        .unwrap();

    assert_eq!(report.prior_mappings, 2);
    assert_eq!(second.last_processed(), Some(TxId(2)));
    let pending: Vec<TxId> = second.pending_transactions().keys().copied().collect();
    assert_eq!(pending, vec![TxId(3), TxId(4)]);
    let dev = second.branch_start_point("devline").unwrap();
    assert_eq!(dev.tx_id(), TxId(2));
    assert_eq!(second.mapping_hex(dev), OTHER);
}

#[test]
fn missing_prior_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = ConversionState::new();
    let report = state
        .load_state(
            RenameTables::new(),
            Some(dir.path().join("absent.json").as_path()),
            vec![TransactionInput::new(1, "master")],
            &[],
        )
        .unwrap();
    assert_eq!(report.prior_state, PriorState::Missing);
    assert_eq!(state.pending_transactions().len(), 1);
}

#[test]
fn malformed_log_hash_skips_only_that_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    prior(&[(1, "master", STALE)]).save(&path).unwrap();

    let mut state = ConversionState::new();
    let log = vec![
        entry(FRESH, &["not-a-hash"], "[git-vault-id] $/A@master/1/1"),
        entry(OTHER, &[INITIAL], "[git-vault-id] $/A@master/2/2"),
        entry(INITIAL, &[], "[git-vault-id] initial commit @master/0/0"),
    ];
    let report = state
        .load_state(
            RenameTables::new(),
            Some(path.as_path()),
            vec![
                TransactionInput::new(1, "master"),
                TransactionInput::new(2, "master"),
                TransactionInput::new(3, "master"),
            ],
            &log,
        )
        .unwrap();

    assert_eq!(report.log_malformed, 1);
    assert_eq!(report.log_commits, 2);
    assert_eq!(report.log_mappings, 2);
    // the prior file fills the id the bad entry would have mapped
    assert_eq!(report.prior_mappings, 1);
    assert_eq!(state.mapping_hex(state.mapping(TxId(1)).unwrap()), STALE);
    assert_eq!(state.mapping_hex(state.mapping(TxId(2)).unwrap()), OTHER);
    assert_eq!(state.last_processed(), Some(TxId(2)));
    assert_eq!(state.pending_transactions().len(), 1);
}

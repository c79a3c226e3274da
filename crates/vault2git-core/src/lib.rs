//! vault2git Core Library
//!
//! Identity and mapping engine for migrating legacy Vault history into git:
//! commit identities with replacement forwarding, ordered transaction and
//! mapping registries, resumable state and the merge graft pass.

pub mod commit;
pub mod config;
pub mod error;
pub mod fakes;
pub mod git;
pub mod graft;
pub mod hash;
pub mod mapping;
pub mod metrics;
pub mod obs;
pub mod persist;
pub mod rename;
pub mod sink;
pub mod source;
pub mod state;
pub mod tag;
pub mod target_log;
pub mod telemetry;
pub mod transaction;

pub use commit::{Commit, CommitId, CommitRegistry};
pub use config::MigrationConfig;
pub use error::{HashFormatError, MigrationError, Result};
pub use git::{capture_head_sha, is_git_repo, GitCli};
pub use graft::{GraftOutcome, GraftReport};
pub use hash::{CommitHash, CommitHashRegistry, Oid};
pub use mapping::{Mapping, MappingRegistry};
pub use persist::{PersistedEntry, PersistedState};
pub use rename::{normalize_branch, AuthorIdentity, RenameTables};
pub use sink::TargetSink;
pub use source::{read_transactions, TransactionInput};
pub use state::{ConversionState, LoadReport, PriorState};
pub use tag::{commit_message, CorrelationTag};
pub use target_log::{parse_log, LogEntry};
pub use transaction::{TransactionRecord, TransactionRegistry, TxId, DEFAULT_BRANCH};

/// vault2git version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Correlation tag embedded in every produced commit message.
//!
//! The tag is the round-trip key between a legacy transaction and the commit
//! made for it: `[git-vault-id] <path>@<branch>/<version>/<tx id>`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::transaction::{TransactionRecord, TxId};

/// Literal marker that opens a correlation tag.
pub const MARKER: &str = "[git-vault-id]";

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // path runs up to the last '@' on the line that still leaves a
        // well-formed branch/version/id suffix
        Regex::new(
            r"\[git-vault-id\][ \t]*(?P<path>[^\n]*)@(?P<branch>[^/@\n]+)/(?P<version>\d+)/(?P<tx>\d+)",
        )
        .expect("correlation tag pattern is valid")
    })
}

/// Decoded correlation tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationTag {
    pub path: String,
    pub branch: String,
    pub version: u64,
    pub tx_id: TxId,
}

impl CorrelationTag {
    pub fn new(path: impl Into<String>, branch: impl Into<String>, version: u64, tx_id: TxId) -> Self {
        Self {
            path: path.into(),
            branch: branch.into(),
            version,
            tx_id,
        }
    }

    pub fn for_transaction(record: &TransactionRecord) -> Self {
        Self::new(
            record.path.clone(),
            record.branch(),
            record.version,
            record.tx_id(),
        )
    }

    /// Find the first tag anywhere in `message`.
    pub fn parse(message: &str) -> Option<Self> {
        let caps = tag_pattern().captures(message)?;
        let version = caps["version"].parse().ok()?;
        let tx_id = caps["tx"].parse().ok()?;
        Some(Self {
            path: caps["path"].trim().to_string(),
            branch: caps["branch"].trim().to_string(),
            version,
            tx_id: TxId(tx_id),
        })
    }
}

impl fmt::Display for CorrelationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}@{}/{}/{}",
            MARKER, self.path, self.branch, self.version, self.tx_id
        )
    }
}

/// Full commit message for a transaction: its comment, a blank line, the tag.
pub fn commit_message(comment: &str, tag: &CorrelationTag) -> String {
    let comment = comment.trim_end();
    if comment.is_empty() {
        tag.to_string()
    } else {
        format!("{comment}\n\n{tag}")
    }
}

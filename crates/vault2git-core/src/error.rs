//! Error taxonomy for the vault2git mapping engine.

use crate::transaction::TxId;

/// Errors produced while decoding a commit hash from hex or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashFormatError {
    #[error("invalid length: expected {expected}, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("value can only contain hexadecimal characters: {input}")]
    NonHex { input: String },
}

/// Migration engine errors.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("malformed commit hash: {0}")]
    Format(#[from] HashFormatError),

    #[error("replacing {original} with {replacement} would create a replacement cycle")]
    ReplacementCycle {
        original: String,
        replacement: String,
    },

    #[error("no frontier recorded for branch '{branch}'")]
    MissingBranchFrontier { branch: String },

    #[error("persisted state {path} is unreadable: {detail}")]
    StateCorruption { path: String, detail: String },

    #[error("transaction not found: {0}")]
    UnknownTransaction(TxId),

    #[error("target sink error: {0}")]
    Sink(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for migration engine operations.
pub type Result<T> = std::result::Result<T, MigrationError>;

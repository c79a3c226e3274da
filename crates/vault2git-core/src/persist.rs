//! Persisted mapping state, written after every transaction so an aborted
//! run can resume.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{MigrationError, Result};
use crate::hash::Oid;
use crate::transaction::TxId;

/// Current on-disk format.
pub const FORMAT_VERSION: u32 = 1;

/// One recorded transaction → commit association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedEntry {
    pub tx_id: TxId,
    /// Normalized branch name.
    pub branch: String,
    /// Followed commit hash at the time of writing.
    pub commit: Oid,
    /// Legacy version number.
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub format_version: u32,
    pub entries: Vec<PersistedEntry>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            entries: Vec::new(),
        }
    }
}

impl PersistedState {
    pub fn new(entries: Vec<PersistedEntry>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            entries,
        }
    }

    /// Load from `path`. A missing file is `Ok(None)`; anything unreadable
    /// is [`MigrationError::StateCorruption`].
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(corrupt(path, e.to_string())),
        };
        let state: PersistedState =
            serde_json::from_slice(&bytes).map_err(|e| corrupt(path, e.to_string()))?;
        if state.format_version != FORMAT_VERSION {
            return Err(corrupt(
                path,
                format!("unsupported format version {}", state.format_version),
            ));
        }
        Ok(Some(state))
    }

    /// Write atomically: temp file in the target directory, then rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn corrupt(path: &Path, detail: String) -> MigrationError {
    MigrationError::StateCorruption {
        path: path.display().to_string(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tx: u64, fill: char) -> PersistedEntry {
        PersistedEntry {
            tx_id: TxId(tx),
            branch: "master".to_string(),
            commit: fill.to_string().repeat(40).parse().unwrap(),
            version: tx * 10,
        }
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("vault2git.json");
        let state = PersistedState::new(vec![entry(1, 'a'), entry(2, 'b')]);
        state.save(&path).unwrap();

        let loaded = PersistedState::load(&path).unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PersistedState::load(&dir.path().join("absent.json"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn garbage_is_state_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "<TransactionMap>").unwrap();
        assert!(matches!(
            PersistedState::load(&path),
            Err(MigrationError::StateCorruption { .. })
        ));
    }

    #[test]
    fn unknown_format_version_is_state_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"format_version": 99, "entries": []}"#).unwrap();
        assert!(matches!(
            PersistedState::load(&path),
            Err(MigrationError::StateCorruption { .. })
        ));
    }

    #[test]
    fn overwrite_leaves_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        PersistedState::new(vec![entry(1, 'a')]).save(&path).unwrap();
        PersistedState::new(vec![entry(1, 'a'), entry(2, 'c')])
            .save(&path)
            .unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(PersistedState::load(&path).unwrap().unwrap().entries.len(), 2);
    }
}

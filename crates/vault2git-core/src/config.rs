//! Run configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::transaction::DEFAULT_BRANCH;

/// Settings shared by every migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Branch used as fork point when a source branch has no frontier.
    pub default_branch: String,
    /// Domain appended to logins that have no author mapping.
    pub git_domain: String,
    /// Persisted mapping state file.
    pub state_file: Option<PathBuf>,
    /// Author/branch rename table (TOML).
    pub rename_file: Option<PathBuf>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        MigrationConfig {
            default_branch: std::env::var("VAULT2GIT_DEFAULT_BRANCH")
                .unwrap_or_else(|_| DEFAULT_BRANCH.to_string()),
            git_domain: std::env::var("VAULT2GIT_GIT_DOMAIN")
                .unwrap_or_else(|_| "localhost".to_string()),
            state_file: std::env::var_os("VAULT2GIT_STATE_FILE").map(PathBuf::from),
            rename_file: std::env::var_os("VAULT2GIT_RENAME_FILE").map(PathBuf::from),
        }
    }
}

impl MigrationConfig {
    /// Create a config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn with_default_branch(mut self, branch: &str) -> Self {
        self.default_branch = branch.to_string();
        self
    }

    pub fn with_git_domain(mut self, domain: &str) -> Self {
        self.git_domain = domain.to_string();
        self
    }

    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    pub fn with_rename_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.rename_file = Some(path.into());
        self
    }
}

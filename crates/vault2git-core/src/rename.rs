//! Author and branch rename tables.
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! [authors]
//! jdoe = "John Doe:john.doe@example.com"
//!
//! [branches]
//! Trunk = "master"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MigrationError, Result};

/// Case-fold and strip all whitespace so branch labels from different
/// sources compare equal.
pub fn normalize_branch(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Name and email to commit as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorIdentity {
    pub name: String,
    pub email: String,
}

/// Legacy login → `Name:email`, legacy branch → target branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameTables {
    #[serde(default)]
    pub authors: BTreeMap<String, String>,
    #[serde(default)]
    pub branches: BTreeMap<String, String>,
}

impl RenameTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| MigrationError::Config(format!("rename table: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|e| match e {
            MigrationError::Config(msg) => {
                MigrationError::Config(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Add every entry of `other` whose key is not already present.
    pub fn merge(&mut self, other: RenameTables) {
        for (login, identity) in other.authors {
            self.authors.entry(login).or_insert(identity);
        }
        for (from, to) in other.branches {
            self.branches.entry(from).or_insert(to);
        }
    }

    /// Target branch name for a legacy branch label: renamed if a rule
    /// matches (compared normalized), then normalized.
    pub fn branch_name(&self, legacy: &str) -> String {
        let key = normalize_branch(legacy);
        let renamed = self
            .branches
            .iter()
            .find(|(from, _)| normalize_branch(from) == key)
            .map(|(_, to)| to.as_str());
        match renamed {
            Some(to) => normalize_branch(to),
            None => key,
        }
    }

    /// Author identity for a legacy login. Unmapped or malformed entries fall
    /// back to `login <login@domain>`.
    pub fn author(&self, login: &str, domain: &str) -> AuthorIdentity {
        let mapped = self
            .authors
            .get(login)
            .or_else(|| {
                self.authors
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(login))
                    .map(|(_, v)| v)
            })
            .and_then(|entry| entry.split_once(':'))
            .filter(|(name, email)| !name.trim().is_empty() && !email.trim().is_empty());

        match mapped {
            Some((name, email)) => AuthorIdentity {
                name: name.trim().to_string(),
                email: email.trim().to_string(),
            },
            None => {
                if self.authors.contains_key(login) {
                    tracing::warn!(login = %login, "malformed author mapping, using login");
                }
                AuthorIdentity {
                    name: login.to_string(),
                    email: format!("{login}@{domain}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[authors]
jdoe = "John Doe:john.doe@example.com"
broken = "no separator"

[branches]
"Release 1.0" = "release-1"
Trunk = "Master"
"#;

    #[test]
    fn normalize_folds_case_and_strips_whitespace() {
        assert_eq!(normalize_branch("  Release 1.0\t"), "release1.0");
        assert_eq!(normalize_branch("MASTER"), "master");
    }

    #[test]
    fn parses_toml_tables() {
        let tables = RenameTables::from_toml_str(SAMPLE).unwrap();
        assert_eq!(tables.authors.len(), 2);
        assert_eq!(tables.branches.len(), 2);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let tables = RenameTables::from_toml_str("[authors]\na = \"A:a@x\"\n").unwrap();
        assert!(tables.branches.is_empty());
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = RenameTables::from_toml_str("[authors\n").unwrap_err();
        assert!(matches!(err, MigrationError::Config(_)));
    }

    #[test]
    fn branch_rename_then_normalize() {
        let tables = RenameTables::from_toml_str(SAMPLE).unwrap();
        assert_eq!(tables.branch_name("trunk"), "master");
        assert_eq!(tables.branch_name("release 1.0"), "release-1");
        assert_eq!(tables.branch_name("Feature A"), "featurea");
    }

    #[test]
    fn author_mapping_and_fallback() {
        let tables = RenameTables::from_toml_str(SAMPLE).unwrap();
        let mapped = tables.author("jdoe", "corp.local");
        assert_eq!(mapped.name, "John Doe");
        assert_eq!(mapped.email, "john.doe@example.com");

        let fallback = tables.author("asmith", "corp.local");
        assert_eq!(fallback.name, "asmith");
        assert_eq!(fallback.email, "asmith@corp.local");

        let broken = tables.author("broken", "corp.local");
        assert_eq!(broken.email, "broken@corp.local");
    }

    #[test]
    fn merge_is_additive() {
        let mut base = RenameTables::from_toml_str(SAMPLE).unwrap();
        let mut extra = RenameTables::new();
        extra
            .authors
            .insert("jdoe".to_string(), "Someone Else:else@example.com".to_string());
        extra
            .authors
            .insert("asmith".to_string(), "Ann Smith:ann@example.com".to_string());
        base.merge(extra);

        assert_eq!(base.author("jdoe", "x").name, "John Doe");
        assert_eq!(base.author("asmith", "x").name, "Ann Smith");
    }
}

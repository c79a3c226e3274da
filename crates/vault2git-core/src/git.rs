//! Git-backed target sink.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::{MigrationError, Result};
use crate::sink::TargetSink;
use crate::target_log::{parse_log, LogEntry, LOG_FORMAT};

/// Capture the HEAD commit SHA from a git repository.
///
/// Runs `git rev-parse HEAD` in the given directory. Returns an error if the
/// directory is not inside a git repository or if git is not available.
pub fn capture_head_sha(repo_dir: &Path) -> Result<String> {
    GitCli::new(repo_dir).run(&["rev-parse", "HEAD"])
}

/// Check whether a directory is inside a git work tree.
pub fn is_git_repo(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Runs the `git` binary against one working tree.
#[derive(Debug, Clone)]
pub struct GitCli {
    git: PathBuf,
    repo_dir: PathBuf,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            git: PathBuf::from("git"),
            repo_dir: repo_dir.into(),
        }
    }

    /// Use a specific git executable instead of the one on `PATH`.
    pub fn with_git_binary(mut self, git: impl Into<PathBuf>) -> Self {
        self.git = git.into();
        self
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn output(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!(args = ?args, repo = %self.repo_dir.display(), "running git");
        Command::new(&self.git)
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .map_err(|e| MigrationError::Sink(format!("failed to run git: {e}")))
    }

    /// Run git, returning trimmed stdout on success.
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MigrationError::Sink(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl TargetSink for GitCli {
    fn create_branch(&mut self, name: &str, at: &str) -> Result<()> {
        self.run(&["branch", name, at]).map(|_| ())
    }

    fn graft(&mut self, commit: &str, parents: &[String]) -> Result<()> {
        let mut args = vec!["replace", "-f", "--graft", commit];
        args.extend(parents.iter().map(String::as_str));
        self.run(&args).map(|_| ())
    }

    fn replacement_of(&mut self, commit: &str) -> Result<String> {
        let replace_ref = format!("refs/replace/{commit}");
        let output = self.output(&["rev-parse", "--verify", "--quiet", &replace_ref])?;
        let replacement = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() && !replacement.is_empty() {
            Ok(replacement)
        } else {
            Ok(commit.to_string())
        }
    }

    fn log_entries(&mut self) -> Result<Vec<LogEntry>> {
        let format = format!("--pretty=format:{LOG_FORMAT}");
        let output = self.output(&["log", "--all", &format])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // a repository without commits has no history yet
            if stderr.contains("does not have any commits") {
                return Ok(Vec::new());
            }
            return Err(MigrationError::Sink(format!(
                "git log failed: {}",
                stderr.trim()
            )));
        }
        Ok(parse_log(&String::from_utf8_lossy(&output.stdout)))
    }
}

//! Commits of the target graph and their deduplicating registry.
//!
//! A commit's hash and its parents can be discovered in either order, so
//! parents are appended lazily and compared by followed value.

use std::collections::HashMap;

use crate::error::Result;
use crate::hash::{CommitHash, CommitHashRegistry, Oid};

/// Handle to an interned [`Commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId(u32);

impl CommitId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One target commit: its identity, ordered duplicate-free parents and comment.
#[derive(Debug, Clone)]
pub struct Commit {
    hash: CommitHash,
    parents: Vec<CommitHash>,
    pub comment: String,
}

impl Commit {
    pub fn hash(&self) -> CommitHash {
        self.hash
    }

    /// Copy of the parent list, in insertion order.
    pub fn parents(&self) -> Vec<CommitHash> {
        self.parents.clone()
    }
}

/// Interning table for commits. Owns the [`CommitHashRegistry`] every commit
/// and parent identity lives in.
#[derive(Debug, Default)]
pub struct CommitRegistry {
    hashes: CommitHashRegistry,
    commits: Vec<Commit>,
    by_hash: HashMap<CommitHash, CommitId>,
}

impl CommitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn hashes(&self) -> &CommitHashRegistry {
        &self.hashes
    }

    pub fn hashes_mut(&mut self) -> &mut CommitHashRegistry {
        &mut self.hashes
    }

    /// Fetch or create the commit for `hex` with an empty parent list.
    pub fn intern(&mut self, hex: &str) -> Result<CommitId> {
        let hash = self.hashes.intern_hex(hex)?;
        Ok(self.intern_hash(hash))
    }

    pub fn intern_hash(&mut self, hash: CommitHash) -> CommitId {
        if let Some(&id) = self.by_hash.get(&hash) {
            return id;
        }
        let id = CommitId(self.commits.len() as u32);
        self.commits.push(Commit {
            hash,
            parents: Vec::new(),
            comment: String::new(),
        });
        self.by_hash.insert(hash, id);
        id
    }

    /// Fetch or create the commit for `hex`, then append every parent not
    /// already present by followed value.
    ///
    /// All inputs are validated before anything is interned, so a malformed
    /// parent leaves the registry untouched.
    pub fn intern_with_parents<S: AsRef<str>>(&mut self, hex: &str, parents: &[S]) -> Result<CommitId> {
        let oid = Oid::from_hex(hex)?;
        let parent_oids = parents
            .iter()
            .map(|p| Oid::from_hex(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let hash = self.hashes.intern_oid(oid);
        let id = self.intern_hash(hash);
        for parent in parent_oids {
            let parent_hash = self.hashes.intern_oid(parent);
            self.add_parent(id, parent_hash);
        }
        Ok(id)
    }

    /// Append `parent` unless an existing parent has the same followed value.
    /// Returns whether the list changed.
    pub fn add_parent(&mut self, id: CommitId, parent: CommitHash) -> bool {
        if self.has_parent(id, parent) {
            return false;
        }
        self.commits[id.index()].parents.push(parent);
        true
    }

    pub fn has_parent(&self, id: CommitId, parent: CommitHash) -> bool {
        self.commits[id.index()]
            .parents
            .iter()
            .any(|&p| self.hashes.same(p, parent))
    }

    pub fn commit(&self, id: CommitId) -> &Commit {
        &self.commits[id.index()]
    }

    pub fn set_comment(&mut self, id: CommitId, comment: impl Into<String>) {
        self.commits[id.index()].comment = comment.into();
    }

    /// Find the commit holding `hash`, or failing that the commit holding the
    /// identity `hash` forwards to.
    pub fn find(&self, hash: CommitHash) -> Option<CommitId> {
        self.by_hash
            .get(&hash)
            .or_else(|| self.by_hash.get(&self.hashes.resolve(hash)))
            .copied()
    }

    pub fn find_hex(&self, hex: &str) -> Result<Option<CommitId>> {
        Ok(self.hashes.find_hex(hex)?.and_then(|h| self.find(h)))
    }

    /// Hex of the commit's identity, optionally following replacements.
    pub fn hash_hex(&self, id: CommitId, follow_replacement: bool) -> String {
        self.hashes
            .to_hex(self.commits[id.index()].hash, follow_replacement)
    }

    /// Followed hex of every parent, in order.
    pub fn parent_hexes(&self, id: CommitId) -> Vec<String> {
        self.commits[id.index()]
            .parents
            .iter()
            .map(|&p| self.hashes.to_hex(p, true))
            .collect()
    }

    /// Forward `original` to the identity named by `replacement_hex`,
    /// interning it if needed. Returns `original`.
    pub fn replace_hash(&mut self, original: CommitHash, replacement_hex: &str) -> Result<CommitHash> {
        let replacement = self.hashes.intern_hex(replacement_hex)?;
        self.hashes.replace(original, replacement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_1: &str = "1234567890123456789012345678901234567890";
    const HASH_2: &str = "0123456789012345678901234567890123456789";
    const HASH_3: &str = "abcdefabcdefabcdefabcdefabcdefabcdefabcd";

    #[test]
    fn commit_without_parents_has_none() {
        let mut reg = CommitRegistry::new();
        let id = reg.intern(HASH_1).unwrap();
        assert!(reg.commit(id).parents().is_empty());
        assert_eq!(reg.hash_hex(id, true), HASH_1);
    }

    #[test]
    fn intern_is_idempotent() {
        let mut reg = CommitRegistry::new();
        let a = reg.intern(HASH_1).unwrap();
        let b = reg.intern(&HASH_1.to_uppercase()).unwrap();
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn repeated_parent_lists_do_not_duplicate() {
        let mut reg = CommitRegistry::new();
        let id = reg.intern_with_parents(HASH_1, &[HASH_2]).unwrap();
        reg.intern_with_parents(HASH_1, &[HASH_2, HASH_2]).unwrap();
        reg.intern_with_parents(HASH_1, &[HASH_3, HASH_2]).unwrap();
        assert_eq!(reg.parent_hexes(id), vec![HASH_2.to_string(), HASH_3.to_string()]);
    }

    #[test]
    fn parents_are_compared_by_followed_value() {
        let mut reg = CommitRegistry::new();
        let id = reg.intern_with_parents(HASH_1, &[HASH_2]).unwrap();
        let p2 = reg.hashes().find_hex(HASH_2).unwrap().unwrap();
        reg.replace_hash(p2, HASH_3).unwrap();

        let p3 = reg.hashes().find_hex(HASH_3).unwrap().unwrap();
        assert!(reg.has_parent(id, p3));
        assert!(!reg.add_parent(id, p3));
        assert_eq!(reg.parent_hexes(id), vec![HASH_3.to_string()]);
    }

    #[test]
    fn malformed_parent_leaves_registry_untouched() {
        let mut reg = CommitRegistry::new();
        assert!(reg.intern_with_parents(HASH_1, &[HASH_2, "nothex"]).is_err());
        assert!(reg.is_empty());
        assert!(reg.hashes().is_empty());
    }

    #[test]
    fn accessors_return_copies() {
        let mut reg = CommitRegistry::new();
        let id = reg.intern_with_parents(HASH_1, &[HASH_2]).unwrap();
        let mut parents = reg.commit(id).parents();
        parents.clear();
        assert_eq!(reg.commit(id).parents().len(), 1);
    }

    #[test]
    fn find_follows_forwarding_to_known_commit() {
        let mut reg = CommitRegistry::new();
        let target = reg.intern(HASH_2).unwrap();
        let h1 = reg.hashes_mut().intern_hex(HASH_1).unwrap();
        let h2 = reg.commit(target).hash();
        reg.hashes_mut().replace(h1, h2).unwrap();
        assert_eq!(reg.find(h1), Some(target));
        assert_eq!(reg.find_hex(HASH_1).unwrap(), Some(target));
    }

    #[test]
    fn comment_is_mutable() {
        let mut reg = CommitRegistry::new();
        let id = reg.intern(HASH_1).unwrap();
        reg.set_comment(id, "fix build");
        assert_eq!(reg.commit(id).comment, "fix build");
    }
}

//! Commit identities and the forwarding table that lets one identity
//! transparently resolve to a newer one.
//!
//! A [`CommitHash`] is a copyable handle into a [`CommitHashRegistry`]. The
//! registry stores the raw 20-byte value of every identity it has seen, plus
//! a forwarding slot per handle. `replace(a, b)` repoints `a`'s slot at `b`;
//! every holder of `a` then observes `b` through [`CommitHashRegistry::resolve`]
//! without being touched.
//!
//! Lookups memoize the resolved root per handle and compress the walked path.
//! The memo is tagged with a generation counter that every `replace` bumps, so
//! repointing a node in the middle of a chain is always observed.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{HashFormatError, MigrationError, Result};

/// Length of a raw SHA-1 object id in bytes.
pub const OID_LEN: usize = 20;

/// Length of a SHA-1 object id rendered as hex.
pub const OID_HEX_LEN: usize = 40;

/// Raw 20-byte git object id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid([u8; OID_LEN]);

impl Oid {
    /// Build from exactly 20 raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, HashFormatError> {
        if bytes.len() != OID_LEN {
            return Err(HashFormatError::WrongLength {
                expected: OID_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; OID_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Parse exactly 40 hex characters (either case).
    pub fn from_hex(s: &str) -> std::result::Result<Self, HashFormatError> {
        let len = s.chars().count();
        if len != OID_HEX_LEN {
            return Err(HashFormatError::WrongLength {
                expected: OID_HEX_LEN,
                actual: len,
            });
        }
        let bytes = hex::decode(s).map_err(|_| HashFormatError::NonHex {
            input: s.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; OID_LEN] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", &self.to_hex()[..12])
    }
}

impl FromStr for Oid {
    type Err = HashFormatError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Oid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Oid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Handle to an interned commit identity.
///
/// `==` on handles is identity equality. Use [`CommitHashRegistry::same`]
/// to compare by followed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitHash(u32);

impl CommitHash {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Entry {
    oid: Oid,
    /// Authoritative forwarding slot; points at itself until replaced.
    forward: CommitHash,
    /// Memoized root, valid only while the generation matches.
    root: Cell<(CommitHash, u64)>,
}

/// Deduplicating interning table for commit identities.
///
/// Single-threaded: interning and replacement are check-then-act and the
/// memo uses interior mutability, so the registry is deliberately `!Sync`.
#[derive(Debug, Default)]
pub struct CommitHashRegistry {
    entries: Vec<Entry>,
    index: HashMap<Oid, CommitHash>,
    generation: u64,
}

impl CommitHashRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Intern a 40-character hex string, returning the existing handle when
    /// the value is already known.
    pub fn intern_hex(&mut self, hex: &str) -> Result<CommitHash> {
        let oid = Oid::from_hex(hex)?;
        Ok(self.intern_oid(oid))
    }

    /// Intern a 20-byte raw value.
    pub fn intern_bytes(&mut self, bytes: &[u8]) -> Result<CommitHash> {
        let oid = Oid::from_bytes(bytes)?;
        Ok(self.intern_oid(oid))
    }

    pub fn intern_oid(&mut self, oid: Oid) -> CommitHash {
        if let Some(&existing) = self.index.get(&oid) {
            return existing;
        }
        let handle = CommitHash(self.entries.len() as u32);
        self.entries.push(Entry {
            oid,
            forward: handle,
            root: Cell::new((handle, self.generation)),
        });
        self.index.insert(oid, handle);
        handle
    }

    /// Look up an already-interned raw value.
    pub fn get(&self, oid: &Oid) -> Option<CommitHash> {
        self.index.get(oid).copied()
    }

    /// Look up an already-interned hex value without creating it.
    pub fn find_hex(&self, hex: &str) -> Result<Option<CommitHash>> {
        let oid = Oid::from_hex(hex)?;
        Ok(self.get(&oid))
    }

    /// Follow the forwarding chain to its end.
    pub fn resolve(&self, hash: CommitHash) -> CommitHash {
        let mut path = Vec::new();
        let mut current = hash;
        loop {
            let entry = &self.entries[current.index()];
            let (memo, generation) = entry.root.get();
            if generation == self.generation {
                current = memo;
                break;
            }
            if entry.forward == current {
                break;
            }
            path.push(current);
            current = entry.forward;
        }
        for node in path {
            self.entries[node.index()]
                .root
                .set((current, self.generation));
        }
        self.entries[current.index()]
            .root
            .set((current, self.generation));
        current
    }

    /// Raw value of `hash`, optionally following replacements.
    pub fn oid(&self, hash: CommitHash, follow_replacement: bool) -> Oid {
        let target = if follow_replacement {
            self.resolve(hash)
        } else {
            hash
        };
        self.entries[target.index()].oid
    }

    /// Lowercase hex rendering, optionally following replacements.
    pub fn to_hex(&self, hash: CommitHash, follow_replacement: bool) -> String {
        self.oid(hash, follow_replacement).to_hex()
    }

    /// Followed-value equality.
    pub fn same(&self, a: CommitHash, b: CommitHash) -> bool {
        self.resolve(a) == self.resolve(b)
    }

    pub fn is_replaced(&self, hash: CommitHash) -> bool {
        self.entries[hash.index()].forward != hash
    }

    /// Repoint `original`'s forwarding slot at `replacement` and return
    /// `original`. Repeated calls overwrite the slot; replacing a hash with
    /// itself resets it.
    pub fn replace(&mut self, original: CommitHash, replacement: CommitHash) -> Result<CommitHash> {
        if original != replacement {
            let mut current = replacement;
            loop {
                if current == original {
                    return Err(MigrationError::ReplacementCycle {
                        original: self.to_hex(original, false),
                        replacement: self.to_hex(replacement, false),
                    });
                }
                let next = self.entries[current.index()].forward;
                if next == current {
                    break;
                }
                current = next;
            }
        }
        self.entries[original.index()].forward = replacement;
        self.generation += 1;
        tracing::debug!(
            original = %self.to_hex(original, false),
            replacement = %self.to_hex(replacement, true),
            "commit hash replaced"
        );
        Ok(original)
    }
}

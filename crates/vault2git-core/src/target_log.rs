//! Structured log of the existing target commit graph.
//!
//! Produced by `git log --all --parents` with [`LOG_FORMAT`]: fields are
//! separated by the ASCII unit separator and entries by the record separator,
//! so free-text messages never need escaping.

use crate::hash::Oid;
use crate::tag::CorrelationTag;

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

/// `--pretty=format:` string producing entries [`parse_log`] understands.
pub const LOG_FORMAT: &str = "%H%x1f%P%x1f%D%x1f%ae%x1f%B%x1e";

/// Decoration git prints for commits superseded through `refs/replace`.
pub const REPLACED_DECORATION: &str = "replaced";

/// One commit of the target log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub hash: String,
    pub parents: Vec<String>,
    pub decorations: Vec<String>,
    pub author_email: String,
    pub message: String,
}

impl LogEntry {
    /// Whether this entry has been superseded by a replacement.
    pub fn is_replaced(&self) -> bool {
        self.decorations.iter().any(|d| d == REPLACED_DECORATION)
    }

    pub fn tag(&self) -> Option<CorrelationTag> {
        CorrelationTag::parse(&self.message)
    }

    /// Render back into the wire format.
    pub fn to_record(&self) -> String {
        format!(
            "{}{FIELD_SEP}{}{FIELD_SEP}{}{FIELD_SEP}{}{FIELD_SEP}{}{RECORD_SEP}",
            self.hash,
            self.parents.join(" "),
            self.decorations.join(", "),
            self.author_email,
            self.message
        )
    }
}

/// Parse a whole log. Records with the wrong field count or a malformed hash
/// are skipped with a warning.
pub fn parse_log(text: &str) -> Vec<LogEntry> {
    let mut entries = Vec::new();
    for (index, record) in text.split(RECORD_SEP).enumerate() {
        let record = record.trim_start_matches(['\n', '\r']);
        if record.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = record.splitn(5, FIELD_SEP).collect();
        if fields.len() != 5 {
            tracing::warn!(
                record = index,
                fields = fields.len(),
                "skipping malformed target log record"
            );
            continue;
        }

        let hashes = Oid::from_hex(fields[0].trim()).and_then(|hash| {
            let parents = fields[1]
                .split_whitespace()
                .map(|p| Oid::from_hex(p).map(|oid| oid.to_hex()))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok((hash.to_hex(), parents))
        });
        let (hash, parents) = match hashes {
            Ok(hashes) => hashes,
            Err(e) => {
                tracing::warn!(
                    record = index,
                    error = %e,
                    "skipping target log record with malformed hash"
                );
                continue;
            }
        };
        let decorations = fields[2]
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect();

        entries.push(LogEntry {
            hash,
            parents,
            decorations,
            author_email: fields[3].trim().to_string(),
            message: fields[4].trim_end().to_string(),
        });
    }
    entries
}

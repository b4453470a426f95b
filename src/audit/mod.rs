//! Execution audit log
//!
//! Every executed action (direct or via a passed proposal) is appended here.
//!
//! Design principles:
//! - Immutable append-only log (no deletion)
//! - Hash chained: each entry commits to its predecessor, so editing or
//!   dropping an entry breaks `verify`
//! - Entries are prepared before the action runs and committed after it
//!   succeeded, so a failed action leaves no trace

use crate::identity::{ActionId, Address};
use crate::proposals::ProposalId;
use crate::serialization::{to_cbor, SerializationError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// `prev_hash` of the first entry.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit entry {sequence} does not match its hash")]
    HashMismatch { sequence: u64 },

    #[error("audit entry {sequence} does not link to its predecessor")]
    BrokenLink { sequence: u64 },

    #[error("audit entry {sequence} is out of sequence")]
    OutOfSequence { sequence: u64 },

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// On whose authority an action ran.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Authority {
    /// A caller with a direct rule.
    Account(Address),
    /// A proposal whose voting passed.
    Proposal(ProposalId),
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authority::Account(address) => write!(f, "{}", address),
            Authority::Proposal(id) => write!(f, "proposal {}", id),
        }
    }
}

#[derive(Serialize)]
struct EntryBody<'a> {
    sequence: u64,
    timestamp: u64,
    authority: &'a Authority,
    action: &'a ActionId,
    details: &'a str,
}

/// Single audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: u64,
    /// Unix timestamp (seconds since epoch).
    pub timestamp: u64,
    pub authority: Authority,
    pub action: ActionId,
    /// Human-readable description of what ran.
    pub details: String,
    pub prev_hash: String,
    pub hash: String,
}

impl AuditEntry {
    fn compute_hash(&self) -> Result<String, SerializationError> {
        let body = to_cbor(&EntryBody {
            sequence: self.sequence,
            timestamp: self.timestamp,
            authority: &self.authority,
            action: &self.action,
            details: &self.details,
        })?;

        let mut hasher = Sha256::new();
        hasher.update(self.prev_hash.as_bytes());
        hasher.update(&body);
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn summary(&self) -> String {
        format!(
            "[{}] {} by {}: {}",
            self.sequence, self.action, self.authority, self.details
        )
    }
}

/// Query options for the audit log.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    pub action: Option<ActionId>,
    pub authority: Option<Authority>,
    /// Only entries strictly after this timestamp.
    pub after_timestamp: Option<u64>,
    /// Limit number of results (most recent first).
    pub limit: Option<usize>,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            action: None,
            authority: None,
            after_timestamp: None,
            limit: Some(50),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the next entry without appending it.
    pub fn prepare(
        &self,
        timestamp: u64,
        authority: Authority,
        action: ActionId,
        details: String,
    ) -> Result<AuditEntry, AuditError> {
        let prev_hash = self
            .entries
            .last()
            .map(|entry| entry.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let mut entry = AuditEntry {
            sequence: self.entries.len() as u64,
            timestamp,
            authority,
            action,
            details,
            prev_hash,
            hash: String::new(),
        };
        entry.hash = entry.compute_hash()?;
        Ok(entry)
    }

    /// Append an entry built by `prepare`.
    pub fn commit(&mut self, entry: AuditEntry) -> Result<(), AuditError> {
        if entry.sequence != self.entries.len() as u64 {
            return Err(AuditError::OutOfSequence {
                sequence: entry.sequence,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-hash every entry and check the chain links.
    pub fn verify(&self) -> Result<(), AuditError> {
        let mut prev_hash = GENESIS_HASH;
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.sequence != index as u64 {
                return Err(AuditError::OutOfSequence {
                    sequence: entry.sequence,
                });
            }
            if entry.prev_hash != prev_hash {
                return Err(AuditError::BrokenLink {
                    sequence: entry.sequence,
                });
            }
            if entry.compute_hash()? != entry.hash {
                return Err(AuditError::HashMismatch {
                    sequence: entry.sequence,
                });
            }
            prev_hash = entry.hash.as_str();
        }
        Ok(())
    }

    /// Filtered entries, most recent first.
    pub fn query(&self, query: &AuditQuery) -> Vec<&AuditEntry> {
        let matching = self.entries.iter().rev().filter(|entry| {
            query.action.as_ref().map_or(true, |a| &entry.action == a)
                && query.authority.as_ref().map_or(true, |a| &entry.authority == a)
                && query.after_timestamp.map_or(true, |ts| entry.timestamp > ts)
        });

        match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }
}

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::ActionType;
use crate::hash::EntryHash;
use crate::id::EntryId;
use crate::metadata::Metadata;

/// An action that has been validated and timestamped but not yet sealed
/// onto the chain: it has no id and no hashes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntryCandidate {
    pub timestamp: DateTime<Utc>,
    pub action_type: ActionType,
    pub action: String,
    pub target: String,
    pub details: String,
    pub user_id: String,
    pub smart_id: Option<String>,
    pub metadata: Metadata,
    pub tab_source: String,
}

impl EntryCandidate {
    /// Borrowed view of the hashed content, as it will appear once sealed
    /// with `entry_id`.
    pub fn content(&self, entry_id: EntryId) -> EntryContent<'_> {
        EntryContent {
            entry_id,
            timestamp: &self.timestamp,
            action_type: self.action_type,
            action: &self.action,
            target: &self.target,
            details: &self.details,
            user_id: &self.user_id,
            smart_id: self.smart_id.as_deref(),
            metadata: &self.metadata,
            tab_source: &self.tab_source,
        }
    }

    /// Seal the candidate into a chain entry.
    pub fn seal(self, entry_id: EntryId, previous_hash: EntryHash, entry_hash: EntryHash) -> LedgerEntry {
        LedgerEntry {
            entry_id,
            timestamp: self.timestamp,
            action_type: self.action_type,
            action: self.action,
            target: self.target,
            details: self.details,
            user_id: self.user_id,
            smart_id: self.smart_id,
            metadata: self.metadata,
            tab_source: self.tab_source,
            previous_hash,
            entry_hash,
        }
    }
}

/// One immutable, hash-linked audit record.
///
/// `entry_hash` covers every other field plus `previous_hash`; see the
/// `custodian-crypto` hasher for the canonical encoding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: EntryId,
    pub timestamp: DateTime<Utc>,
    pub action_type: ActionType,
    pub action: String,
    pub target: String,
    pub details: String,
    pub user_id: String,
    pub smart_id: Option<String>,
    pub metadata: Metadata,
    pub tab_source: String,
    pub previous_hash: EntryHash,
    pub entry_hash: EntryHash,
}

impl LedgerEntry {
    /// Borrowed view of the hashed content (everything except the hashes).
    pub fn content(&self) -> EntryContent<'_> {
        EntryContent {
            entry_id: self.entry_id,
            timestamp: &self.timestamp,
            action_type: self.action_type,
            action: &self.action,
            target: &self.target,
            details: &self.details,
            user_id: &self.user_id,
            smart_id: self.smart_id.as_deref(),
            metadata: &self.metadata,
            tab_source: &self.tab_source,
        }
    }

    /// Returns `true` if this is the first entry of a chain.
    pub fn is_genesis(&self) -> bool {
        self.entry_id == EntryId::FIRST
    }

    /// One-line human summary, e.g. `node.register on 'Node-7' by alice`.
    pub fn summary(&self) -> String {
        format!(
            "{}.{} on '{}' by {}",
            self.action_type, self.action, self.target, self.user_id
        )
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.entry_id, self.entry_hash.short_hex(), self.summary())
    }
}

/// Borrowed view of the fields covered by an entry's hash.
#[derive(Clone, Copy, Debug)]
pub struct EntryContent<'a> {
    pub entry_id: EntryId,
    pub timestamp: &'a DateTime<Utc>,
    pub action_type: ActionType,
    pub action: &'a str,
    pub target: &'a str,
    pub details: &'a str,
    pub user_id: &'a str,
    pub smart_id: Option<&'a str>,
    pub metadata: &'a Metadata,
    pub tab_source: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::GENESIS_HASH;
    use crate::metadata::MetadataValue;
    use chrono::TimeZone;

    fn candidate() -> EntryCandidate {
        let mut metadata = Metadata::new();
        metadata.insert("ip".into(), MetadataValue::from("10.0.0.7"));
        EntryCandidate {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            action_type: ActionType::Node,
            action: "register".into(),
            target: "Node-7".into(),
            details: "Registered Node from discovery (10.0.0.7)".into(),
            user_id: "alice".into(),
            smart_id: Some("NOD-00007".into()),
            metadata,
            tab_source: "nodes".into(),
        }
    }

    #[test]
    fn seal_carries_all_fields() {
        let c = candidate();
        let entry = c.clone().seal(EntryId::FIRST, GENESIS_HASH, EntryHash::from_bytes([9; 32]));
        assert_eq!(entry.entry_id, EntryId::FIRST);
        assert_eq!(entry.target, c.target);
        assert_eq!(entry.smart_id.as_deref(), Some("NOD-00007"));
        assert_eq!(entry.metadata, c.metadata);
        assert_eq!(entry.previous_hash, GENESIS_HASH);
        assert!(entry.is_genesis());
    }

    #[test]
    fn content_views_agree() {
        let c = candidate();
        let from_candidate = format!("{:?}", c.content(EntryId::new(5)));
        let entry = c.seal(EntryId::new(5), GENESIS_HASH, GENESIS_HASH);
        assert_eq!(format!("{:?}", entry.content()), from_candidate);
    }

    #[test]
    fn summary_and_display() {
        let entry = candidate().seal(EntryId::new(3), GENESIS_HASH, EntryHash::from_bytes([0xcd; 32]));
        assert_eq!(entry.summary(), "node.register on 'Node-7' by alice");
        assert_eq!(
            entry.to_string(),
            "led#3 [cdcdcdcd] node.register on 'Node-7' by alice"
        );
    }

    #[test]
    fn json_roundtrip() {
        let entry = candidate().seal(EntryId::FIRST, GENESIS_HASH, EntryHash::from_bytes([1; 32]));
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: LedgerEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}

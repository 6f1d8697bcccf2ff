use chrono::SecondsFormat;

use custodian_types::{EntryContent, EntryHash, LedgerEntry, MetadataValue};

/// Domain-separated BLAKE3 chain hasher.
///
/// The hash of an entry is
/// `BLAKE3(domain ":" canonical(entry without hashes) previous_hash)`.
///
/// The canonical encoding is independent of map iteration order, locale and
/// wall-clock time. Fields are written in a fixed order; every string is
/// prefixed by its byte length so that no two distinct entries share an
/// encoding.
///
/// ```text
/// entry_id    u64 LE
/// timestamp   str  (RFC 3339, nanoseconds, "Z")
/// action_type str
/// action      str
/// target      str
/// details     str
/// user_id     str
/// smart_id    u8 presence [+ str]
/// metadata    u64 LE count, then per key in sorted order: str key, u8 tag, value
/// tab_source  str
///
/// str   = u64 LE byte length + UTF-8 bytes
/// value = 0 null | 1 bool (u8) | 2 integer (i64 LE) | 3 float (f64 bits LE) | 4 text (str)
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ChainHasher {
    domain: &'static str,
}

impl ChainHasher {
    /// Hasher for ledger entries.
    pub const ENTRY: Self = Self {
        domain: "custodian-entry-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Canonical bytes of an entry's hashed content.
    pub fn canonical_bytes(&self, content: &EntryContent<'_>) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(&content.entry_id.get().to_le_bytes());
        put_str(
            &mut buf,
            &content
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
        );
        put_str(&mut buf, content.action_type.as_str());
        put_str(&mut buf, content.action);
        put_str(&mut buf, content.target);
        put_str(&mut buf, content.details);
        put_str(&mut buf, content.user_id);
        match content.smart_id {
            Some(id) => {
                buf.push(1);
                put_str(&mut buf, id);
            }
            None => buf.push(0),
        }
        buf.extend_from_slice(&(content.metadata.len() as u64).to_le_bytes());
        for (key, value) in content.metadata {
            put_str(&mut buf, key);
            put_value(&mut buf, value);
        }
        put_str(&mut buf, content.tab_source);
        buf
    }

    /// Hash an entry's content chained onto `previous_hash`.
    pub fn compute_hash(&self, content: &EntryContent<'_>, previous_hash: &EntryHash) -> EntryHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(&self.canonical_bytes(content));
        hasher.update(previous_hash.as_bytes());
        EntryHash::from_bytes(*hasher.finalize().as_bytes())
    }

    /// Recompute the hash from the stored fields and compare it to
    /// `entry.entry_hash`.
    pub fn verify_hash(&self, entry: &LedgerEntry) -> bool {
        self.compute_hash(&entry.content(), &entry.previous_hash) == entry.entry_hash
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

impl Default for ChainHasher {
    fn default() -> Self {
        Self::ENTRY
    }
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn put_value(buf: &mut Vec<u8>, value: &MetadataValue) {
    match value {
        MetadataValue::Null => buf.push(0),
        MetadataValue::Bool(b) => {
            buf.push(1);
            buf.push(u8::from(*b));
        }
        MetadataValue::Integer(i) => {
            buf.push(2);
            buf.extend_from_slice(&i.to_le_bytes());
        }
        MetadataValue::Float(f) => {
            buf.push(3);
            buf.extend_from_slice(&f.to_bits().to_le_bytes());
        }
        MetadataValue::Text(s) => {
            buf.push(4);
            put_str(buf, s);
        }
    }
}

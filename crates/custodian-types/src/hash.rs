use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::TypeError;

/// Sentinel `previous_hash` of the genesis entry (all zeros).
pub const GENESIS_HASH: EntryHash = EntryHash([0u8; 32]);

/// 256-bit chain hash of a ledger entry.
///
/// Serialized as a lowercase hex string for human-readable formats (JSON,
/// TOML) and as raw bytes for binary formats, so on-disk records stay
/// compact while API output stays readable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryHash([u8; 32]);

impl EntryHash {
    /// Wrap a pre-computed digest.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns `true` if this is the genesis sentinel.
    pub fn is_genesis(&self) -> bool {
        *self == GENESIS_HASH
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s.trim()).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }
}

impl Default for EntryHash {
    fn default() -> Self {
        GENESIS_HASH
    }
}

impl fmt::Debug for EntryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryHash({})", self.short_hex())
    }
}

impl fmt::Display for EntryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; 32]> for EntryHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for EntryHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for EntryHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HashVisitor;

        impl<'de> Visitor<'de> for HashVisitor {
            type Value = EntryHash;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 32-byte hash as hex string or bytes")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<EntryHash, E> {
                EntryHash::from_hex(v).map_err(E::custom)
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<EntryHash, E> {
                let arr: [u8; 32] = v
                    .try_into()
                    .map_err(|_| E::invalid_length(v.len(), &self))?;
                Ok(EntryHash(arr))
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<EntryHash, E> {
                self.visit_bytes(&v)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(HashVisitor)
        } else {
            deserializer.deserialize_bytes(HashVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_all_zeros() {
        assert!(GENESIS_HASH.is_genesis());
        assert_eq!(GENESIS_HASH.as_bytes(), &[0u8; 32]);
        assert_eq!(EntryHash::default(), GENESIS_HASH);
        assert!(!EntryHash::from_bytes([1; 32]).is_genesis());
    }

    #[test]
    fn hex_roundtrip() {
        let h = EntryHash::from_bytes([0xab; 32]);
        assert_eq!(EntryHash::from_hex(&h.to_hex()).unwrap(), h);
        assert_eq!(h.short_hex(), "abababab");
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        let err = EntryHash::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
        assert!(matches!(
            EntryHash::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn json_uses_hex() {
        let h = EntryHash::from_bytes([0x01; 32]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        let parsed: EntryHash = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, h);
    }

    #[test]
    fn bincode_uses_raw_bytes() {
        let h = EntryHash::from_bytes([0x5a; 32]);
        let bytes = bincode::serialize(&h).unwrap();
        // 8-byte length prefix + 32 raw bytes.
        assert_eq!(bytes.len(), 40);
        let parsed: EntryHash = bincode::deserialize(&bytes).unwrap();
        assert_eq!(parsed, h);
    }
}

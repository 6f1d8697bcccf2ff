use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Position of an entry in the chain.
///
/// Ids are 1-based and gap-free: the entry at chain position `i` has id
/// `i + 1`. This makes append order, chain order, and id order identical.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    /// The id assigned to the genesis entry.
    pub const FIRST: Self = Self(1);

    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Id of the entry stored at zero-based chain `position`.
    pub const fn at_position(position: u64) -> Self {
        Self(position + 1)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Zero-based chain position of this id.
    pub const fn position(&self) -> u64 {
        self.0.saturating_sub(1)
    }

    /// The id that follows this one.
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "led#{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = TypeError;

    /// Accepts both the display form (`led#42`) and a bare number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix("led#").unwrap_or(s.trim());
        match digits.parse::<u64>() {
            Ok(0) | Err(_) => Err(TypeError::InvalidEntryId(s.to_string())),
            Ok(n) => Ok(Self(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_and_id_agree() {
        assert_eq!(EntryId::at_position(0), EntryId::FIRST);
        assert_eq!(EntryId::new(7).position(), 6);
        assert_eq!(EntryId::new(7).next(), EntryId::new(8));
    }

    #[test]
    fn display_and_parse() {
        let id = EntryId::new(42);
        assert_eq!(id.to_string(), "led#42");
        assert_eq!("led#42".parse::<EntryId>().unwrap(), id);
        assert_eq!("42".parse::<EntryId>().unwrap(), id);
    }

    #[test]
    fn zero_and_garbage_are_rejected() {
        assert!("0".parse::<EntryId>().is_err());
        assert!("led#".parse::<EntryId>().is_err());
        assert!("abc".parse::<EntryId>().is_err());
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&EntryId::new(3)).unwrap();
        assert_eq!(json, "3");
    }
}

use custodian_types::{EntryHash, EntryId, LedgerEntry, GENESIS_HASH};

use crate::hasher::ChainHasher;

/// How a chain was found to be broken.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BreakKind {
    #[error("sequence gap: expected {expected}")]
    SequenceGap { expected: EntryId },

    #[error("previous_hash does not match the preceding entry")]
    BrokenLink,

    #[error("stored entry_hash differs from recomputed hash")]
    HashMismatch,
}

/// First point at which a chain fails verification.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("chain broken at {entry_id} (position {position}): {kind}")]
pub struct ChainBreak {
    /// Id stored in the offending entry.
    pub entry_id: EntryId,
    /// Zero-based chain position of the offending entry.
    pub position: u64,
    pub kind: BreakKind,
}

/// Streaming hash-chain verifier.
///
/// Entries are fed in chain order starting from genesis. For each entry it
/// checks, in order:
/// 1. the id continues the sequence without gaps
/// 2. `previous_hash` equals the preceding entry's `entry_hash`
///    (`GENESIS_HASH` for the first entry)
/// 3. `entry_hash` recomputes from the stored fields
///
/// Holding only the running tail, it verifies arbitrarily long chains in
/// constant memory.
#[derive(Clone, Debug)]
pub struct ChainVerifier {
    hasher: ChainHasher,
    position: u64,
    expected_prev: EntryHash,
}

impl ChainVerifier {
    /// Verifier positioned before the genesis entry.
    pub fn new() -> Self {
        Self::with_hasher(ChainHasher::ENTRY)
    }

    pub fn with_hasher(hasher: ChainHasher) -> Self {
        Self {
            hasher,
            position: 0,
            expected_prev: GENESIS_HASH,
        }
    }

    /// Verify the next entry in the chain.
    pub fn push(&mut self, entry: &LedgerEntry) -> Result<(), ChainBreak> {
        let expected_id = EntryId::at_position(self.position);
        let fail = |kind| ChainBreak {
            entry_id: entry.entry_id,
            position: self.position,
            kind,
        };

        if entry.entry_id != expected_id {
            return Err(fail(BreakKind::SequenceGap {
                expected: expected_id,
            }));
        }
        if entry.previous_hash != self.expected_prev {
            return Err(fail(BreakKind::BrokenLink));
        }
        if !self.hasher.verify_hash(entry) {
            return Err(fail(BreakKind::HashMismatch));
        }

        self.expected_prev = entry.entry_hash;
        self.position += 1;
        Ok(())
    }

    /// Number of entries verified so far.
    pub fn checked(&self) -> u64 {
        self.position
    }

    /// Hash of the last verified entry (`GENESIS_HASH` if none).
    pub fn tail(&self) -> EntryHash {
        self.expected_prev
    }

    /// Verify a whole chain, returning the number of entries checked.
    pub fn verify_all<'a, I>(entries: I) -> Result<u64, ChainBreak>
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let mut verifier = Self::new();
        for entry in entries {
            verifier.push(entry)?;
        }
        Ok(verifier.checked())
    }
}

impl Default for ChainVerifier {
    fn default() -> Self {
        Self::new()
    }
}

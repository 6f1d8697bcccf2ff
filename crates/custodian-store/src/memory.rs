use std::sync::RwLock;

use custodian_crypto::ChainHasher;
use custodian_types::{EntryCandidate, EntryHash, LedgerEntry, GENESIS_HASH};

use crate::counts::CategoryCounts;
use crate::error::{StoreError, StoreResult};
use crate::range::EntryRange;
use crate::traits::{clamp_range, seal_next, LedgerStore};

/// In-memory, `Vec`-backed ledger store.
///
/// Intended for tests and embedding. Nothing survives the process. Entries
/// are cloned into each [`EntryRange`], so ranges stay valid while the
/// store keeps growing.
pub struct InMemoryLedgerStore {
    hasher: ChainHasher,
    inner: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    entries: Vec<LedgerEntry>,
    counts: CategoryCounts,
}

impl InMemoryLedgerStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            hasher: ChainHasher::ENTRY,
            inner: RwLock::new(MemoryState::default()),
        }
    }

    /// Load an existing chain as-is.
    ///
    /// The entries are not verified; use this to inspect exported or
    /// suspect chains with the regular query and verification paths.
    pub fn from_entries(entries: Vec<LedgerEntry>) -> Self {
        let counts = CategoryCounts::from_entries(&entries);
        Self {
            hasher: ChainHasher::ENTRY,
            inner: RwLock::new(MemoryState { entries, counts }),
        }
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append_entry(&self, candidate: EntryCandidate) -> StoreResult<LedgerEntry> {
        let mut state = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let previous_hash = state.entries.last().map_or(GENESIS_HASH, |e| e.entry_hash);
        let entry = seal_next(
            &self.hasher,
            candidate,
            state.entries.len() as u64,
            previous_hash,
        );
        state.counts.record(entry.action_type);
        state.entries.push(entry.clone());
        Ok(entry)
    }

    fn read_range(&self, offset: u64, count: u64) -> StoreResult<EntryRange> {
        let state = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let range = clamp_range(offset, count, state.entries.len() as u64)?;
        Ok(EntryRange::from_entries(state.entries[range].to_vec()))
    }

    fn read_tail_hash(&self) -> StoreResult<EntryHash> {
        let state = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.entries.last().map_or(GENESIS_HASH, |e| e.entry_hash))
    }

    fn len(&self) -> StoreResult<u64> {
        Ok(self.inner.read().map_err(|_| StoreError::Poisoned)?.entries.len() as u64)
    }

    fn category_counts(&self) -> StoreResult<CategoryCounts> {
        Ok(self.inner.read().map_err(|_| StoreError::Poisoned)?.counts)
    }
}

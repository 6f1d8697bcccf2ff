use std::ops::Range;

use custodian_crypto::ChainHasher;
use custodian_types::{EntryCandidate, EntryHash, EntryId, LedgerEntry};

use crate::counts::CategoryCounts;
use crate::error::{StoreError, StoreResult};
use crate::range::EntryRange;

/// Append-only, hash-chained entry store.
///
/// All implementations must satisfy these invariants:
/// - Entries are immutable once written and only ever appended.
/// - `append_entry` is all-or-nothing: on error nothing becomes visible and
///   the tail does not move.
/// - An entry is published to readers only after it is durable.
/// - `category_counts` always equals grouping the published entries.
/// - Readers never block on, or are blocked by, an append in progress
///   beyond the instant of publication.
pub trait LedgerStore: Send + Sync {
    /// Seal `candidate` onto the tail of the chain and persist it.
    ///
    /// The store assigns the next id, links it to the current tail hash and
    /// computes its `entry_hash`. Returns the sealed entry.
    fn append_entry(&self, candidate: EntryCandidate) -> StoreResult<LedgerEntry>;

    /// Entries at chain positions `offset..offset + count`, in chain order.
    ///
    /// `count` is clamped to the published length. An `offset` past the end
    /// is an error.
    fn read_range(&self, offset: u64, count: u64) -> StoreResult<EntryRange>;

    /// Hash of the last published entry, or `GENESIS_HASH` when empty.
    fn read_tail_hash(&self) -> StoreResult<EntryHash>;

    /// Number of published entries.
    fn len(&self) -> StoreResult<u64>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Per-category counts of the published entries.
    fn category_counts(&self) -> StoreResult<CategoryCounts>;

    /// Read a single entry by id.
    fn read_entry(&self, entry_id: EntryId) -> StoreResult<Option<LedgerEntry>> {
        if entry_id.get() == 0 || entry_id.position() >= self.len()? {
            return Ok(None);
        }
        self.read_range(entry_id.position(), 1)?.next().transpose()
    }
}

/// Seal a candidate at chain `position` on top of `previous_hash`.
pub(crate) fn seal_next(
    hasher: &ChainHasher,
    candidate: EntryCandidate,
    position: u64,
    previous_hash: EntryHash,
) -> LedgerEntry {
    let entry_id = EntryId::at_position(position);
    let entry_hash = hasher.compute_hash(&candidate.content(entry_id), &previous_hash);
    candidate.seal(entry_id, previous_hash, entry_hash)
}

/// Resolve a requested range against the published length.
pub(crate) fn clamp_range(offset: u64, count: u64, len: u64) -> StoreResult<Range<usize>> {
    if offset > len {
        return Err(StoreError::OutOfRange { offset, count, len });
    }
    let end = offset.saturating_add(count).min(len);
    Ok(offset as usize..end as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_range_bounds() {
        assert_eq!(clamp_range(0, 10, 4).unwrap(), 0..4);
        assert_eq!(clamp_range(2, 1, 4).unwrap(), 2..3);
        assert_eq!(clamp_range(4, 5, 4).unwrap(), 4..4);
        assert_eq!(clamp_range(1, u64::MAX, 4).unwrap(), 1..4);
        assert!(matches!(
            clamp_range(5, 1, 4),
            Err(StoreError::OutOfRange { offset: 5, .. })
        ));
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use custodian_crypto::ChainVerifier;
use custodian_store::{CategoryCounts, EntryRange, LedgerStore, StoreError};
use custodian_types::{ActionType, EntryHash, EntryId, LedgerEntry, GENESIS_HASH};

use crate::error::{LedgerError, LedgerResult};

/// Default page size for [`EntryFilter`].
pub const DEFAULT_FILTER_LIMIT: usize = 100;

/// The most recent entries, newest first.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecentActivities {
    pub activities: Vec<LedgerEntry>,
    /// Chain length at the time of the query.
    pub total: u64,
}

/// Entries matching an [`EntryFilter`], newest first.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilteredEntries {
    pub entries: Vec<LedgerEntry>,
}

/// Outcome of walking the chain from genesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub valid: bool,
    /// First entry that failed verification.
    pub broken_at: Option<EntryId>,
    /// Entries verified before stopping.
    pub checked: u64,
    /// Chain length when verification started.
    pub total: u64,
    pub failure: Option<String>,
}

/// Aggregate view of the chain.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total_entries: u64,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub tail_hash: EntryHash,
    pub categories: CategoryCounts,
    pub users: BTreeMap<String, u64>,
    pub smart_ids: BTreeMap<String, u64>,
}

/// Criteria for [`QueryEngine::get_filtered`].
///
/// All set criteria must match. `search` is a case-insensitive substring
/// match on `target`, `details` and `smart_id`; time bounds are inclusive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryFilter {
    pub action_type: Option<ActionType>,
    pub action: Option<String>,
    pub user_id: Option<String>,
    pub tab_source: Option<String>,
    pub search: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Matches to skip, newest first.
    pub offset: usize,
    pub limit: usize,
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self {
            action_type: None,
            action: None,
            user_id: None,
            tab_source: None,
            search: None,
            since: None,
            until: None,
            offset: 0,
            limit: DEFAULT_FILTER_LIMIT,
        }
    }
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action_type(mut self, action_type: ActionType) -> Self {
        self.action_type = Some(action_type);
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn tab_source(mut self, tab_source: impl Into<String>) -> Self {
        self.tab_source = Some(tab_source.into());
        self
    }

    pub fn search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Returns `true` if `entry` satisfies every set criterion.
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.matches_with(entry, self.search.as_deref().map(str::to_lowercase).as_deref())
    }

    fn matches_with(&self, entry: &LedgerEntry, needle: Option<&str>) -> bool {
        if self.action_type.is_some_and(|t| t != entry.action_type) {
            return false;
        }
        if self.action.as_deref().is_some_and(|a| a != entry.action) {
            return false;
        }
        if self.user_id.as_deref().is_some_and(|u| u != entry.user_id) {
            return false;
        }
        if self.tab_source.as_deref().is_some_and(|t| t != entry.tab_source) {
            return false;
        }
        if self.since.is_some_and(|t| entry.timestamp < t) {
            return false;
        }
        if self.until.is_some_and(|t| entry.timestamp > t) {
            return false;
        }
        match needle {
            None => true,
            Some(needle) => {
                entry.target.to_lowercase().contains(needle)
                    || entry.details.to_lowercase().contains(needle)
                    || entry
                        .smart_id
                        .as_deref()
                        .is_some_and(|s| s.to_lowercase().contains(needle))
            }
        }
    }
}

/// Read-side operations over a ledger store.
///
/// Queries never take the append gate. Each query works on the chain length
/// observed when it starts, so entries appended meanwhile are not reported.
/// A store that cannot be read yields [`LedgerError::Unavailable`].
pub struct QueryEngine {
    store: Arc<dyn LedgerStore>,
    scan_chunk: u64,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn LedgerStore>, scan_chunk: u64) -> Self {
        Self {
            store,
            scan_chunk: scan_chunk.max(1),
        }
    }

    /// The `limit` most recent entries, newest first.
    pub fn get_recent(&self, limit: usize) -> LedgerResult<RecentActivities> {
        let total = self.store.len().map_err(LedgerError::Unavailable)?;
        let start = total.saturating_sub(limit as u64);
        let mut activities = collect(self.range(start, total - start)?)?;
        activities.reverse();
        Ok(RecentActivities { activities, total })
    }

    /// Entries matching `filter`, newest first, after skipping
    /// `filter.offset` matches and stopping at `filter.limit`.
    pub fn get_filtered(&self, filter: &EntryFilter) -> LedgerResult<FilteredEntries> {
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let mut entries = Vec::new();
        let mut skipped = 0;
        let mut end = self.store.len().map_err(LedgerError::Unavailable)?;

        while end > 0 && entries.len() < filter.limit {
            let start = end.saturating_sub(self.scan_chunk);
            let chunk = collect(self.range(start, end - start)?)?;
            for entry in chunk.into_iter().rev() {
                if !filter.matches_with(&entry, needle.as_deref()) {
                    continue;
                }
                if skipped < filter.offset {
                    skipped += 1;
                    continue;
                }
                entries.push(entry);
                if entries.len() == filter.limit {
                    break;
                }
            }
            end = start;
        }

        Ok(FilteredEntries { entries })
    }

    /// Per-category entry counts.
    pub fn get_counts(&self) -> LedgerResult<CategoryCounts> {
        self.store.category_counts().map_err(LedgerError::Unavailable)
    }

    pub fn get_entry(&self, entry_id: EntryId) -> LedgerResult<Option<LedgerEntry>> {
        self.store.read_entry(entry_id).map_err(LedgerError::Unavailable)
    }

    /// Walk the chain from genesis and report the first broken entry.
    ///
    /// Verification covers the chain as it was when the call started and
    /// never blocks writers. Records that can no longer be decoded count as
    /// broken; other read failures are returned as errors.
    pub fn verify_integrity(&self) -> LedgerResult<IntegrityReport> {
        let total = self.store.len().map_err(LedgerError::Unavailable)?;
        let mut verifier = ChainVerifier::new();

        for (start, count) in self.chunks(total) {
            for item in self.range(start, count)? {
                let outcome = match item {
                    Ok(entry) => verifier.push(&entry).map_err(|brk| (brk.entry_id, brk.to_string())),
                    Err(e @ StoreError::Corrupt { .. }) => {
                        Err((EntryId::at_position(verifier.checked()), e.to_string()))
                    }
                    Err(e) => return Err(LedgerError::Unavailable(e)),
                };
                if let Err((entry_id, failure)) = outcome {
                    warn!(%entry_id, checked = verifier.checked(), %failure, "chain verification failed");
                    return Ok(IntegrityReport {
                        valid: false,
                        broken_at: Some(entry_id),
                        checked: verifier.checked(),
                        total,
                        failure: Some(failure),
                    });
                }
            }
        }

        info!(checked = verifier.checked(), tail = %verifier.tail().short_hex(), "chain verified");
        Ok(IntegrityReport {
            valid: true,
            broken_at: None,
            checked: verifier.checked(),
            total,
            failure: None,
        })
    }

    /// Totals, time span and per-user / per-smart-id counts.
    pub fn get_stats(&self) -> LedgerResult<LedgerStats> {
        let total = self.store.len().map_err(LedgerError::Unavailable)?;
        let mut stats = LedgerStats {
            total_entries: total,
            first_timestamp: None,
            last_timestamp: None,
            tail_hash: GENESIS_HASH,
            categories: CategoryCounts::default(),
            users: BTreeMap::new(),
            smart_ids: BTreeMap::new(),
        };

        for (start, count) in self.chunks(total) {
            for entry in self.range(start, count)? {
                let entry = entry.map_err(LedgerError::Unavailable)?;
                stats.first_timestamp.get_or_insert(entry.timestamp);
                stats.last_timestamp = Some(entry.timestamp);
                stats.tail_hash = entry.entry_hash;
                stats.categories.record(entry.action_type);
                *stats.users.entry(entry.user_id).or_default() += 1;
                if let Some(smart_id) = entry.smart_id.filter(|s| !s.is_empty()) {
                    *stats.smart_ids.entry(smart_id).or_default() += 1;
                }
            }
        }
        Ok(stats)
    }

    fn range(&self, offset: u64, count: u64) -> LedgerResult<EntryRange> {
        self.store
            .read_range(offset, count)
            .map_err(LedgerError::Unavailable)
    }

    /// `(start, count)` pairs covering `0..total` in scan-sized steps.
    fn chunks(&self, total: u64) -> impl Iterator<Item = (u64, u64)> {
        let step = self.scan_chunk;
        (0..total)
            .step_by(step as usize)
            .map(move |start| (start, step.min(total - start)))
    }
}

fn collect(range: EntryRange) -> LedgerResult<Vec<LedgerEntry>> {
    range
        .collect::<Result<Vec<_>, _>>()
        .map_err(LedgerError::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use custodian_store::{InMemoryLedgerStore, StoreResult};
    use custodian_types::{EntryCandidate, Metadata};

    use crate::error::ErrorKind;

    fn candidate(n: i64, action_type: ActionType, user: &str) -> EntryCandidate {
        EntryCandidate {
            timestamp: Utc.timestamp_opt(1_772_366_400 + n * 60, 0).unwrap(),
            action_type,
            action: if n % 2 == 0 { "create" } else { "delete" }.into(),
            target: format!("Item-{n}"),
            details: format!("Details for item {n}"),
            user_id: user.into(),
            smart_id: (n % 3 == 0).then(|| format!("SID-{n:05}")),
            metadata: Metadata::new(),
            tab_source: format!("{}s", action_type.as_str()),
        }
    }

    /// Ten entries: node/module alternating, alice/bob alternating in pairs.
    fn engine(scan_chunk: u64) -> (Arc<InMemoryLedgerStore>, QueryEngine) {
        let store = Arc::new(InMemoryLedgerStore::new());
        for n in 0..10 {
            let action_type = if n % 2 == 0 {
                ActionType::Node
            } else {
                ActionType::Module
            };
            let user = if (n / 2) % 2 == 0 { "alice" } else { "bob" };
            store.append_entry(candidate(n, action_type, user)).unwrap();
        }
        let engine = QueryEngine::new(store.clone(), scan_chunk);
        (store, engine)
    }

    fn ids(entries: &[LedgerEntry]) -> Vec<u64> {
        entries.iter().map(|e| e.entry_id.get()).collect()
    }

    #[test]
    fn recent_is_newest_first() {
        let (_, engine) = engine(4);
        let recent = engine.get_recent(3).unwrap();
        assert_eq!(recent.total, 10);
        assert_eq!(ids(&recent.activities), vec![10, 9, 8]);

        let all = engine.get_recent(50).unwrap();
        assert_eq!(all.activities.len(), 10);
        assert!(engine.get_recent(0).unwrap().activities.is_empty());
    }

    #[test]
    fn recent_is_idempotent() {
        let (_, engine) = engine(4);
        assert_eq!(engine.get_recent(5).unwrap(), engine.get_recent(5).unwrap());
    }

    #[test]
    fn filter_by_type_and_action() {
        let (_, engine) = engine(3);
        let nodes = engine
            .get_filtered(&EntryFilter::new().action_type(ActionType::Node))
            .unwrap();
        assert_eq!(ids(&nodes.entries), vec![9, 7, 5, 3, 1]);

        let deletes = engine
            .get_filtered(&EntryFilter::new().action("delete").limit(2))
            .unwrap();
        assert_eq!(ids(&deletes.entries), vec![10, 8]);
    }

    #[test]
    fn filter_by_user_and_tab() {
        let (_, engine) = engine(3);
        let bob_modules = engine
            .get_filtered(&EntryFilter::new().user("bob").tab_source("modules"))
            .unwrap();
        assert_eq!(ids(&bob_modules.entries), vec![8, 4]);
    }

    #[test]
    fn search_is_case_insensitive_over_text_fields() {
        let (_, engine) = engine(3);
        let by_target = engine.get_filtered(&EntryFilter::new().search("item-7")).unwrap();
        assert_eq!(ids(&by_target.entries), vec![8]);

        let by_details = engine
            .get_filtered(&EntryFilter::new().search("DETAILS FOR ITEM 2"))
            .unwrap();
        assert_eq!(ids(&by_details.entries), vec![3]);

        let by_smart_id = engine.get_filtered(&EntryFilter::new().search("sid-0000")).unwrap();
        assert_eq!(ids(&by_smart_id.entries), vec![10, 7, 4, 1]);
    }

    #[test]
    fn time_bounds_are_inclusive() {
        let (_, engine) = engine(3);
        let base = 1_772_366_400;
        let filter = EntryFilter::new()
            .since(Utc.timestamp_opt(base + 2 * 60, 0).unwrap())
            .until(Utc.timestamp_opt(base + 4 * 60, 0).unwrap());
        assert_eq!(ids(&engine.get_filtered(&filter).unwrap().entries), vec![5, 4, 3]);
    }

    #[test]
    fn offset_paginates_matches() {
        let (_, engine) = engine(2);
        let page1 = engine.get_filtered(&EntryFilter::new().limit(4)).unwrap();
        let page2 = engine.get_filtered(&EntryFilter::new().offset(4).limit(4)).unwrap();
        let page3 = engine.get_filtered(&EntryFilter::new().offset(8).limit(4)).unwrap();
        assert_eq!(ids(&page1.entries), vec![10, 9, 8, 7]);
        assert_eq!(ids(&page2.entries), vec![6, 5, 4, 3]);
        assert_eq!(ids(&page3.entries), vec![2, 1]);
    }

    #[test]
    fn filter_deserializes_with_defaults() {
        let filter: EntryFilter = serde_json::from_str(r#"{"action_type":"node"}"#).unwrap();
        assert_eq!(filter.action_type, Some(ActionType::Node));
        assert_eq!(filter.limit, DEFAULT_FILTER_LIMIT);
    }

    #[test]
    fn counts_and_entry_lookup() {
        let (_, engine) = engine(4);
        let counts = engine.get_counts().unwrap();
        assert_eq!(counts.nodes, 5);
        assert_eq!(counts.modules, 5);
        assert_eq!(counts.total, 10);

        let e = engine.get_entry(EntryId::new(4)).unwrap().unwrap();
        assert_eq!(e.target, "Item-3");
        assert!(engine.get_entry(EntryId::new(11)).unwrap().is_none());
    }

    #[test]
    fn verify_valid_chain_in_chunks() {
        for chunk in [1, 3, 10, 64] {
            let (_, engine) = engine(chunk);
            let report = engine.verify_integrity().unwrap();
            assert!(report.valid);
            assert_eq!(report.checked, 10);
            assert_eq!(report.total, 10);
            assert_eq!(report.broken_at, None);
        }
    }

    #[test]
    fn verify_empty_chain() {
        let engine = QueryEngine::new(Arc::new(InMemoryLedgerStore::new()), 8);
        let report = engine.verify_integrity().unwrap();
        assert!(report.valid);
        assert_eq!(report.checked, 0);
    }

    #[test]
    fn verify_reports_first_tampered_entry() {
        let (store, _) = engine(4);
        let mut entries = collect(store.read_range(0, 10).unwrap()).unwrap();
        entries[6].details = "nothing happened".into();

        let engine = QueryEngine::new(Arc::new(InMemoryLedgerStore::from_entries(entries)), 4);
        let report = engine.verify_integrity().unwrap();
        assert!(!report.valid);
        assert_eq!(report.broken_at, Some(EntryId::new(7)));
        assert_eq!(report.checked, 6);
        assert!(report.failure.unwrap().contains("entry_hash"));
    }

    #[test]
    fn stats_summarize_chain() {
        let (store, engine) = engine(3);
        let stats = engine.get_stats().unwrap();
        assert_eq!(stats.total_entries, 10);
        assert_eq!(stats.categories, store.category_counts().unwrap());
        assert_eq!(stats.tail_hash, store.read_tail_hash().unwrap());
        assert_eq!(stats.users["alice"], 6);
        assert_eq!(stats.users["bob"], 4);
        assert_eq!(stats.smart_ids.len(), 4);
        assert!(stats.first_timestamp < stats.last_timestamp);
    }

    struct BrokenStore;

    impl LedgerStore for BrokenStore {
        fn append_entry(&self, _: EntryCandidate) -> StoreResult<LedgerEntry> {
            Err(StoreError::Poisoned)
        }
        fn read_range(&self, _: u64, _: u64) -> StoreResult<EntryRange> {
            Err(StoreError::Io(std::io::Error::other("unreadable")))
        }
        fn read_tail_hash(&self) -> StoreResult<EntryHash> {
            Ok(GENESIS_HASH)
        }
        fn len(&self) -> StoreResult<u64> {
            Ok(3)
        }
        fn category_counts(&self) -> StoreResult<CategoryCounts> {
            Err(StoreError::Poisoned)
        }
    }

    #[test]
    fn unreadable_store_is_unavailable() {
        let engine = QueryEngine::new(Arc::new(BrokenStore), 8);
        assert_eq!(engine.get_recent(5).unwrap_err().kind(), ErrorKind::Unavailable);
        assert_eq!(engine.get_counts().unwrap_err().kind(), ErrorKind::Unavailable);
        assert_eq!(engine.verify_integrity().unwrap_err().kind(), ErrorKind::Unavailable);
        assert_eq!(
            engine.get_filtered(&EntryFilter::new()).unwrap_err().kind(),
            ErrorKind::Unavailable
        );
    }
}

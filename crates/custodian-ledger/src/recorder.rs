use std::sync::Arc;

use tracing::{info, warn};

use custodian_store::{CategoryCounts, FileLedgerStore, InMemoryLedgerStore, LedgerStore};
use custodian_types::LedgerEntry;

use crate::config::LedgerConfig;
use crate::coordinator::{AppendCoordinator, ChainTail};
use crate::error::LedgerResult;
use crate::query::{IntegrityReport, QueryEngine, RecentActivities};
use crate::request::ActionRequest;

/// The audit ledger.
///
/// One instance is shared (via `Arc`) by every subsystem that records
/// actions. Recording is serialized internally; queries run concurrently
/// with recording and with each other.
///
/// A collaborator should treat a successful [`record_action`] as the
/// precondition for committing its own change, and undo that change itself
/// if recording fails.
///
/// [`record_action`]: Custodian::record_action
pub struct Custodian {
    config: LedgerConfig,
    coordinator: AppendCoordinator,
    query: QueryEngine,
}

impl Custodian {
    /// Open (or create) the durable ledger described by `config`.
    pub fn open(config: LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        let path = config.ledger_path();
        let store = FileLedgerStore::open(&path, config.sync_mode)?;
        let damaged = store.damaged_offsets()?;
        if let Some(first) = damaged.first() {
            warn!(
                path = %path.display(),
                damaged = damaged.len(),
                first_offset = first,
                "ledger holds damaged records; recording is disabled"
            );
        }
        let ledger = Self::with_store(Arc::new(store), config)?;
        let tail = ledger.coordinator.tail()?;
        info!(
            path = %path.display(),
            entries = tail.length,
            tail = %tail.tail_hash.short_hex(),
            "ledger opened"
        );
        Ok(ledger)
    }

    /// A ledger that lives only in memory.
    pub fn in_memory(config: LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        Self::with_store(Arc::new(InMemoryLedgerStore::new()), config)
    }

    /// A ledger over any store implementation.
    pub fn with_store(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> LedgerResult<Self> {
        let query = QueryEngine::new(Arc::clone(&store), config.scan_chunk);
        let coordinator = AppendCoordinator::new(store, config.clone())?;
        Ok(Self {
            config,
            coordinator,
            query,
        })
    }

    /// Record one action and return the sealed entry.
    pub fn record_action(&self, request: ActionRequest) -> LedgerResult<LedgerEntry> {
        self.coordinator.record_action(request)
    }

    pub fn query(&self) -> &QueryEngine {
        &self.query
    }

    pub fn get_recent_activities(&self, limit: usize) -> LedgerResult<RecentActivities> {
        self.query.get_recent(limit)
    }

    pub fn get_counts(&self) -> LedgerResult<CategoryCounts> {
        self.query.get_counts()
    }

    pub fn verify_integrity(&self) -> LedgerResult<IntegrityReport> {
        self.query.verify_integrity()
    }

    /// Chain length and tail hash after the last successful append.
    pub fn tail(&self) -> LedgerResult<ChainTail> {
        self.coordinator.tail()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

//! Tamper-evident audit ledger.
//!
//! Every state-changing action taken through the dashboard is recorded as a
//! hash-chained [`LedgerEntry`]. Altering, removing or reordering a stored
//! entry breaks the chain, and [`Custodian::verify_integrity`] reports the
//! first entry where it breaks.
//!
//! # Components
//!
//! - [`Custodian`] -- the facade shared by all recording subsystems
//! - [`AppendCoordinator`] -- validates requests and serializes appends
//!   through a single bounded-wait gate
//! - [`QueryEngine`] -- recent activity, filtered search, counts, stats and
//!   chain verification, none of which block writers
//! - [`LedgerConfig`] -- TOML-loadable settings
//!
//! # Example
//!
//! ```no_run
//! use custodian_ledger::{ActionRequest, Custodian, LedgerConfig};
//!
//! let ledger = Custodian::open(LedgerConfig::default().with_data_dir("/var/lib/custodian"))?;
//! ledger.record_action(
//!     ActionRequest::node("register", "Node-7", "Registered Node from discovery", "alice")
//!         .with_smart_id("NOD-00007"),
//! )?;
//! assert!(ledger.verify_integrity()?.valid);
//! # Ok::<(), custodian_ledger::LedgerError>(())
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod query;
pub mod recorder;
pub mod request;

pub use config::LedgerConfig;
pub use coordinator::{AppendCoordinator, ChainTail};
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use query::{
    EntryFilter, FilteredEntries, IntegrityReport, LedgerStats, QueryEngine, RecentActivities,
};
pub use recorder::Custodian;
pub use request::ActionRequest;

// Re-export key types
pub use custodian_store::{CategoryCounts, SyncMode};
pub use custodian_types::{
    ActionType, EntryHash, EntryId, LedgerEntry, Metadata, MetadataValue, GENESIS_HASH,
};

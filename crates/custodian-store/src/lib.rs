//! Append-only storage for the Custodian audit ledger.
//!
//! A store owns the sealing step of the chain: given an [`EntryCandidate`]
//! it assigns the next id, links it to the current tail, hashes it with the
//! [`ChainHasher`], persists it and only then makes it visible to readers.
//!
//! # Storage Backends
//!
//! All backends implement the [`LedgerStore`] trait:
//!
//! - [`FileLedgerStore`] -- single segment file of CRC-framed records, fsynced
//!   on every append and recovered on open
//! - [`InMemoryLedgerStore`] -- `Vec`-backed store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Records are immutable once written; the file only ever grows.
//! 2. Write, sync, then publish. Readers never observe a record that is not
//!    durable.
//! 3. Per-category counts are published in the same critical section as the
//!    entry they count.
//! 4. Reads never take the append lock.
//! 5. All I/O errors are propagated, never silently ignored.
//!
//! [`EntryCandidate`]: custodian_types::EntryCandidate
//! [`ChainHasher`]: custodian_crypto::ChainHasher

pub mod codec;
pub mod counts;
pub mod error;
pub mod file;
pub mod memory;
pub mod range;
pub mod traits;

pub use counts::CategoryCounts;
pub use error::{StoreError, StoreResult};
pub use file::{FileLedgerStore, SyncMode};
pub use memory::InMemoryLedgerStore;
pub use range::EntryRange;
pub use traits::LedgerStore;

//! Foundation types for the Custodian audit ledger.
//!
//! Every state-changing action taken by the surrounding dashboard (nodes,
//! modules, domains, equipment) is recorded as a [`LedgerEntry`]. This crate
//! holds the data model shared by the hasher, the store, and the ledger
//! facade. It performs no I/O and no hashing.
//!
//! # Key Types
//!
//! - [`LedgerEntry`] — One immutable, hash-linked audit record
//! - [`EntryCandidate`] — An entry before it has been sealed onto the chain
//! - [`ActionType`] — Category of the recorded action
//! - [`EntryId`] — 1-based, gap-free sequence number
//! - [`EntryHash`] — 256-bit chain hash; [`GENESIS_HASH`] anchors the chain
//! - [`MetadataValue`] / [`Metadata`] — Ordered key/value annotations

pub mod action;
pub mod entry;
pub mod error;
pub mod hash;
pub mod id;
pub mod metadata;

pub use action::ActionType;
pub use entry::{EntryCandidate, EntryContent, LedgerEntry};
pub use error::TypeError;
pub use hash::{EntryHash, GENESIS_HASH};
pub use id::EntryId;
pub use metadata::{Metadata, MetadataValue};

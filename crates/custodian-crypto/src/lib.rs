//! Chain hashing for the Custodian audit ledger.
//!
//! Provides the canonical byte encoding of an entry, the domain-separated
//! BLAKE3 chain hash built on it, and a streaming verifier that walks a chain
//! from genesis and reports the first broken link.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod chain;
pub mod hasher;

pub use chain::{BreakKind, ChainBreak, ChainVerifier};
pub use hasher::ChainHasher;

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, warn};

use custodian_store::{LedgerStore, StoreError};
use custodian_types::{EntryHash, EntryId, LedgerEntry};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::request::ActionRequest;

/// Chain state owned by the append gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainTail {
    /// Number of entries in the chain.
    pub length: u64,
    /// Hash of the last entry, or `GENESIS_HASH` when empty.
    pub tail_hash: EntryHash,
}

impl ChainTail {
    /// Id the next appended entry will receive.
    pub fn next_id(&self) -> EntryId {
        EntryId::at_position(self.length)
    }
}

struct GateState {
    busy: bool,
    tail: ChainTail,
}

/// Serializes appends onto the chain.
///
/// Exactly one append is in flight at a time. The sequence
/// read tail -> compute hash -> write -> advance tail runs while holding the
/// gate; callers that cannot acquire it within `append_timeout` fail with
/// [`LedgerError::Concurrency`] without writing anything. Readers never touch
/// the gate.
pub struct AppendCoordinator {
    store: Arc<dyn LedgerStore>,
    config: LedgerConfig,
    gate: Mutex<GateState>,
    released: Condvar,
}

impl AppendCoordinator {
    /// Seed the chain state from the store's current tail.
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> LedgerResult<Self> {
        let tail = ChainTail {
            length: store.len()?,
            tail_hash: store.read_tail_hash()?,
        };
        Ok(Self {
            store,
            config,
            gate: Mutex::new(GateState { busy: false, tail }),
            released: Condvar::new(),
        })
    }

    /// Validate, timestamp, seal and durably append one action.
    pub fn record_action(&self, request: ActionRequest) -> LedgerResult<LedgerEntry> {
        request.validate(&self.config)?;

        let mut permit = self.acquire()?;
        let expected = permit.tail;

        let observed = ChainTail {
            length: self.store.len().map_err(LedgerError::Io)?,
            tail_hash: self.store.read_tail_hash().map_err(LedgerError::Io)?,
        };
        if observed != expected {
            error!(
                expected_len = expected.length,
                observed_len = observed.length,
                expected_tail = %expected.tail_hash.short_hex(),
                observed_tail = %observed.tail_hash.short_hex(),
                "store tail diverged from chain state"
            );
            return Err(LedgerError::Integrity {
                reason: format!(
                    "store tail is {} at length {}, expected {} at length {}",
                    observed.tail_hash.short_hex(),
                    observed.length,
                    expected.tail_hash.short_hex(),
                    expected.length
                ),
            });
        }

        let candidate = request.into_candidate(Utc::now());
        let entry = self.store.append_entry(candidate).map_err(|e| {
            error!(next_id = %expected.next_id(), error = %e, "append failed");
            match e {
                StoreError::Damaged { .. } => LedgerError::Integrity {
                    reason: e.to_string(),
                },
                other => LedgerError::Io(other),
            }
        })?;

        permit.tail = ChainTail {
            length: expected.length + 1,
            tail_hash: entry.entry_hash,
        };
        debug!(
            entry_id = %entry.entry_id,
            action_type = %entry.action_type,
            hash = %entry.entry_hash.short_hex(),
            "action recorded"
        );
        Ok(entry)
    }

    /// Current chain state as last advanced by this coordinator.
    pub fn tail(&self) -> LedgerResult<ChainTail> {
        Ok(self.lock_gate()?.tail)
    }

    fn acquire(&self) -> LedgerResult<GatePermit<'_>> {
        let started = Instant::now();
        let deadline = started + self.config.append_timeout();
        let mut state = self.lock_gate()?;

        while state.busy {
            let now = Instant::now();
            if now >= deadline {
                let waited_ms = started.elapsed().as_millis() as u64;
                warn!(waited_ms, "append gate timeout");
                return Err(LedgerError::Concurrency { waited_ms });
            }
            let (guard, _) = self
                .released
                .wait_timeout(state, deadline - now)
                .map_err(|_| LedgerError::GatePoisoned)?;
            state = guard;
        }

        state.busy = true;
        Ok(GatePermit {
            coordinator: self,
            tail: state.tail,
        })
    }

    fn lock_gate(&self) -> LedgerResult<MutexGuard<'_, GateState>> {
        self.gate.lock().map_err(|_| LedgerError::GatePoisoned)
    }
}

/// Exclusive right to append. Releasing it (including by unwinding) hands
/// the possibly advanced tail back to the gate and wakes one waiter.
struct GatePermit<'a> {
    coordinator: &'a AppendCoordinator,
    tail: ChainTail,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        let mut state = match self.coordinator.gate.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.tail = self.tail;
        state.busy = false;
        drop(state);
        self.coordinator.released.notify_one();
    }
}

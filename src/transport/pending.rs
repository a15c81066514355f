//! Pending command table.
//!
//! Maps each in-flight [`CommandId`] to the wait-slot its caller is awaiting.
//! Callers insert; the dispatch loop removes and resolves. Every access goes
//! through one short-lived mutex, and no lock is held while a caller waits.
//!
//! # Lifecycle
//!
//! ```text
//! register(id) ──► pending ──► resolve(id, outcome)   (response arrived)
//!                     │
//!                     ├──────► remove(id)             (caller gave up)
//!                     │
//!                     └──────► drain_all()            (connection died)
//! ```
//!
//! Once drained the table is closed for good and rejects new registrations
//! with [`Error::ConnectionClosed`].

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;

// ============================================================================
// Types
// ============================================================================

/// Sending half of a wait-slot. Written at most once.
type WaitSlot = oneshot::Sender<Result<Value>>;

/// Receiving half of a wait-slot, awaited by the issuing caller.
pub type WaitSlotReceiver = oneshot::Receiver<Result<Value>>;

#[derive(Default)]
struct PendingState {
    slots: FxHashMap<CommandId, WaitSlot>,
    closed: bool,
}

// ============================================================================
// PendingTable
// ============================================================================

/// In-flight commands keyed by identifier.
#[derive(Default)]
pub struct PendingTable {
    state: Mutex<PendingState>,
    limit: Option<usize>,
}

impl PendingTable {
    /// Creates an unbounded table.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table that holds at most `limit` entries.
    #[inline]
    #[must_use]
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            state: Mutex::default(),
            limit,
        }
    }

    /// Allocates a wait-slot under `id`.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] once the table has been drained
    /// - [`Error::DuplicateIdentifier`] if `id` is already pending
    /// - [`Error::TooManyPending`] if the configured limit is reached
    pub fn register(&self, id: CommandId) -> Result<WaitSlotReceiver> {
        let mut state = self.state.lock();

        if state.closed {
            return Err(Error::ConnectionClosed);
        }
        if state.slots.contains_key(&id) {
            return Err(Error::duplicate_identifier(id));
        }
        if let Some(limit) = self.limit
            && state.slots.len() >= limit
        {
            return Err(Error::too_many_pending(limit));
        }

        let (tx, rx) = oneshot::channel();
        state.slots.insert(id, tx);
        Ok(rx)
    }

    /// Delivers `outcome` to the caller waiting on `id`.
    ///
    /// Returns `false` and discards `outcome` when nothing is pending under
    /// `id` (late reply after a timeout, or a peer echoing unknown ids).
    pub fn resolve(&self, id: CommandId, outcome: Result<Value>) -> bool {
        let Some(slot) = self.state.lock().slots.remove(&id) else {
            return false;
        };

        // Receiver may be gone if the caller was cancelled mid-flight.
        let _ = slot.send(outcome);
        true
    }

    /// Forgets `id` without resolving it.
    pub fn remove(&self, id: CommandId) -> bool {
        self.state.lock().slots.remove(&id).is_some()
    }

    /// Closes the table and fails every pending caller with
    /// [`Error::ConnectionClosed`]. Returns how many were pending.
    pub fn drain_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.slots.drain().collect()
        };

        let count = drained.len();
        for (_, slot) in drained {
            let _ = slot.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending commands on shutdown");
        }
        count
    }

    /// Number of commands awaiting a response.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// Returns `true` if no command is awaiting a response.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().slots.is_empty()
    }

    /// Returns `true` once [`drain_all`](Self::drain_all) has run.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

// ============================================================================
// Tests
// ============================================================================

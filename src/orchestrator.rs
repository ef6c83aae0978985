//! Request/confirm/timeout orchestration.
//!
//! A component coordinating N sub-components' startup or shutdown enters
//! a *transient* state, fans one request out per sub-component and joins
//! on the confirmations by sequence number:
//!
//! ```text
//!            ┌── StartReq(seq 1) ──▶ sub A ──┐
//!  Starting ─┤                               ├─ cfm(seq) ─▶ join
//!            └── StartReq(seq 2) ──▶ sub B ──┘
//!                     │
//!                     └── state timer (deadline) ──▶ abort
//! ```
//!
//! All confirmations successful → `AllDone`, exactly once. Any failed
//! confirmation → immediate abort carrying the originator and reason.
//! Deadline expiry with outstanding sequences → abort with `Timeout`.
//! Late confirmations whose sequence is no longer tracked are discarded.
//! Same-kind requests arriving mid-transition are deferred and replayed
//! in original order when the transient state is exited, so no caller's
//! request is ever lost or processed early.

use log::{info, warn};

use crate::event::{Confirm, Event};

/// Maximum sub-components one orchestration fans out to.
pub const MAX_FANOUT: usize = 8;

/// Maximum requests parked while a transition is in flight.
pub const MAX_DEFERRED: usize = 8;

// ---------------------------------------------------------------------------
// Sequence numbers
// ---------------------------------------------------------------------------

/// Monotonically increasing per-component request sequence.
#[derive(Debug, Default)]
pub struct SequenceGen(u32);

impl SequenceGen {
    pub fn new() -> Self {
        Self(0)
    }

    /// Next sequence number. Starts at 1; zero is reserved for plain
    /// signals.
    pub fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }
}

// ---------------------------------------------------------------------------
// Join outcome
// ---------------------------------------------------------------------------

/// Result of feeding one confirmation into the join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    /// Matched; more confirmations outstanding.
    Pending,
    /// Matched and the outstanding set is now empty.
    AllDone,
    /// The confirmation reported an error; the fan-in has failed.
    Failed(Confirm),
    /// Sequence not tracked (late or foreign); discarded.
    Stale,
}

// ---------------------------------------------------------------------------
// Orchestration context
// ---------------------------------------------------------------------------

/// Book-keeping for one transient (starting/stopping) state.
///
/// Created empty; [`begin`](Orchestration::begin) resets it on entry to
/// the transient state and [`recall`](Orchestration::recall) drains the
/// deferred queue on exit. The outstanding set is empty before entry and
/// must reach empty (success) or abort before exit.
#[derive(Debug, Default)]
pub struct Orchestration {
    outstanding: heapless::Vec<u32, MAX_FANOUT>,
    saved_request: Option<Event>,
    deferred: heapless::Deque<Event, MAX_DEFERRED>,
}

impl Orchestration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the outstanding set for a fresh fan-out.
    pub fn begin(&mut self) {
        debug_assert!(self.outstanding.is_empty(), "fan-out started while one in flight");
        self.outstanding.clear();
    }

    /// Remember the inbound request this orchestration answers.
    pub fn save_request(&mut self, request: &Event) {
        self.saved_request = Some(*request);
    }

    /// The inbound request being served, if any.
    pub fn request(&self) -> Option<&Event> {
        self.saved_request.as_ref()
    }

    pub fn clear_request(&mut self) {
        self.saved_request = None;
    }

    /// Record an outgoing request's sequence number.
    pub fn expect(&mut self, seq: u32) {
        if self.outstanding.push(seq).is_err() {
            warn!("orchestration fan-out exceeds {MAX_FANOUT}, dropping seq {seq}");
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Feed one confirmation into the join.
    pub fn handle_confirm(&mut self, cfm: &Event) -> Join {
        let Some(confirm) = cfm.confirm() else {
            warn!("confirmation {:?} without payload, discarded", cfm.signal);
            return Join::Stale;
        };
        let Some(pos) = self.outstanding.iter().position(|&s| s == cfm.seq) else {
            info!("late confirmation seq {} from {:?}, discarded", cfm.seq, cfm.from);
            return Join::Stale;
        };
        self.outstanding.swap_remove(pos);
        if confirm.error.is_error() {
            self.outstanding.clear();
            return Join::Failed(confirm);
        }
        if self.outstanding.is_empty() {
            Join::AllDone
        } else {
            Join::Pending
        }
    }

    /// Abandon the in-flight fan-out (timeout path). Any confirmation
    /// arriving afterwards is stale by definition.
    pub fn abandon(&mut self) {
        self.outstanding.clear();
    }

    /// Park a request that arrived while the transition is in flight.
    pub fn defer(&mut self, event: &Event) {
        info!("deferring {:?} from {:?} until transition resolves", event.signal, event.from);
        if self.deferred.push_back(*event).is_err() {
            warn!("deferred queue full, dropping {:?}", event.signal);
        }
    }

    /// Drain deferred requests in original arrival order.
    pub fn recall(&mut self, mut repost: impl FnMut(Event)) {
        while let Some(event) = self.deferred.pop_front() {
            info!("recalling deferred {:?}", event.signal);
            repost(event);
        }
    }
}

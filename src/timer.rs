//! Per-component countdown timers.
//!
//! A [`Timer`] never blocks and never calls back: the owning component
//! advances it from the scheduler's virtual clock and, when `advance`
//! reports expiry, synthesizes the timer's signal into its own mailbox.
//! All delays in the core are modelled this way; there are no sleeps.

use log::trace;

use crate::event::{ComponentId, Signal};

/// One-shot or periodic countdown owned by exactly one component.
#[derive(Debug)]
pub struct Timer {
    signal: Signal,
    owner: ComponentId,
    remaining_ms: u32,
    /// Zero for one-shot timers.
    interval_ms: u32,
    armed: bool,
}

impl Timer {
    pub fn new(signal: Signal, owner: ComponentId) -> Self {
        Self { signal, owner, remaining_ms: 0, interval_ms: 0, armed: false }
    }

    /// Arm as a one-shot for `timeout_ms`. Restarts if already armed.
    pub fn start(&mut self, timeout_ms: u32) {
        trace!("{:?}/{:?}: timer start {}ms", self.owner, self.signal, timeout_ms);
        self.remaining_ms = timeout_ms;
        self.interval_ms = 0;
        self.armed = true;
    }

    /// Arm as a periodic timer firing every `period_ms`.
    pub fn restart_periodic(&mut self, period_ms: u32) {
        trace!("{:?}/{:?}: timer periodic {}ms", self.owner, self.signal, period_ms);
        self.remaining_ms = period_ms;
        self.interval_ms = period_ms;
        self.armed = true;
    }

    /// Disarm. A stopped timer never fires.
    pub fn stop(&mut self) {
        self.armed = false;
        self.remaining_ms = 0;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Milliseconds left until expiry, the pause/resume capture point.
    pub fn remaining_ms(&self) -> u32 {
        if self.armed { self.remaining_ms } else { 0 }
    }

    /// The signal synthesized on expiry.
    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// Advance by `elapsed_ms` of virtual time. Returns `true` exactly
    /// once per expiry; periodic timers re-arm, carrying any overshoot
    /// into the next period. Callers drive time in steps no larger than
    /// the shortest armed period.
    pub fn advance(&mut self, elapsed_ms: u32) -> bool {
        if !self.armed {
            return false;
        }
        if elapsed_ms < self.remaining_ms {
            self.remaining_ms -= elapsed_ms;
            return false;
        }
        let overshoot = elapsed_ms - self.remaining_ms;
        if self.interval_ms > 0 {
            self.remaining_ms = self.interval_ms - (overshoot % self.interval_ms);
        } else {
            self.armed = false;
            self.remaining_ms = 0;
        }
        true
    }
}

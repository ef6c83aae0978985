//! Active-object mailbox and outbox.
//!
//! Each component owns a [`Mailbox`] (its FIFO event queue) and is driven
//! by the executor under run-to-completion: one event is popped and fully
//! dispatched before the next, so a state handler never observes a second
//! event while still executing the first.
//!
//! ```text
//! ┌─────────────┐      ┌──────────────┐      ┌──────────────┐
//! │ console     │─────▶│              │      │  dispatch    │
//! │ timers      │─────▶│   Mailbox    │─────▶│  (one event  │──▶ Outbox
//! │ other AOs   │─────▶│   (FIFO)     │      │   at a time) │
//! └─────────────┘      └──────────────┘      └──────────────┘
//! ```
//!
//! Handlers never touch other components directly. Asynchronous sends
//! and display updates accumulate in an [`Outbox`] that the executor
//! routes after the handler returns. Synchronous dispatch into a sibling
//! region does not go through here at all: regions are *owned* by their
//! parent's context and dispatched as a nested call (see
//! `components::regions`), which is what keeps the synchronous call graph
//! acyclic by construction.

use log::warn;

use crate::display::DisplayMessage;
use crate::event::{ComponentId, Event};

/// Maximum pending events per component.
pub const MAILBOX_CAP: usize = 16;

/// Maximum events/messages produced by a single dispatch.
pub const OUTBOX_CAP: usize = 16;

// ---------------------------------------------------------------------------
// Mailbox
// ---------------------------------------------------------------------------

/// Fixed-capacity FIFO event queue owned by one component.
#[derive(Debug)]
pub struct Mailbox {
    owner: ComponentId,
    queue: heapless::Deque<Event, MAILBOX_CAP>,
}

impl Mailbox {
    pub fn new(owner: ComponentId) -> Self {
        Self { owner, queue: heapless::Deque::new() }
    }

    /// Enqueue an event. A full mailbox drops the event with a warning;
    /// posting never blocks.
    pub fn post(&mut self, event: Event) -> bool {
        match self.queue.push_back(event) {
            Ok(()) => true,
            Err(event) => {
                warn!("{:?}: mailbox full, dropping {:?}", self.owner, event.signal);
                false
            }
        }
    }

    /// Pop the next event in arrival order.
    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Side effects produced by one dispatch, routed by the executor after
/// the handler returns.
#[derive(Debug, Default)]
pub struct Outbox {
    events: heapless::Vec<Event, OUTBOX_CAP>,
    display: heapless::Vec<DisplayMessage, OUTBOX_CAP>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an asynchronous send to `event.to`.
    pub fn post(&mut self, event: Event) {
        if self.events.push(event).is_err() {
            warn!("outbox full, dropping {:?} to {:?}", event.signal, event.to);
        }
    }

    /// Queue a display update.
    pub fn display(&mut self, msg: DisplayMessage) {
        if self.display.push(msg).is_err() {
            warn!("outbox full, dropping display message");
        }
    }

    /// Take everything accumulated so far, leaving the outbox empty.
    pub fn take(
        &mut self,
    ) -> (heapless::Vec<Event, OUTBOX_CAP>, heapless::Vec<DisplayMessage, OUTBOX_CAP>) {
        (core::mem::take(&mut self.events), core::mem::take(&mut self.display))
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.display.is_empty()
    }
}

//! Orthogonal on/off regions: fan, lamp, turntable.
//!
//! Each region is an independent little HSM instance owned by the
//! microwave's context. It receives the same lifecycle (`init`) as its
//! owner and is driven *synchronously*: the microwave dispatches into a
//! region as a nested call from inside its own handlers, so a region's
//! state is settled before the caller's own exit logic continues.
//! Ownership makes that nesting safe: a region can never call back into
//! its owner.

use log::info;

use crate::active::Outbox;
use crate::event::{ComponentId, Event, Signal};
use crate::hsm::{Hsm, Response, StateDescriptor, StateId};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    Root,
    Off,
    On,
}

impl StateId for SwitchState {
    const COUNT: usize = 3;
    fn index(self) -> usize {
        self as usize
    }
}

/// Region context: identity, which signals switch it, and the actuator
/// line it models.
pub struct SwitchContext {
    id: ComponentId,
    on_signal: Signal,
    off_signal: Signal,
    active: bool,
}

fn switch_table() -> [StateDescriptor<SwitchContext, SwitchState>; 3] {
    [
        StateDescriptor {
            id: SwitchState::Root,
            name: "Root",
            parent: None,
            initial: Some(SwitchState::Off),
            on_enter: None,
            on_exit: None,
            // A redundant on/off request is a no-op, not a re-entry.
            on_event: |ctx, e, _| {
                if e.signal == ctx.on_signal || e.signal == ctx.off_signal {
                    Response::Handled
                } else {
                    Response::Unhandled
                }
            },
        },
        StateDescriptor {
            id: SwitchState::Off,
            name: "Off",
            parent: Some(SwitchState::Root),
            initial: None,
            on_enter: Some(|ctx, _| {
                ctx.active = false;
                info!("{:?}: off", ctx.id);
            }),
            on_exit: None,
            on_event: |ctx, e, _| {
                if e.signal == ctx.on_signal {
                    Response::Transition(SwitchState::On)
                } else {
                    Response::Unhandled
                }
            },
        },
        StateDescriptor {
            id: SwitchState::On,
            name: "On",
            parent: Some(SwitchState::Root),
            initial: None,
            on_enter: Some(|ctx, _| {
                ctx.active = true;
                info!("{:?}: on", ctx.id);
            }),
            on_exit: None,
            on_event: |ctx, e, _| {
                if e.signal == ctx.off_signal {
                    Response::Transition(SwitchState::Off)
                } else {
                    Response::Unhandled
                }
            },
        },
    ]
}

/// One fan/lamp/turntable region.
pub struct SwitchRegion {
    hsm: Hsm<SwitchContext, SwitchState, 3>,
    ctx: SwitchContext,
}

impl SwitchRegion {
    pub fn new(id: ComponentId, on_signal: Signal, off_signal: Signal) -> Result<Self> {
        let name = match id {
            ComponentId::Fan => "FAN",
            ComponentId::Lamp => "LAMP",
            ComponentId::Turntable => "TURNTABLE",
            _ => "REGION",
        };
        Ok(Self {
            hsm: Hsm::new(name, switch_table())?,
            ctx: SwitchContext { id, on_signal, off_signal, active: false },
        })
    }

    /// Run the region's initial transition. Called from the owner's
    /// root entry so the region shares its owner's lifecycle.
    pub fn init(&mut self, outbox: &mut Outbox) {
        self.hsm.init(&mut self.ctx, outbox);
    }

    /// Synchronous nested dispatch from the owning component.
    pub fn dispatch(&mut self, event: &Event, outbox: &mut Outbox) {
        self.hsm.dispatch(&mut self.ctx, event, outbox);
    }

    pub fn is_on(&self) -> bool {
        self.ctx.active
    }
}

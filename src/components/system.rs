//! Top-level supervisor.
//!
//! ```text
//!  Root ── Stopped ──▶ Starting ──▶ Started ──▶ Stopping ──▶ Stopped
//!                        │  ▲                     ▲
//!                        └──┴── failure/timeout ──┘
//! ```
//!
//! Starting and Stopping are transient orchestration states: entry fans a
//! start/stop request out to the microwave and the magnetron, the join on
//! their confirmations (see `orchestrator`) is reported back into the
//! machine as an internal `Done` or `Failed` event, and a state timer
//! bounds the whole transition. Failure or timeout while starting reports
//! the wrapped error to the requester and falls back through Stopping so
//! partially started components are wound down. A failure while stopping
//! means a component rejected a stop it must always accept; that is a
//! state-table defect, asserted in debug builds and logged in release
//! builds, and the supervisor stops regardless.
//!
//! Start/stop requests arriving mid-transition are deferred and replayed
//! in arrival order once the transient state is left.

use log::error;

use crate::active::{Mailbox, Outbox};
use crate::config::SystemConfig;
use crate::event::{ComponentId, Confirm, Event, Payload, Signal};
use crate::hsm::{Hsm, Response, StateDescriptor, StateId};
use crate::orchestrator::{Join, Orchestration, SequenceGen};
use crate::timer::Timer;
use crate::{ErrorCode, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    Root,
    Stopped,
    Starting,
    Started,
    Stopping,
}

impl StateId for SystemState {
    const COUNT: usize = 5;
    fn index(self) -> usize {
        self as usize
    }
}

pub struct SystemContext {
    orc: Orchestration,
    seq: SequenceGen,
    state_timer: Timer,
    system_timeout_ms: u32,
}

impl SystemContext {
    /// Fan one request out to a sub-component and track its sequence.
    fn fan_out(&mut self, signal: Signal, to: ComponentId, outbox: &mut Outbox) {
        let seq = self.seq.next();
        outbox.post(Event::req(signal, to, ComponentId::System, seq));
        self.orc.expect(seq);
    }

    fn fan_out_all(&mut self, start: bool, outbox: &mut Outbox) {
        self.orc.begin();
        self.state_timer.start(self.system_timeout_ms);
        if start {
            self.fan_out(Signal::MicrowaveStartReq, ComponentId::Microwave, outbox);
            self.fan_out(Signal::MagnetronStartReq, ComponentId::Magnetron, outbox);
        } else {
            self.fan_out(Signal::MicrowaveStopReq, ComponentId::Microwave, outbox);
            self.fan_out(Signal::MagnetronStopReq, ComponentId::Magnetron, outbox);
        }
    }

    /// Feed a confirmation into the join and post the internal outcome
    /// event back to this component when the join resolves.
    fn join(&mut self, cfm: &Event, outbox: &mut Outbox) {
        match self.orc.handle_confirm(cfm) {
            Join::Pending | Join::Stale => {}
            Join::AllDone => outbox.post(Event::sig(
                Signal::Done,
                ComponentId::System,
                ComponentId::System,
            )),
            Join::Failed(confirm) => outbox.post(Event {
                signal: Signal::Failed,
                to: ComponentId::System,
                from: ComponentId::System,
                seq: 0,
                payload: Payload::Cfm(confirm),
            }),
        }
    }

    /// Answer the saved inbound request and forget it.
    fn reply(&mut self, signal: Signal, confirm: Confirm, outbox: &mut Outbox) {
        if let Some(req) = self.orc.request() {
            outbox.post(Event::cfm(signal, req.from, ComponentId::System, req.seq, confirm));
        }
        self.orc.clear_request();
    }

    fn leave_transient(&mut self, outbox: &mut Outbox) {
        self.state_timer.stop();
        self.orc.abandon();
        self.orc.recall(|e| outbox.post(e));
    }
}

type Row = StateDescriptor<SystemContext, SystemState>;

fn table() -> [Row; 5] {
    [
        Row {
            id: SystemState::Root,
            name: "Root",
            parent: None,
            initial: Some(SystemState::Stopped),
            on_enter: None,
            on_exit: None,
            on_event: |_, _, _| Response::Unhandled,
        },
        Row {
            id: SystemState::Stopped,
            name: "Stopped",
            parent: Some(SystemState::Root),
            initial: None,
            on_enter: None,
            on_exit: None,
            on_event: |ctx, e, outbox| match e.signal {
                Signal::SystemStartReq => {
                    ctx.orc.save_request(e);
                    Response::Transition(SystemState::Starting)
                }
                Signal::SystemStopReq => {
                    // Already stopped.
                    outbox.post(Event::cfm(
                        Signal::SystemStopCfm,
                        e.from,
                        ComponentId::System,
                        e.seq,
                        Confirm::success(ComponentId::System),
                    ));
                    Response::Handled
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: SystemState::Starting,
            name: "Starting",
            parent: Some(SystemState::Root),
            initial: None,
            on_enter: Some(|ctx, outbox| {
                ctx.fan_out_all(true, outbox);
            }),
            on_exit: Some(SystemContext::leave_transient),
            on_event: |ctx, e, outbox| match e.signal {
                Signal::MicrowaveStartCfm | Signal::MagnetronStartCfm => {
                    ctx.join(e, outbox);
                    Response::Handled
                }
                Signal::Done => {
                    ctx.reply(
                        Signal::SystemStartCfm,
                        Confirm::success(ComponentId::System),
                        outbox,
                    );
                    Response::Transition(SystemState::Started)
                }
                Signal::Failed => {
                    // Wrap the sub-component's error, preserving origin.
                    let confirm = e.confirm().unwrap_or(Confirm::failure(
                        ErrorCode::Unspecified,
                        ComponentId::System,
                        "failure without detail",
                    ));
                    ctx.reply(Signal::SystemStartCfm, confirm, outbox);
                    // Wind partially started components back down.
                    Response::Transition(SystemState::Stopping)
                }
                Signal::StateTimer => {
                    ctx.reply(
                        Signal::SystemStartCfm,
                        Confirm::failure(
                            ErrorCode::Timeout,
                            ComponentId::System,
                            "start deadline expired",
                        ),
                        outbox,
                    );
                    Response::Transition(SystemState::Stopping)
                }
                Signal::SystemStartReq | Signal::SystemStopReq => {
                    ctx.orc.defer(e);
                    Response::Handled
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: SystemState::Started,
            name: "Started",
            parent: Some(SystemState::Root),
            initial: None,
            on_enter: None,
            on_exit: None,
            on_event: |ctx, e, outbox| match e.signal {
                Signal::SystemStopReq => {
                    ctx.orc.save_request(e);
                    Response::Transition(SystemState::Stopping)
                }
                Signal::SystemStartReq => {
                    outbox.post(Event::cfm(
                        Signal::SystemStartCfm,
                        e.from,
                        ComponentId::System,
                        e.seq,
                        Confirm::failure(
                            ErrorCode::StateError,
                            ComponentId::System,
                            "already started",
                        ),
                    ));
                    Response::Handled
                }
                // Door indications pass through to the appliance.
                Signal::ExtDoorOpen | Signal::ExtDoorClosed => {
                    outbox.post(Event::sig(e.signal, ComponentId::Microwave, e.from));
                    Response::Handled
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: SystemState::Stopping,
            name: "Stopping",
            parent: Some(SystemState::Root),
            initial: None,
            on_enter: Some(|ctx, outbox| {
                ctx.fan_out_all(false, outbox);
            }),
            on_exit: Some(SystemContext::leave_transient),
            on_event: |ctx, e, outbox| match e.signal {
                Signal::MicrowaveStopCfm | Signal::MagnetronStopCfm => {
                    ctx.join(e, outbox);
                    Response::Handled
                }
                Signal::Done => {
                    ctx.reply(
                        Signal::SystemStopCfm,
                        Confirm::success(ComponentId::System),
                        outbox,
                    );
                    Response::Transition(SystemState::Stopped)
                }
                Signal::Failed => {
                    // A stop must always be accepted; a rejection is a
                    // state-table defect.
                    let confirm = e.confirm().unwrap_or(Confirm::failure(
                        ErrorCode::Unspecified,
                        ComponentId::System,
                        "failure without detail",
                    ));
                    debug_assert!(false, "stop rejected by {:?}: {}", confirm.origin, confirm.reason);
                    error!(
                        "SYSTEM: stop rejected by {:?} ({}), stopping anyway",
                        confirm.origin, confirm.reason
                    );
                    ctx.reply(Signal::SystemStopCfm, confirm, outbox);
                    Response::Transition(SystemState::Stopped)
                }
                Signal::StateTimer => {
                    error!("SYSTEM: stop deadline expired, stopping anyway");
                    ctx.reply(
                        Signal::SystemStopCfm,
                        Confirm::failure(
                            ErrorCode::Timeout,
                            ComponentId::System,
                            "stop deadline expired",
                        ),
                        outbox,
                    );
                    Response::Transition(SystemState::Stopped)
                }
                Signal::SystemStartReq | Signal::SystemStopReq => {
                    ctx.orc.defer(e);
                    Response::Handled
                }
                _ => Response::Unhandled,
            },
        },
    ]
}

/// The supervisor active object.
pub struct System {
    hsm: Hsm<SystemContext, SystemState, 5>,
    ctx: SystemContext,
    mailbox: Mailbox,
}

impl System {
    pub fn new(config: &SystemConfig) -> Result<Self> {
        Ok(Self {
            hsm: Hsm::new("SYSTEM", table())?,
            ctx: SystemContext {
                orc: Orchestration::new(),
                seq: SequenceGen::new(),
                state_timer: Timer::new(Signal::StateTimer, ComponentId::System),
                system_timeout_ms: config.system_timeout_ms,
            },
            mailbox: Mailbox::new(ComponentId::System),
        })
    }

    pub fn init(&mut self, outbox: &mut Outbox) {
        self.hsm.init(&mut self.ctx, outbox);
    }

    pub fn post(&mut self, event: Event) {
        self.mailbox.post(event);
    }

    /// Dispatch the next queued event, if any.
    pub fn step(&mut self, outbox: &mut Outbox) -> bool {
        match self.mailbox.pop() {
            Some(event) => {
                self.hsm.dispatch(&mut self.ctx, &event, outbox);
                true
            }
            None => false,
        }
    }

    /// Advance virtual time; timer expiry re-enters through the mailbox.
    pub fn advance(&mut self, elapsed_ms: u32) {
        if self.ctx.state_timer.advance(elapsed_ms) {
            self.mailbox.post(Event::timer(Signal::StateTimer, ComponentId::System));
        }
    }

    pub fn state(&self) -> SystemState {
        self.hsm.state()
    }
}

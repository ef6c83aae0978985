//! Magnetron duty-cycle controller.
//!
//! Converts a requested power level (1-10) into a fixed-period on/off
//! actuation pattern:
//!
//! ```text
//!  Root ── Stopped
//!      └── Started ── Off
//!              ├───── On ── Running      (actuator energized)
//!              │        └── NotRunning   (actuator idle)
//!              └───── Paused             (history resumes Running/NotRunning)
//! ```
//!
//! The power level arrives out-of-band through the single-slot pipe,
//! read exactly once per on-request. `on_time = cycle * level / 10`
//! (integer arithmetic, exact: level 1 gives `cycle/10`, level 10 the
//! full cycle, and `on_time + off_time == cycle` always). While on, the
//! cycle timer alternates Running and NotRunning indefinitely. Pause
//! captures the timer's remaining count and lets the engine's history
//! marker remember which half of the wave was active; resume re-arms the
//! exact remainder and restores that half.

use std::sync::Arc;

use log::{info, warn};

use crate::active::{Mailbox, Outbox};
use crate::config::SystemConfig;
use crate::display::MAX_POWER;
use crate::event::{ComponentId, Confirm, Event, Signal};
use crate::hsm::{Hsm, Response, StateDescriptor, StateId};
use crate::pipe::SlotPipe;
use crate::timer::Timer;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagnetronState {
    Root,
    Stopped,
    Started,
    Off,
    On,
    Running,
    NotRunning,
    Paused,
}

impl StateId for MagnetronState {
    const COUNT: usize = 8;
    fn index(self) -> usize {
        self as usize
    }
}

pub struct MagnetronContext {
    cycle_ms: u32,
    on_time_ms: u32,
    off_time_ms: u32,
    /// Timer count captured on pause, re-armed on resume.
    remaining_ms: u32,
    cycle_timer: Timer,
    pipe: Arc<SlotPipe>,
    energized: bool,
}

impl MagnetronContext {
    fn cfm(&self, signal: Signal, req: &Event, confirm: Confirm) -> Event {
        Event::cfm(signal, req.from, ComponentId::Magnetron, req.seq, confirm)
    }
}

type Row = StateDescriptor<MagnetronContext, MagnetronState>;

fn table() -> [Row; 8] {
    [
        Row {
            id: MagnetronState::Root,
            name: "Root",
            parent: None,
            initial: Some(MagnetronState::Stopped),
            on_enter: None,
            on_exit: None,
            on_event: |ctx, e, outbox| match e.signal {
                // A start request bubbling up here means we are already
                // started: reject, terminal for that request.
                Signal::MagnetronStartReq => {
                    outbox.post(ctx.cfm(
                        Signal::MagnetronStartCfm,
                        e,
                        Confirm::failure(
                            crate::ErrorCode::StateError,
                            ComponentId::Magnetron,
                            "already started",
                        ),
                    ));
                    Response::Handled
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MagnetronState::Stopped,
            name: "Stopped",
            parent: Some(MagnetronState::Root),
            initial: None,
            on_enter: None,
            on_exit: None,
            on_event: |ctx, e, outbox| match e.signal {
                Signal::MagnetronStartReq => {
                    outbox.post(ctx.cfm(
                        Signal::MagnetronStartCfm,
                        e,
                        Confirm::success(ComponentId::Magnetron),
                    ));
                    Response::Transition(MagnetronState::Started)
                }
                Signal::MagnetronStopReq => {
                    // Already stopped: confirm success idempotently.
                    outbox.post(ctx.cfm(
                        Signal::MagnetronStopCfm,
                        e,
                        Confirm::success(ComponentId::Magnetron),
                    ));
                    Response::Handled
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MagnetronState::Started,
            name: "Started",
            parent: Some(MagnetronState::Root),
            initial: Some(MagnetronState::Off),
            on_enter: None,
            on_exit: None,
            on_event: |ctx, e, outbox| match e.signal {
                Signal::MagnetronStopReq => {
                    ctx.cycle_timer.stop();
                    outbox.post(ctx.cfm(
                        Signal::MagnetronStopCfm,
                        e,
                        Confirm::success(ComponentId::Magnetron),
                    ));
                    Response::Transition(MagnetronState::Stopped)
                }
                Signal::MagnetronOffReq => Response::Transition(MagnetronState::Off),
                Signal::MagnetronOnReq => match ctx.pipe.read() {
                    None => {
                        warn!("MAGNETRON: on-request with empty pipe, ignored");
                        Response::Handled
                    }
                    Some(level) => {
                        let level = if (1..=u32::from(MAX_POWER)).contains(&level) {
                            level
                        } else {
                            warn!("MAGNETRON: power level {level} out of range, clamped");
                            level.clamp(1, u32::from(MAX_POWER))
                        };
                        ctx.on_time_ms = ctx.cycle_ms * level / u32::from(MAX_POWER);
                        ctx.off_time_ms = ctx.cycle_ms - ctx.on_time_ms;
                        info!(
                            "MAGNETRON: power level {level}, on {}ms / off {}ms",
                            ctx.on_time_ms, ctx.off_time_ms
                        );
                        ctx.cycle_timer.start(ctx.on_time_ms);
                        Response::Transition(MagnetronState::On)
                    }
                },
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MagnetronState::Off,
            name: "Off",
            parent: Some(MagnetronState::Started),
            initial: None,
            on_enter: Some(|ctx, _| {
                ctx.cycle_timer.stop();
                ctx.energized = false;
            }),
            on_exit: None,
            on_event: |_, _, _| Response::Unhandled,
        },
        Row {
            id: MagnetronState::On,
            name: "On",
            parent: Some(MagnetronState::Started),
            initial: Some(MagnetronState::Running),
            on_enter: None,
            on_exit: None,
            on_event: |ctx, e, _| match e.signal {
                Signal::MagnetronPauseReq => {
                    ctx.remaining_ms = ctx.cycle_timer.remaining_ms();
                    ctx.cycle_timer.stop();
                    Response::Transition(MagnetronState::Paused)
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MagnetronState::Running,
            name: "Running",
            parent: Some(MagnetronState::On),
            initial: None,
            on_enter: Some(|ctx, _| {
                ctx.energized = true;
            }),
            on_exit: None,
            on_event: |ctx, e, _| match e.signal {
                Signal::MagnetronCycleTimer => {
                    // Full power has no off phase.
                    if ctx.off_time_ms == 0 {
                        ctx.cycle_timer.start(ctx.on_time_ms);
                        Response::Handled
                    } else {
                        ctx.cycle_timer.start(ctx.off_time_ms);
                        Response::Transition(MagnetronState::NotRunning)
                    }
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MagnetronState::NotRunning,
            name: "NotRunning",
            parent: Some(MagnetronState::On),
            initial: None,
            on_enter: Some(|ctx, _| {
                ctx.energized = false;
            }),
            on_exit: None,
            on_event: |ctx, e, _| match e.signal {
                Signal::MagnetronCycleTimer => {
                    ctx.cycle_timer.start(ctx.on_time_ms);
                    Response::Transition(MagnetronState::Running)
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MagnetronState::Paused,
            name: "Paused",
            parent: Some(MagnetronState::Started),
            initial: None,
            on_enter: Some(|ctx, _| {
                ctx.energized = false;
            }),
            on_exit: None,
            on_event: |ctx, e, _| match e.signal {
                Signal::MagnetronOnReq => {
                    ctx.cycle_timer.start(ctx.remaining_ms);
                    Response::TransitionToHistory(MagnetronState::On)
                }
                _ => Response::Unhandled,
            },
        },
    ]
}

/// The magnetron active object.
pub struct Magnetron {
    hsm: Hsm<MagnetronContext, MagnetronState, 8>,
    ctx: MagnetronContext,
    mailbox: Mailbox,
}

impl Magnetron {
    pub fn new(config: &SystemConfig, pipe: Arc<SlotPipe>) -> Result<Self> {
        Ok(Self {
            hsm: Hsm::new("MAGNETRON", table())?,
            ctx: MagnetronContext {
                cycle_ms: config.magnetron_cycle_ms,
                on_time_ms: 0,
                off_time_ms: 0,
                remaining_ms: 0,
                cycle_timer: Timer::new(Signal::MagnetronCycleTimer, ComponentId::Magnetron),
                pipe,
                energized: false,
            },
            mailbox: Mailbox::new(ComponentId::Magnetron),
        })
    }

    pub fn init(&mut self, outbox: &mut Outbox) {
        self.hsm.init(&mut self.ctx, outbox);
    }

    pub fn post(&mut self, event: Event) {
        self.mailbox.post(event);
    }

    /// Dispatch the next queued event, if any. One event per call,
    /// run-to-completion.
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
        if self.ctx.cycle_timer.advance(elapsed_ms) {
            self.mailbox
                .post(Event::timer(Signal::MagnetronCycleTimer, ComponentId::Magnetron));
        }
    }

    pub fn state(&self) -> MagnetronState {
        self.hsm.state()
    }

    /// `true` while the actuator is energized (the Running half-wave).
    pub fn is_energized(&self) -> bool {
        self.ctx.energized
    }

    #[cfg(test)]
    fn on_off_times(&self) -> (u32, u32) {
        (self.ctx.on_time_ms, self.ctx.off_time_ms)
    }

    #[cfg(test)]
    fn timer_remaining(&self) -> u32 {
        self.ctx.cycle_timer.remaining_ms()
    }
}

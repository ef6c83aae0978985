//! Appliance controller: clock, digit entry, cook/kitchen countdown.
//!
//! ```text
//!  Root ── Stopped
//!      └── Started
//!            ├── DisplayClock ── SetClock ── ClockSelectHourTens
//!            │                          ├── ClockSelectHourOnes
//!            │                          ├── ClockSelectMinuteTens
//!            │                          └── ClockSelectMinuteOnes
//!            ├── SetCookTimer ── SetCookTimerInitial
//!            │               └── SetCookTimerFinal
//!            ├── SetPowerLevel
//!            ├── SetKitchenTimer
//!            └── DisplayTimer ── DisplayTimerRunning
//!                            └── DisplayTimerPaused
//! ```
//!
//! The fan, lamp and turntable are orthogonal regions owned by the
//! context and driven synchronously from inside handlers (see
//! `components::regions`). The magnetron is a separate active object:
//! on/off/pause requests go out asynchronously through the outbox, and
//! the selected power level is handed over through the single-slot pipe,
//! written here and consumed exactly once per magnetron-on request.
//!
//! The half-second tick does double duty: entry states toggle the blink
//! cue and let the tick bubble on, so `Started` can keep counting it
//! toward the once-a-minute wall-clock increment (120 ticks).

use std::sync::Arc;

use log::warn;

use crate::active::{Mailbox, Outbox};
use crate::config::SystemConfig;
use crate::display::{
    seconds_to_time, shift_left_insert, time_to_seconds, DisplayMessage, DisplaySignal,
    DisplayState, DisplayTime, Time, UpdateKind, MAX_POWER,
};
use crate::event::{ComponentId, Confirm, Event, Payload, Signal};
use crate::hsm::{Hsm, Response, StateDescriptor, StateId};
use crate::pipe::SlotPipe;
use crate::timer::Timer;
use crate::Result;

/// Half-second ticks per wall-clock minute.
const TICKS_PER_MINUTE: u32 = 120;

/// Queued countdown segments (only cooking uses the second one).
const MAX_SEGMENTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicrowaveState {
    Root,
    Stopped,
    Started,
    DisplayClock,
    SetClock,
    ClockSelectHourTens,
    ClockSelectHourOnes,
    ClockSelectMinuteTens,
    ClockSelectMinuteOnes,
    SetCookTimer,
    SetCookTimerInitial,
    SetCookTimerFinal,
    SetPowerLevel,
    SetKitchenTimer,
    DisplayTimer,
    DisplayTimerRunning,
    DisplayTimerPaused,
}

impl StateId for MicrowaveState {
    const COUNT: usize = 17;
    fn index(self) -> usize {
        self as usize
    }
}

use crate::components::regions::SwitchRegion;

pub struct MicrowaveContext {
    // Entry bookkeeping.
    /// `true` while the selected program heats (kitchen timer: `false`).
    cook: bool,
    /// `true` while heating is actually engaged.
    cooking: bool,
    /// Next entry into Running resumes a paused magnetron: skip the
    /// pipe write, the magnetron holds its captured remainder.
    resume: bool,
    door_closed: bool,
    clock: Time,
    /// Clock digits being edited; committed by the clock key.
    proposed: Time,
    half_second_counts: u32,
    blink_on: bool,
    segments: [DisplayTime; MAX_SEGMENTS],
    /// Segment currently receiving digits.
    entry_index: usize,
    /// Segment currently counting down.
    timer_index: usize,
    seconds_remaining: u32,

    second_timer: Timer,
    half_second_timer: Timer,

    fan: SwitchRegion,
    lamp: SwitchRegion,
    turntable: SwitchRegion,
    pipe: Arc<SlotPipe>,

    second_timer_ms: u32,
    half_second_timer_ms: u32,
    quick_start_secs: u32,
    default_power_level: u8,
}

impl MicrowaveContext {
    fn cfm(&self, signal: Signal, req: &Event, confirm: Confirm) -> Event {
        Event::cfm(signal, req.from, ComponentId::Microwave, req.seq, confirm)
    }

    // -- synchronous region control ----------------------------------------

    fn region(&mut self, id: ComponentId) -> &mut SwitchRegion {
        match id {
            ComponentId::Fan => &mut self.fan,
            ComponentId::Lamp => &mut self.lamp,
            _ => &mut self.turntable,
        }
    }

    fn switch(&mut self, id: ComponentId, signal: Signal, outbox: &mut Outbox) {
        let event = Event::sig(signal, id, ComponentId::Microwave);
        self.region(id).dispatch(&event, outbox);
    }

    fn lamp_follow(&mut self, outbox: &mut Outbox) {
        // Lamp on while the door is open or food is cooking.
        let signal = if !self.door_closed || self.cooking {
            Signal::LampOnReq
        } else {
            Signal::LampOffReq
        };
        self.switch(ComponentId::Lamp, signal, outbox);
    }

    // -- display helpers ----------------------------------------------------

    fn show_state(&self, state: DisplayState, outbox: &mut Outbox) {
        outbox.display(DisplayMessage::state(state));
    }

    fn show_clock(&self, outbox: &mut Outbox) {
        outbox.display(DisplayMessage::update(UpdateKind::Clock, self.clock.to_payload()));
    }

    fn show_segment(&self, index: usize, outbox: &mut Outbox) {
        outbox.display(DisplayMessage::update(
            UpdateKind::DisplayTimer,
            self.segments[index].time.to_payload(),
        ));
    }

    fn show_power(&self, outbox: &mut Outbox) {
        let level = self.segments[self.entry_index].power_level;
        outbox.display(DisplayMessage::update(
            UpdateKind::PowerLevel,
            [0, 0, level / 10, level % 10],
        ));
    }

    fn blink_tick(&mut self, outbox: &mut Outbox) {
        self.blink_on = !self.blink_on;
        let cue = if self.blink_on { DisplaySignal::BlinkOn } else { DisplaySignal::BlinkOff };
        outbox.display(DisplayMessage::signal(cue));
    }

    // -- wall clock ---------------------------------------------------------

    /// Advance the 12-hour clock (1:00-12:59) by one minute.
    fn increment_clock(&mut self) {
        let Time { left_tens, left_ones, right_tens, right_ones } = self.clock;
        let hour = u32::from(left_tens) * 10 + u32::from(left_ones);
        let minute = u32::from(right_tens) * 10 + u32::from(right_ones) + 1;
        let (hour, minute) = if minute == 60 {
            (if hour == 12 { 1 } else { hour + 1 }, 0)
        } else {
            (hour, minute)
        };
        self.clock = Time::new(
            (hour / 10) as u8,
            (hour % 10) as u8,
            (minute / 10) as u8,
            (minute % 10) as u8,
        );
    }

    // -- program entry ------------------------------------------------------

    fn reset_entry(&mut self, cook: bool) {
        self.cook = cook;
        self.entry_index = 0;
        self.timer_index = 0;
        self.segments = [DisplayTime::cleared(self.default_power_level); MAX_SEGMENTS];
    }

    fn enter_digit(&mut self, digit: u8, outbox: &mut Outbox) {
        shift_left_insert(&mut self.segments[self.entry_index].time, digit);
        self.show_segment(self.entry_index, outbox);
    }

    fn quick_start(&mut self) {
        self.reset_entry(true);
        self.segments[0] =
            DisplayTime { time: seconds_to_time(self.quick_start_secs), power_level: MAX_POWER };
    }

    fn add_quick_start(&mut self, outbox: &mut Outbox) {
        self.seconds_remaining =
            (self.seconds_remaining + self.quick_start_secs).min(crate::display::MAX_SECONDS);
        self.segments[self.timer_index].time = seconds_to_time(self.seconds_remaining);
        self.show_segment(self.timer_index, outbox);
    }

    fn post_magnetron(&self, signal: Signal, outbox: &mut Outbox) {
        outbox.post(Event::sig(signal, ComponentId::Magnetron, ComponentId::Microwave));
    }

    fn write_power(&mut self) {
        let level = self.segments[self.timer_index].power_level;
        if !self.pipe.write(u32::from(level)) {
            warn!("MICROWAVE: power pipe full, level {level} not handed over");
        }
    }

    /// One 1 Hz countdown step. Returns `false` when every queued
    /// segment is exhausted and the machine should fall back to the
    /// clock display.
    fn decrement_timer(&mut self, outbox: &mut Outbox) -> bool {
        self.seconds_remaining -= 1;
        self.segments[self.timer_index].time = seconds_to_time(self.seconds_remaining);
        if self.seconds_remaining > 0 {
            self.show_segment(self.timer_index, outbox);
            return true;
        }
        self.second_timer.stop();
        if self.cook {
            self.post_magnetron(Signal::MagnetronOffReq, outbox);
        }
        // Only cooking queues a second segment.
        self.timer_index += 1;
        if self.cook && self.timer_index < MAX_SEGMENTS {
            self.seconds_remaining = time_to_seconds(&self.segments[self.timer_index].time)
                .min(crate::display::MAX_SECONDS);
            if self.seconds_remaining > 0 {
                self.write_power();
                self.second_timer.restart_periodic(self.second_timer_ms);
                self.post_magnetron(Signal::MagnetronOnReq, outbox);
                self.show_segment(self.timer_index, outbox);
                return true;
            }
        }
        false
    }

    fn digit(event: &Event) -> Option<u8> {
        match event.payload {
            Payload::Digit(d) => Some(d),
            _ => None,
        }
    }

    /// Start is ignored until a non-zero time has been keyed in.
    fn entry_armable(&self) -> bool {
        time_to_seconds(&self.segments[0].time) > 0
    }
}

type Row = StateDescriptor<MicrowaveContext, MicrowaveState>;

fn table() -> [Row; 17] {
    [
        Row {
            id: MicrowaveState::Root,
            name: "Root",
            parent: None,
            initial: Some(MicrowaveState::Stopped),
            on_enter: Some(|ctx, outbox| {
                // Regions share their owner's lifecycle.
                ctx.fan.init(outbox);
                ctx.lamp.init(outbox);
                ctx.turntable.init(outbox);
            }),
            on_exit: None,
            on_event: |ctx, e, outbox| match e.signal {
                Signal::MicrowaveStartReq => {
                    outbox.post(ctx.cfm(
                        Signal::MicrowaveStartCfm,
                        e,
                        Confirm::failure(
                            crate::ErrorCode::StateError,
                            ComponentId::Microwave,
                            "already started",
                        ),
                    ));
                    Response::Handled
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::Stopped,
            name: "Stopped",
            parent: Some(MicrowaveState::Root),
            initial: None,
            on_enter: None,
            on_exit: None,
            on_event: |ctx, e, outbox| match e.signal {
                Signal::MicrowaveStartReq => {
                    outbox.post(ctx.cfm(
                        Signal::MicrowaveStartCfm,
                        e,
                        Confirm::success(ComponentId::Microwave),
                    ));
                    Response::Transition(MicrowaveState::Started)
                }
                Signal::MicrowaveStopReq => {
                    outbox.post(ctx.cfm(
                        Signal::MicrowaveStopCfm,
                        e,
                        Confirm::success(ComponentId::Microwave),
                    ));
                    Response::Handled
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::Started,
            name: "Started",
            parent: Some(MicrowaveState::Root),
            initial: Some(MicrowaveState::DisplayClock),
            on_enter: Some(|ctx, _| {
                ctx.half_second_counts = 0;
                ctx.half_second_timer.restart_periodic(ctx.half_second_timer_ms);
            }),
            on_exit: Some(|ctx, _| {
                ctx.half_second_timer.stop();
                ctx.second_timer.stop();
            }),
            on_event: |ctx, e, outbox| match e.signal {
                Signal::MicrowaveStopReq => {
                    ctx.switch(ComponentId::Fan, Signal::FanOffReq, outbox);
                    ctx.switch(ComponentId::Lamp, Signal::LampOffReq, outbox);
                    ctx.switch(ComponentId::Turntable, Signal::TurntableOffReq, outbox);
                    outbox.post(ctx.cfm(
                        Signal::MicrowaveStopCfm,
                        e,
                        Confirm::success(ComponentId::Microwave),
                    ));
                    Response::Transition(MicrowaveState::Stopped)
                }
                Signal::HalfSecondTimer => {
                    ctx.half_second_counts += 1;
                    if ctx.half_second_counts == TICKS_PER_MINUTE {
                        ctx.half_second_counts = 0;
                        ctx.increment_clock();
                        ctx.show_clock(outbox);
                    }
                    Response::Handled
                }
                Signal::ExtDoorOpen => {
                    ctx.door_closed = false;
                    ctx.lamp_follow(outbox);
                    Response::Handled
                }
                Signal::ExtDoorClosed => {
                    ctx.door_closed = true;
                    ctx.lamp_follow(outbox);
                    Response::Handled
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::DisplayClock,
            name: "DisplayClock",
            parent: Some(MicrowaveState::Started),
            initial: None,
            on_enter: Some(|ctx, outbox| {
                ctx.show_state(DisplayState::DisplayClock, outbox);
                ctx.show_clock(outbox);
            }),
            on_exit: None,
            on_event: |ctx, e, _| match e.signal {
                Signal::ExtClock => Response::Transition(MicrowaveState::SetClock),
                Signal::ExtCookTime => {
                    ctx.reset_entry(true);
                    Response::Transition(MicrowaveState::SetCookTimerInitial)
                }
                Signal::ExtKitchenTimer => {
                    ctx.reset_entry(false);
                    Response::Transition(MicrowaveState::SetKitchenTimer)
                }
                Signal::ExtStart if ctx.door_closed => {
                    // Quick start: default program, full power.
                    ctx.quick_start();
                    Response::Transition(MicrowaveState::DisplayTimer)
                }
                // Door open: the interlock keeps the magnetron off.
                Signal::ExtStart => Response::Handled,
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::SetClock,
            name: "SetClock",
            parent: Some(MicrowaveState::DisplayClock),
            initial: Some(MicrowaveState::ClockSelectHourTens),
            on_enter: Some(|ctx, _| {
                ctx.proposed = ctx.clock;
            }),
            on_exit: None,
            on_event: |ctx, e, outbox| match e.signal {
                Signal::HalfSecondTimer => {
                    ctx.blink_tick(outbox);
                    Response::Unhandled
                }
                Signal::ExtClock => {
                    // Commit the edited time. DisplayClock is not
                    // re-entered (it is the transition's ancestor), so
                    // refresh the display here.
                    ctx.clock = ctx.proposed;
                    ctx.half_second_counts = 0;
                    ctx.show_state(DisplayState::DisplayClock, outbox);
                    ctx.show_clock(outbox);
                    Response::Transition(MicrowaveState::DisplayClock)
                }
                Signal::ExtStop => {
                    ctx.show_state(DisplayState::DisplayClock, outbox);
                    ctx.show_clock(outbox);
                    Response::Transition(MicrowaveState::DisplayClock)
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::ClockSelectHourTens,
            name: "ClockSelectHourTens",
            parent: Some(MicrowaveState::SetClock),
            initial: None,
            on_enter: Some(|ctx, outbox| {
                ctx.show_state(DisplayState::ClockSelectHourTens, outbox);
            }),
            on_exit: None,
            on_event: |ctx, e, outbox| match MicrowaveContext::digit(e) {
                Some(d) if d <= 1 => {
                    ctx.proposed.left_tens = d;
                    outbox.display(DisplayMessage::signal(DisplaySignal::ModLeftTens));
                    Response::Transition(MicrowaveState::ClockSelectHourOnes)
                }
                Some(_) => Response::Handled,
                None => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::ClockSelectHourOnes,
            name: "ClockSelectHourOnes",
            parent: Some(MicrowaveState::SetClock),
            initial: None,
            on_enter: Some(|ctx, outbox| {
                ctx.show_state(DisplayState::ClockSelectHourOnes, outbox);
            }),
            on_exit: None,
            on_event: |ctx, e, outbox| match MicrowaveContext::digit(e) {
                // With hour tens 1 only 10-12 are reachable.
                Some(d) if ctx.proposed.left_tens == 0 || d <= 2 => {
                    ctx.proposed.left_ones = d;
                    outbox.display(DisplayMessage::signal(DisplaySignal::ModLeftOnes));
                    Response::Transition(MicrowaveState::ClockSelectMinuteTens)
                }
                Some(_) => Response::Handled,
                None => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::ClockSelectMinuteTens,
            name: "ClockSelectMinuteTens",
            parent: Some(MicrowaveState::SetClock),
            initial: None,
            on_enter: Some(|ctx, outbox| {
                ctx.show_state(DisplayState::ClockSelectMinuteTens, outbox);
            }),
            on_exit: None,
            on_event: |ctx, e, outbox| match MicrowaveContext::digit(e) {
                Some(d) if d <= 5 => {
                    ctx.proposed.right_tens = d;
                    outbox.display(DisplayMessage::signal(DisplaySignal::ModRightTens));
                    Response::Transition(MicrowaveState::ClockSelectMinuteOnes)
                }
                Some(_) => Response::Handled,
                None => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::ClockSelectMinuteOnes,
            name: "ClockSelectMinuteOnes",
            parent: Some(MicrowaveState::SetClock),
            initial: None,
            on_enter: Some(|ctx, outbox| {
                ctx.show_state(DisplayState::ClockSelectMinuteOnes, outbox);
            }),
            on_exit: None,
            on_event: |ctx, e, outbox| match MicrowaveContext::digit(e) {
                Some(d) => {
                    ctx.proposed.right_ones = d;
                    outbox.display(DisplayMessage::signal(DisplaySignal::ModRightOnes));
                    // Keep cycling fields until commit or cancel.
                    Response::Transition(MicrowaveState::ClockSelectHourTens)
                }
                None => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::SetCookTimer,
            name: "SetCookTimer",
            parent: Some(MicrowaveState::Started),
            initial: Some(MicrowaveState::SetCookTimerInitial),
            on_enter: None,
            on_exit: None,
            on_event: |ctx, e, outbox| match e.signal {
                Signal::HalfSecondTimer => {
                    ctx.blink_tick(outbox);
                    Response::Unhandled
                }
                Signal::ExtDigit => match MicrowaveContext::digit(e) {
                    Some(d) => {
                        ctx.enter_digit(d, outbox);
                        Response::Handled
                    }
                    None => Response::Unhandled,
                },
                Signal::ExtPowerLevel => Response::Transition(MicrowaveState::SetPowerLevel),
                Signal::ExtStart if ctx.door_closed && ctx.entry_armable() => {
                    ctx.timer_index = 0;
                    Response::Transition(MicrowaveState::DisplayTimer)
                }
                Signal::ExtStart => Response::Handled,
                Signal::ExtStop => Response::Transition(MicrowaveState::DisplayClock),
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::SetCookTimerInitial,
            name: "SetCookTimerInitial",
            parent: Some(MicrowaveState::SetCookTimer),
            initial: None,
            on_enter: Some(|ctx, outbox| {
                ctx.show_state(DisplayState::SetCookTimerInitial, outbox);
            }),
            on_exit: None,
            on_event: |ctx, e, _| match e.signal {
                Signal::ExtCookTime => {
                    ctx.entry_index = 1;
                    Response::Transition(MicrowaveState::SetCookTimerFinal)
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::SetCookTimerFinal,
            name: "SetCookTimerFinal",
            parent: Some(MicrowaveState::SetCookTimer),
            initial: None,
            on_enter: Some(|ctx, outbox| {
                ctx.show_state(DisplayState::SetCookTimerFinal, outbox);
            }),
            on_exit: None,
            on_event: |_, _, _| Response::Unhandled,
        },
        Row {
            id: MicrowaveState::SetPowerLevel,
            name: "SetPowerLevel",
            parent: Some(MicrowaveState::Started),
            initial: None,
            on_enter: Some(|ctx, outbox| {
                ctx.show_state(DisplayState::SetPowerLevel, outbox);
                ctx.show_power(outbox);
            }),
            on_exit: None,
            on_event: |ctx, e, outbox| match e.signal {
                Signal::HalfSecondTimer => {
                    ctx.blink_tick(outbox);
                    Response::Unhandled
                }
                Signal::ExtDigit => match MicrowaveContext::digit(e) {
                    Some(d) => {
                        // Digit 0 selects full power.
                        let level = if d == 0 { MAX_POWER } else { d };
                        ctx.segments[ctx.entry_index].power_level = level;
                        ctx.show_power(outbox);
                        Response::Handled
                    }
                    None => Response::Unhandled,
                },
                Signal::ExtCookTime if ctx.entry_index == 0 => {
                    ctx.entry_index = 1;
                    Response::Transition(MicrowaveState::SetCookTimerFinal)
                }
                Signal::ExtStart if ctx.door_closed && ctx.entry_armable() => {
                    ctx.timer_index = 0;
                    Response::Transition(MicrowaveState::DisplayTimer)
                }
                Signal::ExtStart => Response::Handled,
                Signal::ExtStop => Response::Transition(MicrowaveState::DisplayClock),
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::SetKitchenTimer,
            name: "SetKitchenTimer",
            parent: Some(MicrowaveState::Started),
            initial: None,
            on_enter: Some(|ctx, outbox| {
                ctx.show_state(DisplayState::SetKitchenTimer, outbox);
            }),
            on_exit: None,
            on_event: |ctx, e, outbox| match e.signal {
                Signal::HalfSecondTimer => {
                    ctx.blink_tick(outbox);
                    Response::Unhandled
                }
                Signal::ExtDigit => match MicrowaveContext::digit(e) {
                    Some(d) => {
                        ctx.enter_digit(d, outbox);
                        Response::Handled
                    }
                    None => Response::Unhandled,
                },
                Signal::ExtStart if ctx.door_closed && ctx.entry_armable() => {
                    ctx.timer_index = 0;
                    Response::Transition(MicrowaveState::DisplayTimer)
                }
                Signal::ExtStart => Response::Handled,
                Signal::ExtStop => Response::Transition(MicrowaveState::DisplayClock),
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::DisplayTimer,
            name: "DisplayTimer",
            parent: Some(MicrowaveState::Started),
            initial: Some(MicrowaveState::DisplayTimerRunning),
            on_enter: Some(|ctx, _| {
                // Digit entry can encode up to "99:99"; the countdown
                // caps at 99:59.
                ctx.seconds_remaining = time_to_seconds(&ctx.segments[ctx.timer_index].time)
                    .min(crate::display::MAX_SECONDS);
                ctx.segments[ctx.timer_index].time = seconds_to_time(ctx.seconds_remaining);
            }),
            on_exit: Some(|ctx, outbox| {
                ctx.cooking = false;
                ctx.resume = false;
                ctx.switch(ComponentId::Fan, Signal::FanOffReq, outbox);
                ctx.switch(ComponentId::Turntable, Signal::TurntableOffReq, outbox);
                ctx.lamp_follow(outbox);
            }),
            on_event: |ctx, e, outbox| match e.signal {
                Signal::ExtStart if ctx.cook => {
                    ctx.add_quick_start(outbox);
                    Response::Handled
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::DisplayTimerRunning,
            name: "DisplayTimerRunning",
            parent: Some(MicrowaveState::DisplayTimer),
            initial: None,
            on_enter: Some(|ctx, outbox| {
                ctx.show_state(DisplayState::DisplayTimerRunning, outbox);
                ctx.show_segment(ctx.timer_index, outbox);
                ctx.second_timer.restart_periodic(ctx.second_timer_ms);
                if ctx.cook {
                    ctx.cooking = true;
                    if ctx.resume {
                        ctx.resume = false;
                    } else {
                        ctx.write_power();
                    }
                    ctx.switch(ComponentId::Lamp, Signal::LampOnReq, outbox);
                    ctx.switch(ComponentId::Fan, Signal::FanOnReq, outbox);
                    ctx.switch(ComponentId::Turntable, Signal::TurntableOnReq, outbox);
                    ctx.post_magnetron(Signal::MagnetronOnReq, outbox);
                }
            }),
            on_exit: Some(|ctx, _| {
                ctx.cooking = false;
            }),
            on_event: |ctx, e, outbox| match e.signal {
                Signal::SecondTimer => {
                    if ctx.decrement_timer(outbox) {
                        Response::Handled
                    } else {
                        Response::Transition(MicrowaveState::DisplayClock)
                    }
                }
                Signal::ExtStop => Response::Transition(MicrowaveState::DisplayTimerPaused),
                Signal::ExtDoorOpen => {
                    ctx.door_closed = false;
                    Response::Transition(MicrowaveState::DisplayTimerPaused)
                }
                _ => Response::Unhandled,
            },
        },
        Row {
            id: MicrowaveState::DisplayTimerPaused,
            name: "DisplayTimerPaused",
            parent: Some(MicrowaveState::DisplayTimer),
            initial: None,
            on_enter: Some(|ctx, outbox| {
                ctx.second_timer.stop();
                ctx.show_state(DisplayState::DisplayTimerPaused, outbox);
                ctx.switch(ComponentId::Fan, Signal::FanOffReq, outbox);
                ctx.switch(ComponentId::Turntable, Signal::TurntableOffReq, outbox);
                ctx.lamp_follow(outbox);
                if ctx.cook {
                    ctx.post_magnetron(Signal::MagnetronPauseReq, outbox);
                }
            }),
            on_exit: None,
            on_event: |ctx, e, outbox| match e.signal {
                Signal::ExtDoorOpen => {
                    if ctx.door_closed {
                        ctx.door_closed = false;
                        ctx.lamp_follow(outbox);
                    }
                    Response::Handled
                }
                Signal::ExtDoorClosed => {
                    if !ctx.door_closed {
                        ctx.door_closed = true;
                        ctx.lamp_follow(outbox);
                    }
                    Response::Handled
                }
                Signal::ExtStart => {
                    if ctx.door_closed {
                        // Resume from the captured remainder.
                        ctx.resume = ctx.cook;
                        Response::Transition(MicrowaveState::DisplayTimerRunning)
                    } else {
                        Response::Handled
                    }
                }
                Signal::ExtStop => {
                    if ctx.cook {
                        ctx.post_magnetron(Signal::MagnetronOffReq, outbox);
                    }
                    Response::Transition(MicrowaveState::DisplayClock)
                }
                _ => Response::Unhandled,
            },
        },
    ]
}

/// The appliance-controller active object.
pub struct Microwave {
    hsm: Hsm<MicrowaveContext, MicrowaveState, 17>,
    ctx: MicrowaveContext,
    mailbox: Mailbox,
}

impl Microwave {
    pub fn new(config: &SystemConfig, pipe: Arc<SlotPipe>) -> Result<Self> {
        Ok(Self {
            hsm: Hsm::new("MICROWAVE", table())?,
            ctx: MicrowaveContext {
                cook: false,
                cooking: false,
                resume: false,
                door_closed: true,
                // Midnight-less default: twelve o'clock.
                clock: Time::new(1, 2, 0, 0),
                proposed: Time::default(),
                half_second_counts: 0,
                blink_on: false,
                segments: [DisplayTime::cleared(config.default_power_level); MAX_SEGMENTS],
                entry_index: 0,
                timer_index: 0,
                seconds_remaining: 0,
                second_timer: Timer::new(Signal::SecondTimer, ComponentId::Microwave),
                half_second_timer: Timer::new(Signal::HalfSecondTimer, ComponentId::Microwave),
                fan: SwitchRegion::new(ComponentId::Fan, Signal::FanOnReq, Signal::FanOffReq)?,
                lamp: SwitchRegion::new(ComponentId::Lamp, Signal::LampOnReq, Signal::LampOffReq)?,
                turntable: SwitchRegion::new(
                    ComponentId::Turntable,
                    Signal::TurntableOnReq,
                    Signal::TurntableOffReq,
                )?,
                pipe,
                second_timer_ms: config.second_timer_ms,
                half_second_timer_ms: config.half_second_timer_ms,
                quick_start_secs: config.quick_start_secs,
                default_power_level: config.default_power_level,
            },
            mailbox: Mailbox::new(ComponentId::Microwave),
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

    /// Advance virtual time; timer expiries re-enter through the mailbox.
    pub fn advance(&mut self, elapsed_ms: u32) {
        if self.ctx.half_second_timer.advance(elapsed_ms) {
            self.mailbox
                .post(Event::timer(Signal::HalfSecondTimer, ComponentId::Microwave));
        }
        if self.ctx.second_timer.advance(elapsed_ms) {
            self.mailbox.post(Event::timer(Signal::SecondTimer, ComponentId::Microwave));
        }
    }

    pub fn state(&self) -> MicrowaveState {
        self.hsm.state()
    }

    pub fn is_cooking(&self) -> bool {
        self.ctx.cooking
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.ctx.seconds_remaining
    }

    pub fn clock(&self) -> Time {
        self.ctx.clock
    }

    pub fn fan_on(&self) -> bool {
        self.ctx.fan.is_on()
    }

    pub fn lamp_on(&self) -> bool {
        self.ctx.lamp.is_on()
    }

    pub fn turntable_on(&self) -> bool {
        self.ctx.turntable.is_on()
    }

    #[cfg(test)]
    fn segment(&self, index: usize) -> DisplayTime {
        self.ctx.segments[index]
    }
}

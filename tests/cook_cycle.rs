//! End-to-end cook cycle through the executor: system bring-up, digit
//! entry, countdown with the magnetron duty cycle, door pause/resume.

use mwave::components::{MagnetronState, MicrowaveState, SystemState};
use mwave::display::{Body, DisplayMessage, DisplaySink, DisplayState, Time, UpdateKind};
use mwave::event::{ComponentId, Event, Signal};
use mwave::{Executor, SystemConfig};

// ── Recording display sink ────────────────────────────────────

#[derive(Default)]
struct Recorder {
    messages: Vec<DisplayMessage>,
}

impl DisplaySink for Recorder {
    fn send(&mut self, msg: &DisplayMessage) {
        self.messages.push(*msg);
    }
}

impl Recorder {
    fn states(&self) -> Vec<DisplayState> {
        self.messages
            .iter()
            .filter_map(|m| match m.body {
                Body::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn last_timer_digits(&self) -> Option<[u8; 4]> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.body == Body::Update(UpdateKind::DisplayTimer))
            .map(|m| m.payload)
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn booted() -> Executor<Recorder> {
    let mut exec = Executor::new(&SystemConfig::default(), Recorder::default()).unwrap();
    exec.post(Event::req(Signal::SystemStartReq, ComponentId::System, ComponentId::Console, 1));
    assert_eq!(exec.system().state(), SystemState::Started);
    exec.take_console();
    exec
}

fn key(exec: &mut Executor<Recorder>, signal: Signal) {
    exec.post(Event::sig(signal, ComponentId::Microwave, ComponentId::Console));
}

fn digit(exec: &mut Executor<Recorder>, d: u8) {
    exec.post(Event::digit(ComponentId::Microwave, ComponentId::Console, d));
}

/// Drive virtual time in half-second steps (the shortest period).
fn pass_time(exec: &mut Executor<Recorder>, ms: u32) {
    let mut left = ms;
    while left > 0 {
        let step = left.min(500);
        exec.advance(step);
        left -= step;
    }
}

// ── Scenarios ─────────────────────────────────────────────────

#[test]
fn thirty_second_cook_start_to_finish() {
    let mut exec = booted();

    key(&mut exec, Signal::ExtCookTime);
    digit(&mut exec, 3);
    digit(&mut exec, 0);
    assert_eq!(exec.sink().last_timer_digits(), Some([0, 0, 3, 0]));

    key(&mut exec, Signal::ExtStart);
    assert_eq!(exec.microwave().state(), MicrowaveState::DisplayTimerRunning);
    assert_eq!(exec.microwave().seconds_remaining(), 30);
    assert!(exec.microwave().is_cooking());
    assert!(exec.microwave().fan_on());
    assert!(exec.microwave().lamp_on());
    assert!(exec.microwave().turntable_on());

    // Default power 10: the magnetron never de-energizes mid-cycle.
    assert_eq!(exec.magnetron().state(), MagnetronState::Running);
    assert!(exec.magnetron().is_energized());
    pass_time(&mut exec, 4000);
    assert!(exec.magnetron().is_energized());
    assert_eq!(exec.microwave().seconds_remaining(), 26);

    pass_time(&mut exec, 26_000);
    assert_eq!(exec.microwave().state(), MicrowaveState::DisplayClock);
    assert!(!exec.microwave().is_cooking());
    assert!(!exec.microwave().fan_on());
    assert!(!exec.microwave().lamp_on());
    assert_eq!(exec.magnetron().state(), MagnetronState::Off);

    let states = exec.sink().states();
    assert!(states.contains(&DisplayState::SetCookTimerInitial));
    assert!(states.contains(&DisplayState::DisplayTimerRunning));
    assert_eq!(*states.last().unwrap(), DisplayState::DisplayClock);
}

#[test]
fn partial_power_duty_cycles_the_magnetron() {
    let mut exec = booted();

    key(&mut exec, Signal::ExtCookTime);
    digit(&mut exec, 1);
    digit(&mut exec, 0);
    key(&mut exec, Signal::ExtPowerLevel);
    digit(&mut exec, 5);
    key(&mut exec, Signal::ExtStart);

    // Level 5 on a 2 s cycle: 1 s energized, 1 s idle, repeating.
    assert!(exec.magnetron().is_energized());
    pass_time(&mut exec, 1000);
    assert!(!exec.magnetron().is_energized());
    pass_time(&mut exec, 1000);
    assert!(exec.magnetron().is_energized());
}

#[test]
fn door_open_pauses_and_resume_preserves_remaining() {
    let mut exec = booted();
    key(&mut exec, Signal::ExtStart); // quick start, 30 s
    pass_time(&mut exec, 10_000);
    assert_eq!(exec.microwave().seconds_remaining(), 20);

    // Door open mid-cycle: heating suspends, lamp forced on.
    exec.post(Event::sig(Signal::ExtDoorOpen, ComponentId::System, ComponentId::Console));
    assert_eq!(exec.microwave().state(), MicrowaveState::DisplayTimerPaused);
    assert_eq!(exec.magnetron().state(), MagnetronState::Paused);
    assert!(!exec.magnetron().is_energized());
    assert!(exec.microwave().lamp_on());
    assert!(!exec.microwave().fan_on());

    // Paused time does not count.
    pass_time(&mut exec, 7000);
    assert_eq!(exec.microwave().seconds_remaining(), 20);

    exec.post(Event::sig(Signal::ExtDoorClosed, ComponentId::System, ComponentId::Console));
    key(&mut exec, Signal::ExtStart);
    assert_eq!(exec.microwave().state(), MicrowaveState::DisplayTimerRunning);
    assert_eq!(exec.microwave().seconds_remaining(), 20);
    assert!(exec.magnetron().is_energized());

    pass_time(&mut exec, 20_000);
    assert_eq!(exec.microwave().state(), MicrowaveState::DisplayClock);
}

#[test]
fn stop_twice_cancels_the_program() {
    let mut exec = booted();
    key(&mut exec, Signal::ExtStart);
    pass_time(&mut exec, 3000);

    key(&mut exec, Signal::ExtStop);
    assert_eq!(exec.microwave().state(), MicrowaveState::DisplayTimerPaused);
    assert_eq!(exec.magnetron().state(), MagnetronState::Paused);

    key(&mut exec, Signal::ExtStop);
    assert_eq!(exec.microwave().state(), MicrowaveState::DisplayClock);
    assert_eq!(exec.magnetron().state(), MagnetronState::Off);
}

#[test]
fn two_segment_program_switches_power_between_segments() {
    let mut exec = booted();

    // Segment one: 2 s at power 10. Segment two: 2 s at power 5.
    key(&mut exec, Signal::ExtCookTime);
    digit(&mut exec, 2);
    key(&mut exec, Signal::ExtCookTime);
    digit(&mut exec, 2);
    key(&mut exec, Signal::ExtPowerLevel);
    digit(&mut exec, 5);
    key(&mut exec, Signal::ExtStart);

    assert!(exec.magnetron().is_energized());
    pass_time(&mut exec, 2000);
    // Segment two at half power: 1 s on of its 2 s cycle.
    assert_eq!(exec.microwave().seconds_remaining(), 2);
    assert!(exec.magnetron().is_energized());
    pass_time(&mut exec, 1000);
    assert!(!exec.magnetron().is_energized());

    pass_time(&mut exec, 1000);
    assert_eq!(exec.microwave().state(), MicrowaveState::DisplayClock);
}

#[test]
fn kitchen_timer_counts_down_without_heating() {
    let mut exec = booted();
    key(&mut exec, Signal::ExtKitchenTimer);
    digit(&mut exec, 3);
    key(&mut exec, Signal::ExtStart);

    assert_eq!(exec.microwave().state(), MicrowaveState::DisplayTimerRunning);
    assert_eq!(exec.magnetron().state(), MagnetronState::Off);
    assert!(!exec.microwave().fan_on());

    pass_time(&mut exec, 3000);
    assert_eq!(exec.microwave().state(), MicrowaveState::DisplayClock);
    assert_eq!(exec.magnetron().state(), MagnetronState::Off);
}

#[test]
fn clock_set_and_tick() {
    let mut exec = booted();
    key(&mut exec, Signal::ExtClock);
    digit(&mut exec, 0);
    digit(&mut exec, 9);
    digit(&mut exec, 5);
    digit(&mut exec, 9);
    key(&mut exec, Signal::ExtClock);
    assert_eq!(exec.microwave().clock(), Time::new(0, 9, 5, 9));

    pass_time(&mut exec, 60_000);
    assert_eq!(exec.microwave().clock(), Time::new(1, 0, 0, 0));
}

#[test]
fn full_shutdown_from_mid_cook() {
    let mut exec = booted();
    key(&mut exec, Signal::ExtStart);
    pass_time(&mut exec, 2000);
    assert!(exec.microwave().is_cooking());

    exec.post(Event::req(Signal::SystemStopReq, ComponentId::System, ComponentId::Console, 9));
    assert_eq!(exec.system().state(), SystemState::Stopped);
    assert_eq!(exec.microwave().state(), MicrowaveState::Stopped);
    assert_eq!(exec.magnetron().state(), MagnetronState::Stopped);
    assert!(!exec.microwave().fan_on());
    assert!(!exec.microwave().lamp_on());

    let console = exec.take_console();
    let cfm = console.iter().find(|e| e.signal == Signal::SystemStopCfm).unwrap();
    assert_eq!(cfm.confirm().unwrap().error, mwave::ErrorCode::Success);
}

//! Supervisor orchestration against a real magnetron and a silent or
//! scripted second participant, with routing done by hand so failure
//! and timeout paths can be forced.

use std::sync::Arc;

use mwave::active::Outbox;
use mwave::components::{Magnetron, System, SystemState};
use mwave::event::{ComponentId, Confirm, Event, Signal};
use mwave::pipe::SlotPipe;
use mwave::{ErrorCode, SystemConfig};

/// Routes events between the supervisor and the magnetron. Everything
/// addressed to the microwave is captured instead of delivered, so tests
/// decide whether and how that participant answers.
struct Rig {
    system: System,
    magnetron: Magnetron,
    outbox: Outbox,
    microwave_reqs: Vec<Event>,
    console: Vec<Event>,
    config: SystemConfig,
}

impl Rig {
    fn new() -> Self {
        let config = SystemConfig::default();
        let mut rig = Self {
            system: System::new(&config).unwrap(),
            magnetron: Magnetron::new(&config, Arc::new(SlotPipe::new())).unwrap(),
            outbox: Outbox::new(),
            microwave_reqs: Vec::new(),
            console: Vec::new(),
            config,
        };
        rig.system.init(&mut rig.outbox);
        rig.magnetron.init(&mut rig.outbox);
        rig.settle();
        rig
    }

    fn settle(&mut self) {
        loop {
            let mut moved = false;
            moved |= self.system.step(&mut self.outbox);
            moved |= self.magnetron.step(&mut self.outbox);
            let (events, _) = self.outbox.take();
            for e in events {
                match e.to {
                    ComponentId::System => self.system.post(e),
                    ComponentId::Magnetron => self.magnetron.post(e),
                    ComponentId::Console => self.console.push(e),
                    // Held back: the test scripts this participant.
                    _ => self.microwave_reqs.push(e),
                }
                moved = true;
            }
            if !moved {
                break;
            }
        }
    }

    fn post(&mut self, event: Event) {
        self.system.post(event);
        self.settle();
    }

    fn expire_deadline(&mut self) {
        self.system.advance(self.config.system_timeout_ms);
        self.settle();
    }

    /// Answer the captured microwave requests with the given outcome.
    fn answer_microwave(&mut self, error: ErrorCode) {
        for req in std::mem::take(&mut self.microwave_reqs) {
            let signal = match req.signal {
                Signal::MicrowaveStartReq => Signal::MicrowaveStartCfm,
                Signal::MicrowaveStopReq => Signal::MicrowaveStopCfm,
                _ => continue,
            };
            let confirm = if error.is_error() {
                Confirm::failure(error, ComponentId::Microwave, "scripted failure")
            } else {
                Confirm::success(ComponentId::Microwave)
            };
            self.system.post(Event::cfm(
                signal,
                ComponentId::System,
                ComponentId::Microwave,
                req.seq,
                confirm,
            ));
        }
        self.settle();
    }

    fn console_cfm(&mut self, signal: Signal) -> Option<Event> {
        let found = self.console.iter().find(|e| e.signal == signal).copied();
        self.console.clear();
        found
    }
}

fn start_req(seq: u32) -> Event {
    Event::req(Signal::SystemStartReq, ComponentId::System, ComponentId::Console, seq)
}

fn stop_req(seq: u32) -> Event {
    Event::req(Signal::SystemStopReq, ComponentId::System, ComponentId::Console, seq)
}

#[test]
fn join_completes_only_after_both_confirm() {
    let mut rig = Rig::new();
    rig.post(start_req(1));

    // The magnetron confirmed immediately; the join still waits.
    assert_eq!(rig.system.state(), SystemState::Starting);
    assert!(rig.console_cfm(Signal::SystemStartCfm).is_none());

    rig.answer_microwave(ErrorCode::Success);
    assert_eq!(rig.system.state(), SystemState::Started);
    let cfm = rig.console_cfm(Signal::SystemStartCfm).unwrap();
    assert_eq!(cfm.seq, 1);
    assert_eq!(cfm.confirm().unwrap().error, ErrorCode::Success);
}

#[test]
fn silent_participant_times_out_and_winds_down() {
    let mut rig = Rig::new();
    rig.post(start_req(2));
    assert_eq!(rig.system.state(), SystemState::Starting);

    rig.expire_deadline();
    let cfm = rig.console_cfm(Signal::SystemStartCfm).unwrap();
    assert_eq!(cfm.confirm().unwrap().error, ErrorCode::Timeout);
    assert_eq!(rig.system.state(), SystemState::Stopping);

    // The wind-down completes once the silent participant answers its
    // stop request; the magnetron already has.
    rig.answer_microwave(ErrorCode::Success);
    assert_eq!(rig.system.state(), SystemState::Stopped);
}

#[test]
fn participant_failure_is_wrapped_with_its_origin() {
    let mut rig = Rig::new();
    rig.post(start_req(3));
    rig.answer_microwave(ErrorCode::StateError);

    let cfm = rig.console_cfm(Signal::SystemStartCfm).unwrap();
    let confirm = cfm.confirm().unwrap();
    assert_eq!(confirm.error, ErrorCode::StateError);
    assert_eq!(confirm.origin, ComponentId::Microwave);
    assert_eq!(rig.system.state(), SystemState::Stopping);
}

#[test]
fn late_start_confirmation_is_discarded_during_stopping() {
    let mut rig = Rig::new();
    rig.post(start_req(4));
    let held = rig.microwave_reqs.clone();

    rig.expire_deadline();
    assert_eq!(rig.system.state(), SystemState::Stopping);
    rig.console.clear();

    // The straggler finally answers the abandoned start request.
    let req = held.iter().find(|e| e.signal == Signal::MicrowaveStartReq).unwrap();
    rig.post(Event::cfm(
        Signal::MicrowaveStartCfm,
        ComponentId::System,
        ComponentId::Microwave,
        req.seq,
        Confirm::success(ComponentId::Microwave),
    ));
    // No second outcome, no state change.
    assert_eq!(rig.system.state(), SystemState::Stopping);
    assert!(rig.console.is_empty());
}

#[test]
fn deferred_stop_runs_after_start_completes() {
    let mut rig = Rig::new();
    rig.post(start_req(5));
    // Stop arrives while the start join is still open.
    rig.post(stop_req(6));
    assert_eq!(rig.system.state(), SystemState::Starting);

    rig.answer_microwave(ErrorCode::Success);
    // Start confirmed, then the deferred stop was replayed and the
    // supervisor began stopping.
    let start_cfm = rig.console_cfm(Signal::SystemStartCfm).unwrap();
    assert_eq!(start_cfm.seq, 5);
    assert_eq!(rig.system.state(), SystemState::Stopping);

    rig.answer_microwave(ErrorCode::Success);
    assert_eq!(rig.system.state(), SystemState::Stopped);
    let stop_cfm = rig.console_cfm(Signal::SystemStopCfm).unwrap();
    assert_eq!(stop_cfm.seq, 6);
    assert_eq!(stop_cfm.confirm().unwrap().error, ErrorCode::Success);
}

#[test]
fn restart_cycle_reuses_fresh_sequence_numbers() {
    let mut rig = Rig::new();
    rig.post(start_req(7));
    let first: Vec<u32> = rig.microwave_reqs.iter().map(|e| e.seq).collect();
    rig.answer_microwave(ErrorCode::Success);
    rig.post(stop_req(8));
    rig.answer_microwave(ErrorCode::Success);
    assert_eq!(rig.system.state(), SystemState::Stopped);

    rig.post(start_req(9));
    let second: Vec<u32> = rig.microwave_reqs.iter().map(|e| e.seq).collect();
    assert!(second.iter().all(|s| !first.contains(s)), "sequences are never reused");
    rig.answer_microwave(ErrorCode::Success);
    assert_eq!(rig.system.state(), SystemState::Started);
}

//! Property tests for the timing and entry invariants of the core.

use std::sync::Arc;

use proptest::prelude::*;

use mwave::active::Outbox;
use mwave::components::{Magnetron, MagnetronState, Microwave, MicrowaveState};
use mwave::display::{Time, MAX_SECONDS};
use mwave::event::{ComponentId, Event, Signal};
use mwave::pipe::SlotPipe;
use mwave::timer::Timer;
use mwave::SystemConfig;

// ── Magnetron duty cycle ──────────────────────────────────────

fn heated_magnetron(level: u32) -> (Magnetron, Outbox) {
    let pipe = Arc::new(SlotPipe::new());
    let mut mag = Magnetron::new(&SystemConfig::default(), Arc::clone(&pipe)).unwrap();
    let mut ob = Outbox::new();
    mag.init(&mut ob);
    mag.post(Event::req(Signal::MagnetronStartReq, ComponentId::Magnetron, ComponentId::System, 1));
    assert!(pipe.write(level));
    mag.post(Event::sig(Signal::MagnetronOnReq, ComponentId::Magnetron, ComponentId::Microwave));
    while mag.step(&mut ob) {}
    (mag, ob)
}

fn drain(mag: &mut Magnetron, ob: &mut Outbox) {
    while mag.step(ob) {}
}

proptest! {
    /// For every power level the on and off phases partition the cycle:
    /// energized for exactly `cycle * level / 10`, idle for the rest,
    /// then energized again.
    #[test]
    fn duty_cycle_partitions_the_period(level in 1u32..=10) {
        let cycle = SystemConfig::default().magnetron_cycle_ms;
        let on_time = cycle * level / 10;
        let (mut mag, mut ob) = heated_magnetron(level);
        prop_assert!(mag.is_energized());

        // One tick before the boundary the phase has not changed.
        mag.advance(on_time - 1);
        drain(&mut mag, &mut ob);
        prop_assert!(mag.is_energized());

        mag.advance(1);
        drain(&mut mag, &mut ob);
        if level == 10 {
            // Full power never de-energizes.
            prop_assert!(mag.is_energized());
        } else {
            prop_assert!(!mag.is_energized());
            // The off phase is the remainder of the cycle.
            mag.advance(cycle - on_time - 1);
            drain(&mut mag, &mut ob);
            prop_assert!(!mag.is_energized());
            mag.advance(1);
            drain(&mut mag, &mut ob);
            prop_assert!(mag.is_energized());
        }
    }

    /// Pausing at an arbitrary point and resuming completes the phase
    /// with exactly the captured remainder.
    #[test]
    fn pause_resume_preserves_phase_remainder(
        level in 1u32..=9,
        fraction in 1u32..=99,
    ) {
        let cycle = SystemConfig::default().magnetron_cycle_ms;
        let on_time = cycle * level / 10;
        let elapsed = on_time * fraction / 100;
        prop_assume!(elapsed > 0 && elapsed < on_time);

        let (mut mag, mut ob) = heated_magnetron(level);
        mag.advance(elapsed);
        drain(&mut mag, &mut ob);
        prop_assert!(mag.is_energized());

        mag.post(Event::sig(
            Signal::MagnetronPauseReq, ComponentId::Magnetron, ComponentId::Microwave,
        ));
        drain(&mut mag, &mut ob);
        prop_assert_eq!(mag.state(), MagnetronState::Paused);

        mag.post(Event::sig(
            Signal::MagnetronOnReq, ComponentId::Magnetron, ComponentId::Microwave,
        ));
        drain(&mut mag, &mut ob);
        prop_assert!(mag.is_energized());

        // The phase boundary lands exactly where the pause left it.
        mag.advance(on_time - elapsed - 1);
        drain(&mut mag, &mut ob);
        prop_assert!(mag.is_energized());
        mag.advance(1);
        drain(&mut mag, &mut ob);
        prop_assert!(!mag.is_energized());
    }
}

// ── Timer ─────────────────────────────────────────────────────

proptest! {
    /// A one-shot timer fires exactly once no matter how the elapsed
    /// time is partitioned into advance calls.
    #[test]
    fn one_shot_fires_once_under_any_partition(
        timeout in 1u32..=5000,
        steps in proptest::collection::vec(1u32..=700, 1..40),
    ) {
        let mut timer = Timer::new(Signal::StateTimer, ComponentId::System);
        timer.start(timeout);
        let mut fires = 0;
        let mut total = 0u32;
        for step in steps {
            total += step;
            if timer.advance(step) {
                fires += 1;
            }
        }
        let expected = u32::from(total >= timeout);
        prop_assert_eq!(fires, expected);
    }

    /// A periodic timer fires once per elapsed period, with overshoot
    /// carried rather than lost, as long as steps stay within a period.
    #[test]
    fn periodic_fires_once_per_period(
        period in 100u32..=1000,
        count in 1u32..=20,
    ) {
        let mut timer = Timer::new(Signal::SecondTimer, ComponentId::Microwave);
        timer.restart_periodic(period);
        let mut fires = 0;
        let mut remaining = period * count;
        while remaining > 0 {
            let step = remaining.min(period);
            if timer.advance(step) {
                fires += 1;
            }
            remaining -= step;
        }
        prop_assert_eq!(fires, count);
    }
}

// ── Single-slot pipe ──────────────────────────────────────────

proptest! {
    /// The pipe behaves as a single-slot model: a write succeeds iff the
    /// slot is empty, a read returns the last successful write.
    #[test]
    fn pipe_matches_single_slot_model(
        ops in proptest::collection::vec((any::<bool>(), 1u32..=10), 1..60),
    ) {
        let pipe = SlotPipe::new();
        let mut model: Option<u32> = None;
        for (is_write, value) in ops {
            if is_write {
                let accepted = pipe.write(value);
                prop_assert_eq!(accepted, model.is_none());
                if accepted {
                    model = Some(value);
                }
            } else {
                prop_assert_eq!(pipe.read(), model.take());
            }
        }
    }
}

// ── Digit entry ───────────────────────────────────────────────

fn entered_microwave(digits: &[u8]) -> (Microwave, Outbox) {
    let pipe = Arc::new(SlotPipe::new());
    let mut mw = Microwave::new(&SystemConfig::default(), pipe).unwrap();
    let mut ob = Outbox::new();
    mw.init(&mut ob);
    mw.post(Event::req(Signal::MicrowaveStartReq, ComponentId::Microwave, ComponentId::System, 1));
    mw.post(Event::sig(Signal::ExtCookTime, ComponentId::Microwave, ComponentId::Console));
    for &d in digits {
        mw.post(Event::digit(ComponentId::Microwave, ComponentId::Console, d));
    }
    mw.post(Event::sig(Signal::ExtStart, ComponentId::Microwave, ComponentId::Console));
    while mw.step(&mut ob) {}
    (mw, ob)
}

proptest! {
    /// However many digits are keyed in, the armed countdown never
    /// exceeds 99:59; an all-zero entry never arms at all.
    #[test]
    fn digit_entry_clamps_to_display_range(
        digits in proptest::collection::vec(0u8..=9, 1..12),
    ) {
        let (mw, _ob) = entered_microwave(&digits);
        if digits.iter().rev().take(4).all(|&d| d == 0) {
            prop_assert_eq!(mw.state(), MicrowaveState::SetCookTimerInitial);
        } else {
            prop_assert_eq!(mw.state(), MicrowaveState::DisplayTimerRunning);
            prop_assert!(mw.seconds_remaining() <= MAX_SECONDS);
        }
    }

    /// The shift register keeps exactly the last four digits.
    #[test]
    fn digit_entry_keeps_last_four(
        digits in proptest::collection::vec(0u8..=9, 4..12),
    ) {
        let (mw, _ob) = entered_microwave(&digits);
        let tail = &digits[digits.len() - 4..];
        let entered = Time::new(tail[0], tail[1], tail[2], tail[3]);
        // The armed countdown equals the keyed time, clamped.
        let keyed = u32::from(entered.left_tens) * 600
            + u32::from(entered.left_ones) * 60
            + u32::from(entered.right_tens) * 10
            + u32::from(entered.right_ones);
        prop_assert_eq!(mw.seconds_remaining(), keyed.min(MAX_SECONDS));
    }
}

// ── Wall clock ────────────────────────────────────────────────

proptest! {
    /// From any valid 12-hour time, one minute later is still a valid
    /// 12-hour time and is the arithmetic successor.
    #[test]
    fn clock_increment_stays_in_twelve_hour_range(
        hour in 1u32..=12,
        minute in 0u32..=59,
    ) {
        let pipe = Arc::new(SlotPipe::new());
        let mut mw = Microwave::new(&SystemConfig::default(), pipe).unwrap();
        let mut ob = Outbox::new();
        mw.init(&mut ob);
        mw.post(Event::req(
            Signal::MicrowaveStartReq, ComponentId::Microwave, ComponentId::System, 1,
        ));
        mw.post(Event::sig(Signal::ExtClock, ComponentId::Microwave, ComponentId::Console));
        for d in [hour / 10, hour % 10, minute / 10, minute % 10] {
            mw.post(Event::digit(ComponentId::Microwave, ComponentId::Console, d as u8));
        }
        mw.post(Event::sig(Signal::ExtClock, ComponentId::Microwave, ComponentId::Console));
        while mw.step(&mut ob) {}

        // One minute of half-second ticks.
        for _ in 0..120 {
            mw.advance(500);
            while mw.step(&mut ob) {}
            drop(ob.take());
        }

        let t = mw.clock();
        let new_hour = u32::from(t.left_tens) * 10 + u32::from(t.left_ones);
        let new_minute = u32::from(t.right_tens) * 10 + u32::from(t.right_ones);
        prop_assert!((1..=12).contains(&new_hour));
        prop_assert!(new_minute <= 59);
        let expected = if minute == 59 {
            (if hour == 12 { 1 } else { hour + 1 }, 0)
        } else {
            (hour, minute + 1)
        };
        prop_assert_eq!((new_hour, new_minute), expected);
    }
}

//! Events, signals and component identities.
//!
//! Everything that moves between components is an [`Event`]: a small
//! `Copy` value naming a signal, the destination and source components, a
//! sequence number and an optional payload. Signals are partitioned into
//! *interface* signals (cross-component requests, confirmations and
//! operator input), *internal* signals (private to one component) and
//! *timer* signals (from the timer service); see [`Signal::kind`].
//!
//! Every confirmation carries the sequence number of the request it
//! answers plus a [`Confirm`] payload with the error code, the
//! originating component and a reason string.

use crate::error::ErrorCode;

// ---------------------------------------------------------------------------
// Component identity
// ---------------------------------------------------------------------------

/// Fixed identities of every active object and region in the appliance.
///
/// Components are created once at process start and live until teardown;
/// there is no hot-plug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    /// Top-level supervisor.
    System,
    /// Appliance controller (owns the Fan/Lamp/Turntable regions).
    Microwave,
    /// Duty-cycle heating controller.
    Magnetron,
    /// Orthogonal region under the microwave.
    Fan,
    /// Orthogonal region under the microwave.
    Lamp,
    /// Orthogonal region under the microwave.
    Turntable,
    /// External operator/console: source of user events, sink of
    /// top-level confirmations. Not an active object in this crate.
    Console,
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Partition of the signal space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Cross-component requests/confirmations and operator input.
    Interface,
    /// Private to one component (never crosses a component boundary).
    Internal,
    /// Produced by a component's own timer service.
    Timer,
}

/// Every signal understood by the appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    // -- system supervisor interface --
    SystemStartReq,
    SystemStartCfm,
    SystemStopReq,
    SystemStopCfm,

    // -- microwave interface --
    MicrowaveStartReq,
    MicrowaveStartCfm,
    MicrowaveStopReq,
    MicrowaveStopCfm,

    // -- operator signals (console/buttons), consumed by the microwave --
    ExtStart,
    ExtStop,
    ExtClock,
    ExtCookTime,
    ExtPowerLevel,
    ExtKitchenTimer,
    ExtDigit,
    ExtDoorOpen,
    ExtDoorClosed,

    // -- magnetron interface --
    MagnetronStartReq,
    MagnetronStartCfm,
    MagnetronStopReq,
    MagnetronStopCfm,
    MagnetronOnReq,
    MagnetronOffReq,
    MagnetronPauseReq,

    // -- region interface (synchronous, within the microwave) --
    FanOnReq,
    FanOffReq,
    LampOnReq,
    LampOffReq,
    TurntableOnReq,
    TurntableOffReq,

    // -- internal --
    Done,
    Failed,

    // -- timer --
    StateTimer,
    SecondTimer,
    HalfSecondTimer,
    MagnetronCycleTimer,
}

impl Signal {
    /// Which partition this signal belongs to.
    pub fn kind(self) -> SignalKind {
        match self {
            Self::Done | Self::Failed => SignalKind::Internal,
            Self::StateTimer
            | Self::SecondTimer
            | Self::HalfSecondTimer
            | Self::MagnetronCycleTimer => SignalKind::Timer,
            _ => SignalKind::Interface,
        }
    }

    /// `true` for confirmation signals (they must carry a [`Confirm`]).
    pub fn is_confirm(self) -> bool {
        matches!(
            self,
            Self::SystemStartCfm
                | Self::SystemStopCfm
                | Self::MicrowaveStartCfm
                | Self::MicrowaveStopCfm
                | Self::MagnetronStartCfm
                | Self::MagnetronStopCfm
        )
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Error information carried by every confirmation and by internal
/// `Failed` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirm {
    pub error: ErrorCode,
    /// Component where the error originated (preserved across wrapping).
    pub origin: ComponentId,
    pub reason: &'static str,
}

impl Confirm {
    pub fn success(origin: ComponentId) -> Self {
        Self { error: ErrorCode::Success, origin, reason: "" }
    }

    pub fn failure(error: ErrorCode, origin: ComponentId, reason: &'static str) -> Self {
        Self { error, origin, reason }
    }
}

/// Optional event payload. Small value objects only, never streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    None,
    /// A pressed digit key, 0-9.
    Digit(u8),
    /// Confirmation outcome.
    Cfm(Confirm),
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// One unit of communication between components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub signal: Signal,
    pub to: ComponentId,
    pub from: ComponentId,
    /// Matches a confirmation to its request. Zero for plain signals.
    pub seq: u32,
    pub payload: Payload,
}

impl Event {
    /// A request carrying a fresh sequence number.
    pub fn req(signal: Signal, to: ComponentId, from: ComponentId, seq: u32) -> Self {
        Self { signal, to, from, seq, payload: Payload::None }
    }

    /// A confirmation answering the request with sequence `seq`.
    pub fn cfm(signal: Signal, to: ComponentId, from: ComponentId, seq: u32, cfm: Confirm) -> Self {
        debug_assert!(signal.is_confirm(), "cfm payload on non-confirm signal");
        Self { signal, to, from, seq, payload: Payload::Cfm(cfm) }
    }

    /// A plain signal with no sequence and no payload.
    pub fn sig(signal: Signal, to: ComponentId, from: ComponentId) -> Self {
        Self { signal, to, from, seq: 0, payload: Payload::None }
    }

    /// An operator digit key.
    pub fn digit(to: ComponentId, from: ComponentId, digit: u8) -> Self {
        debug_assert!(digit <= 9);
        Self { signal: Signal::ExtDigit, to, from, seq: 0, payload: Payload::Digit(digit) }
    }

    /// A timer-expiry event, synthesized by the owning component.
    pub fn timer(signal: Signal, owner: ComponentId) -> Self {
        debug_assert_eq!(signal.kind(), SignalKind::Timer);
        Self { signal, to: owner, from: owner, seq: 0, payload: Payload::None }
    }

    /// The confirmation payload, if this is a confirmation or failure event.
    pub fn confirm(&self) -> Option<Confirm> {
        match self.payload {
            Payload::Cfm(c) => Some(c),
            _ => None,
        }
    }
}

//! Display model and the outbound update channel.
//!
//! The appliance reports every user-visible change (clock tick, digit
//! entry, blink toggle, power-level change, state change) as one
//! fixed-layout [`DisplayMessage`]: a destination tag, a message body
//! (state, signal or update) and a 4-byte payload. The core guarantees
//! exactly one message per state-affecting change; the transport behind
//! the [`DisplaySink`] port is somebody else's problem.

/// Highest selectable power level.
pub const MAX_POWER: u8 = 10;

/// Largest representable countdown: 99:59.
pub const MAX_SECONDS: u32 = 5999;

// ---------------------------------------------------------------------------
// Four-digit display time
// ---------------------------------------------------------------------------

/// Four display digits, each 0-9: `LT LO : RT RO`.
///
/// Represents either a wall-clock time (hours:minutes) or a countdown
/// (minutes:seconds) depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Time {
    pub left_tens: u8,
    pub left_ones: u8,
    pub right_tens: u8,
    pub right_ones: u8,
}

impl Time {
    pub fn new(left_tens: u8, left_ones: u8, right_tens: u8, right_ones: u8) -> Self {
        debug_assert!(left_tens <= 9 && left_ones <= 9 && right_tens <= 9 && right_ones <= 9);
        Self { left_tens, left_ones, right_tens, right_ones }
    }

    pub fn is_zero(&self) -> bool {
        self.left_tens == 0 && self.left_ones == 0 && self.right_tens == 0 && self.right_ones == 0
    }

    /// Pack the digits into the fixed 4-byte message payload.
    pub fn to_payload(self) -> [u8; 4] {
        [self.left_tens, self.left_ones, self.right_tens, self.right_ones]
    }
}

/// Convert seconds to minutes:seconds digits, clamped to 99:59.
pub fn seconds_to_time(seconds: u32) -> Time {
    let seconds = seconds.min(MAX_SECONDS);
    let min = seconds / 60;
    let sec = seconds % 60;
    Time {
        left_tens: (min / 10) as u8,
        left_ones: (min % 10) as u8,
        right_tens: (sec / 10) as u8,
        right_ones: (sec % 10) as u8,
    }
}

/// Decode minutes:seconds digits back to seconds.
pub fn time_to_seconds(time: &Time) -> u32 {
    let min = u32::from(time.left_tens) * 10 + u32::from(time.left_ones);
    let sec = u32::from(time.right_tens) * 10 + u32::from(time.right_ones);
    min * 60 + sec
}

/// Shift-register digit entry: existing digits move one place left, the
/// new digit lands in the units position. The leftmost digit falls off.
pub fn shift_left_insert(time: &mut Time, digit: u8) {
    debug_assert!(digit <= 9);
    time.left_tens = time.left_ones;
    time.left_ones = time.right_tens;
    time.right_tens = time.right_ones;
    time.right_ones = digit;
}

/// A countdown entry plus its associated power level (1-10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayTime {
    pub time: Time,
    pub power_level: u8,
}

impl DisplayTime {
    pub fn cleared(power_level: u8) -> Self {
        Self { time: Time::default(), power_level }
    }
}

// ---------------------------------------------------------------------------
// Outbound message format
// ---------------------------------------------------------------------------

/// Which side of the link a message is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Destination {
    App = 0x4D61_7070,
    Dev = 0x4D64_6576,
}

/// Appliance states mirrored on the display module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    DisplayClock,
    ClockSelectHourTens,
    ClockSelectHourOnes,
    ClockSelectMinuteTens,
    ClockSelectMinuteOnes,
    SetCookTimerInitial,
    SetCookTimerFinal,
    SetPowerLevel,
    SetKitchenTimer,
    DisplayTimerRunning,
    DisplayTimerPaused,
}

/// Momentary display cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplaySignal {
    BlinkOn,
    BlinkOff,
    ModLeftTens,
    ModLeftOnes,
    ModRightTens,
    ModRightOnes,
}

/// Value refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Clock,
    DisplayTimer,
    PowerLevel,
}

/// Message body: exactly one of state, signal or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body {
    State(DisplayState),
    Signal(DisplaySignal),
    Update(UpdateKind),
}

/// One fixed-layout display update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMessage {
    pub dst: Destination,
    pub body: Body,
    pub payload: [u8; 4],
}

impl DisplayMessage {
    pub fn state(state: DisplayState) -> Self {
        Self { dst: Destination::App, body: Body::State(state), payload: [0; 4] }
    }

    pub fn signal(signal: DisplaySignal) -> Self {
        Self { dst: Destination::App, body: Body::Signal(signal), payload: [0; 4] }
    }

    pub fn update(kind: UpdateKind, payload: [u8; 4]) -> Self {
        Self { dst: Destination::App, body: Body::Update(kind), payload }
    }
}

/// Outbound port for display updates. Adapters decide the transport
/// (UART framing to the display module, console echo, test recorder).
pub trait DisplaySink {
    fn send(&mut self, msg: &DisplayMessage);
}

/// Sink that throws messages away (headless operation).
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn send(&mut self, _msg: &DisplayMessage) {}
}

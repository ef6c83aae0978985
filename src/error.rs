//! Unified error types for the control core.
//!
//! Two layers exist on purpose. [`ErrorCode`] is the *protocol* error
//! carried inside confirmation events between components; it is part of
//! the request/confirm contract and is always `Copy`. [`Error`] is the
//! *construction/usage* error returned by fallible crate APIs (a bad
//! state table, invalid configuration), funnelled into one enum so the
//! top-level wiring code handles every failure uniformly.

use core::fmt;

// ---------------------------------------------------------------------------
// Protocol error codes (carried in confirmations)
// ---------------------------------------------------------------------------

/// Outcome of a request, reported in the matching confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The request was served.
    Success,
    /// The request arrived in a state that cannot serve it
    /// (e.g. start while already started). Terminal; no retry.
    StateError,
    /// An orchestration deadline expired before all confirmations arrived.
    Timeout,
    /// Propagated from a failed sub-component without refinement.
    Unspecified,
}

impl ErrorCode {
    /// `true` for every code other than [`ErrorCode::Success`].
    pub fn is_error(self) -> bool {
        self != Self::Success
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::StateError => write!(f, "state error"),
            Self::Timeout => write!(f, "timeout"),
            Self::Unspecified => write!(f, "unspecified"),
        }
    }
}

// ---------------------------------------------------------------------------
// Crate-level error
// ---------------------------------------------------------------------------

/// Every fallible constructor or API in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A state table failed its construction-time consistency check.
    /// Indicates a defect in the table, not a runtime condition.
    StateTable(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateTable(msg) => write!(f, "state table: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

//! Microwave oven control core.
//!
//! Hierarchical state machines composed into active objects: a
//! supervisor, the appliance controller with its fan/lamp/turntable
//! regions, and the magnetron duty-cycle controller, all scheduled
//! run-to-completion by the [`executor`]. No threads, no sleeps: time
//! is virtual and injected by the host, which makes the whole core
//! host-testable.

#![deny(unused_must_use)]

pub mod active;
pub mod components;
pub mod config;
pub mod display;
pub mod event;
pub mod executor;
pub mod hsm;
pub mod orchestrator;
pub mod pipe;
pub mod timer;

mod error;

pub use config::SystemConfig;
pub use error::{Error, ErrorCode, Result};
pub use executor::Executor;

//! The appliance's active objects and regions.

pub mod magnetron;
pub mod microwave;
pub mod regions;
pub mod system;

pub use magnetron::{Magnetron, MagnetronState};
pub use microwave::{Microwave, MicrowaveState};
pub use regions::SwitchRegion;
pub use system::{System, SystemState};

//! System configuration parameters.
//!
//! All tunable timing and appliance parameters for the control core.
//! Values are plain data with serde derives so a host console or
//! provisioning layer can override them.

use serde::{Deserialize, Serialize};

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Magnetron duty cycle ---
    /// Full on/off cycle length in milliseconds. The power level (1-10)
    /// selects which fraction of this period the magnetron is energized.
    pub magnetron_cycle_ms: u32,

    // --- Appliance timing ---
    /// Countdown tick period (milliseconds).
    pub second_timer_ms: u32,
    /// Blink / clock-advance tick period (milliseconds).
    pub half_second_timer_ms: u32,
    /// Seconds added by the quick-start key.
    pub quick_start_secs: u32,
    /// Power level used when none was entered (1-10).
    pub default_power_level: u8,

    // --- Orchestration ---
    /// Worst-case response time of any sub-component to a start/stop
    /// request (milliseconds).
    pub request_timeout_ms: u32,
    /// Supervisor deadline for a full start/stop fan-out. Must exceed
    /// `request_timeout_ms`.
    pub system_timeout_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            magnetron_cycle_ms: 2000,

            second_timer_ms: 1000,
            half_second_timer_ms: 500,
            quick_start_secs: 30,
            default_power_level: 10,

            request_timeout_ms: 200,
            system_timeout_ms: 500,
        }
    }
}

impl SystemConfig {
    /// Validate cross-field invariants.
    pub fn validate(&self) -> crate::Result<()> {
        if self.default_power_level == 0 || self.default_power_level > crate::display::MAX_POWER {
            return Err(crate::Error::Config("default power level out of range"));
        }
        if self.system_timeout_ms <= self.request_timeout_ms {
            return Err(crate::Error::Config(
                "system timeout must exceed sub-component timeout",
            ));
        }
        if self.magnetron_cycle_ms == 0 || self.second_timer_ms == 0 {
            return Err(crate::Error::Config("timer periods must be non-zero"));
        }
        Ok(())
    }
}

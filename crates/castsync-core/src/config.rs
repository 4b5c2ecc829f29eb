// ── Runtime synchronizer configuration ──
//
// These types describe how the synchronizer paces itself and which
// preferences the presentation starts from. They never touch disk;
// `castsync-config` builds them from TOML and hands them in.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upper bound of the lag slider.
pub const LAG_MAX: u32 = 10_000;

/// Tuning for the owner context and its background watchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynchronizerConfig {
    /// Delay before a requested hide actually hides the surface.
    pub hide_delay: Duration,
    /// How often local interfaces are re-enumerated. Zero disables polling.
    pub address_poll_interval: Duration,
    /// Bound on async cross-context calls into the owner.
    pub call_timeout: Duration,
    /// Maximum transcript size in bytes; oldest entries are dropped first.
    pub transcript_limit: usize,
    /// Capacity of the presentation event broadcast channel.
    pub event_channel_size: usize,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            hide_delay: Duration::from_millis(1000),
            address_poll_interval: Duration::from_secs(5),
            call_timeout: Duration::from_secs(5),
            transcript_limit: 1024 * 1024,
            event_channel_size: 256,
        }
    }
}

/// User-facing preferences mirrored by the presentation surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub lag_value: u32,
    pub show_lag_control: bool,
    pub show_log: bool,
    pub show_window_on_start: bool,
    pub auto_restart: bool,
    pub auto_start_devices: bool,
    pub use_keyboard_shortcuts: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            lag_value: 1000,
            show_lag_control: true,
            show_log: true,
            show_window_on_start: true,
            auto_restart: false,
            auto_start_devices: false,
            use_keyboard_shortcuts: false,
        }
    }
}

/// Clamp a lag value into the slider range.
pub fn clamp_lag(value: u32) -> u32 {
    value.min(LAG_MAX)
}

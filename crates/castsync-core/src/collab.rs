// ── Collaborator seams ──
//
// The synchronizer never talks to sockets, settings or playback directly.
// It consumes a `NetworkLayer` for address enumeration and forwards user
// actions to an `ActionSink`. Both are called from the owner context.

use std::net::IpAddr;

use crate::error::CoreError;
use crate::model::{AddressEntry, RecordingDevice};

/// Source of local address snapshots.
pub trait NetworkLayer: Send + Sync {
    /// Every currently usable local IPv4 address.
    fn enumerate_ipv4(&self) -> Result<Vec<AddressEntry>, CoreError>;

    /// The address the host would use by default, if any.
    fn resolve_default_address(&self) -> Option<IpAddr>;
}

/// Receiver of user actions and selection changes.
///
/// Every method defaults to a no-op so front ends only implement what they
/// wire up.
pub trait ActionSink: Send + Sync {
    fn change_ip_address_used(&self, _address: IpAddr) {}
    fn set_lag_threshold(&self, _value: u32) {}
    fn on_set_hooks(&self, _enabled: bool) {}
    fn on_set_auto_restart(&self, _enabled: bool) {}
    fn recording_device_changed(&self, _device: &RecordingDevice) {}
    fn scan_for_devices(&self) {}
    fn reset_settings(&self) {}
    fn close_application(&self) {}
    fn volume_up(&self) {}
    fn volume_down(&self) {}
    fn volume_mute(&self) {}
    fn sync_devices(&self) {}
}

/// Sink that drops every action.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopActions;

impl ActionSink for NoopActions {}

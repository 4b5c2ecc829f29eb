// ── Inbound and outbound events ──
//
// `SyncEvent` is what producers feed in; `PresentationEvent` is what the
// owner publishes after every state transition.

use std::net::IpAddr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::config::Preferences;
use crate::model::{AddressEntry, DeviceId, DeviceState, DeviceView, RecordingDevice};
use crate::synchronizer::Lifecycle;

/// An event from discovery, the network layer, or the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    DeviceDiscovered {
        id: DeviceId,
        name: String,
        #[serde(default)]
        state: DeviceState,
    },
    DeviceStateChanged {
        id: DeviceId,
        state: DeviceState,
    },
    NetworkAddressesChanged {
        addresses: Vec<AddressEntry>,
    },
    UserSelectedAddress {
        address: IpAddr,
    },
    UserToggledSync,
    Log {
        message: String,
    },
}

/// A state transition observed by the owner context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PresentationEvent {
    LifecycleChanged {
        lifecycle: Lifecycle,
    },
    DeviceAdded {
        device: DeviceView,
        position: usize,
        name_collision: bool,
    },
    DeviceStateChanged {
        device: DeviceView,
    },
    SyncEligibilityChanged {
        eligible: bool,
    },
    AddressesChanged {
        snapshot: Vec<AddressEntry>,
        selection: Option<IpAddr>,
    },
    AddressSelected {
        address: IpAddr,
    },
    KeepAlive {
        label: String,
        at: DateTime<Local>,
    },
    LogAppended {
        message: String,
    },
    LogTabHidden,
    VisibilityChanged {
        visible: bool,
    },
    LagValueChanged {
        value: u32,
    },
    PreferencesChanged {
        preferences: Preferences,
    },
    RecordingDevicesChanged {
        devices: Vec<RecordingDevice>,
        selected: Option<RecordingDevice>,
    },
}

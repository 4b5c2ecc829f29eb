// ── Device domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::device_id::DeviceId;

/// Playback/connection state of a cast device as reported by discovery.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[non_exhaustive]
pub enum DeviceState {
    #[default]
    NotConnected,
    Idle,
    Connecting,
    Connected,
    LoadingMedia,
    Buffering,
    Playing,
    Paused,
    Closed,
    Error,
}

/// Handle to the presentation slot a device occupies.
///
/// Allocated by the registry when the device is first inserted and never
/// shared: front ends refer to a row by this slot, not by list position,
/// because positions shift as later devices sort in ahead of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresentationHandle(u64);

impl PresentationHandle {
    pub(crate) fn new(slot: u64) -> Self {
        Self(slot)
    }

    pub fn slot(self) -> u64 {
        self.0
    }
}

/// A device as held by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub(crate) id: DeviceId,
    pub(crate) name: String,
    pub(crate) state: DeviceState,
    pub(crate) handle: PresentationHandle,
}

impl DeviceEntry {
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn handle(&self) -> PresentationHandle {
        self.handle
    }

    /// Detached, serializable copy for consumers outside the owner context.
    pub fn view(&self) -> DeviceView {
        DeviceView {
            id: self.id.clone(),
            name: self.name.clone(),
            state: self.state,
            slot: self.handle.slot(),
        }
    }
}

/// Read-only copy of a registry row, safe to hand to any thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceView {
    pub id: DeviceId,
    pub name: String,
    pub state: DeviceState,
    pub slot: u64,
}

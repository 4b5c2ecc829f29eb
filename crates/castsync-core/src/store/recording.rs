// ── Capture device list ──

use crate::error::CoreError;
use crate::model::RecordingDevice;

/// Capture endpoints offered to the user and the current pick.
#[derive(Debug, Default)]
pub struct RecordingDevices {
    devices: Vec<RecordingDevice>,
    selected: Option<usize>,
}

impl RecordingDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append endpoints not yet listed and select the default among them.
    ///
    /// Only newly appended entries can move the selection; re-announcing a
    /// known endpoint leaves the user's choice alone. Returns whether
    /// anything changed.
    pub fn add(&mut self, devices: &[RecordingDevice], default_id: Option<&str>) -> bool {
        let mut changed = false;
        for device in devices {
            if self.devices.iter().any(|d| d.id == device.id) {
                continue;
            }
            self.devices.push(device.clone());
            changed = true;
            if default_id == Some(device.id.as_str()) {
                self.selected = Some(self.devices.len() - 1);
            }
        }
        changed
    }

    /// Select a listed endpoint by id.
    pub fn select(&mut self, id: &str) -> Result<bool, CoreError> {
        let Some(index) = self.devices.iter().position(|d| d.id == id) else {
            return Err(CoreError::UnknownRecordingDevice { id: id.to_owned() });
        };
        let changed = self.selected != Some(index);
        self.selected = Some(index);
        Ok(changed)
    }

    pub fn selected(&self) -> Option<&RecordingDevice> {
        self.selected.and_then(|i| self.devices.get(i))
    }

    pub fn list(&self) -> &[RecordingDevice] {
        &self.devices
    }
}

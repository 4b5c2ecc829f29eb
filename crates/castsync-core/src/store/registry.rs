// ── Device registry ──
//
// Ordered, identity-keyed collection of every device discovery has told
// us about. Order is by display name under ordinal comparison; equal names
// keep arrival order. Entries are never evicted.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{DeviceEntry, DeviceId, DeviceState, DeviceView, PresentationHandle};

/// Result of [`DeviceRegistry::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    /// A new entry was created at `position`.
    Inserted {
        position: usize,
        handle: PresentationHandle,
        /// Another device already carries the same display name.
        name_collision: bool,
    },
    /// The identity was already known; nothing moved.
    Existing { position: usize },
}

impl Upserted {
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Inserted { .. })
    }

    pub fn position(&self) -> usize {
        match self {
            Self::Inserted { position, .. } | Self::Existing { position } => *position,
        }
    }
}

/// Name-ordered device collection owned by the presentation context.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    entries: IndexMap<DeviceId, DeviceEntry>,
    next_slot: u64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a device the first time its identity is seen.
    ///
    /// The insert position is found by scanning from the front and stopping
    /// at the first entry whose name is ordinally greater, so equal names
    /// stay in arrival order. A known identity is left exactly where it is,
    /// name and state included.
    pub fn upsert(&mut self, id: DeviceId, name: &str, initial: DeviceState) -> Upserted {
        if let Some(position) = self.entries.get_index_of(&id) {
            debug!(device = %id, position, "device already registered");
            return Upserted::Existing { position };
        }

        let position = self.insert_position(name);
        let name_collision = self.entries.values().any(|entry| entry.name == name);
        if name_collision {
            warn!(device = %id, name, "display name already used by another device");
        }

        let handle = PresentationHandle::new(self.next_slot);
        self.next_slot += 1;

        let entry = DeviceEntry {
            id: id.clone(),
            name: name.to_owned(),
            state: initial,
            handle,
        };
        self.entries.shift_insert(position, id, entry);

        Upserted::Inserted {
            position,
            handle,
            name_collision,
        }
    }

    /// Update the state of a known device.
    pub fn set_state(&mut self, id: &DeviceId, state: DeviceState) -> Result<&DeviceEntry, CoreError> {
        let Some(entry) = self.entries.get_mut(id) else {
            return Err(CoreError::UnknownDevice {
                identity: id.clone(),
            });
        };
        entry.state = state;
        Ok(entry)
    }

    pub fn get(&self, id: &DeviceId) -> Option<&DeviceEntry> {
        self.entries.get(id)
    }

    pub fn position_of(&self, id: &DeviceId) -> Option<usize> {
        self.entries.get_index_of(id)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceEntry> {
        self.entries.values()
    }

    /// Detached copies of every entry, in display order.
    pub fn views(&self) -> Vec<DeviceView> {
        self.entries.values().map(DeviceEntry::view).collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn insert_position(&self, name: &str) -> usize {
        self.entries
            .values()
            .position(|entry| entry.name.as_str() > name)
            .unwrap_or(self.entries.len())
    }
}

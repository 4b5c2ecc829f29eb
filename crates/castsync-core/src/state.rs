// ── Owner-context presentation state ──
//
// Everything the presentation surface shows lives here and is only ever
// touched on the owner thread. Each method is one complete transition:
// it mutates, publishes the matching `PresentationEvent`, and forwards to
// collaborators where the transition calls for it.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::collab::{ActionSink, NetworkLayer};
use crate::config::{Preferences, SynchronizerConfig, clamp_lag};
use crate::eligibility::is_sync_eligible;
use crate::error::CoreError;
use crate::event::PresentationEvent;
use crate::log_router::{LogRoute, LogRouter};
use crate::model::{AddressEntry, DeviceId, DeviceState, DeviceView, RecordingDevice};
use crate::store::{AddressTracker, DeviceRegistry, RecordingDevices, RefreshOutcome, Upserted};
use crate::surface::Surface;

/// Point-in-time copy of everything the surface displays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PresentationSnapshot {
    pub devices: Vec<DeviceView>,
    pub sync_eligible: bool,
    pub addresses: Vec<AddressEntry>,
    pub selected_address: Option<IpAddr>,
    pub visible: bool,
    pub log_visible: bool,
    pub keep_alive: Option<String>,
    pub transcript: String,
    pub preferences: Preferences,
    pub recording_devices: Vec<RecordingDevice>,
    pub recording_device: Option<RecordingDevice>,
}

pub(crate) struct PresentationState {
    pub(crate) config: SynchronizerConfig,
    pub(crate) registry: DeviceRegistry,
    pub(crate) addresses: AddressTracker,
    pub(crate) recording: RecordingDevices,
    pub(crate) log: LogRouter,
    pub(crate) surface: Surface,
    pub(crate) preferences: Preferences,
    log_visible: bool,
    network: Arc<dyn NetworkLayer>,
    pub(crate) actions: Arc<dyn ActionSink>,
    events: broadcast::Sender<PresentationEvent>,
}

impl PresentationState {
    pub(crate) fn new(
        config: SynchronizerConfig,
        preferences: Preferences,
        network: Arc<dyn NetworkLayer>,
        actions: Arc<dyn ActionSink>,
        events: broadcast::Sender<PresentationEvent>,
    ) -> Self {
        let mut preferences = preferences;
        preferences.lag_value = clamp_lag(preferences.lag_value);
        Self {
            log: LogRouter::new(config.transcript_limit),
            log_visible: preferences.show_log,
            config,
            registry: DeviceRegistry::new(),
            addresses: AddressTracker::new(),
            recording: RecordingDevices::new(),
            surface: Surface::default(),
            preferences,
            network,
            actions,
            events,
        }
    }

    fn publish(&self, event: PresentationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub(crate) fn snapshot(&self) -> PresentationSnapshot {
        PresentationSnapshot {
            devices: self.registry.views(),
            sync_eligible: self.sync_eligible(),
            addresses: self.addresses.snapshot().to_vec(),
            selected_address: self.addresses.selection(),
            visible: self.surface.is_visible(),
            log_visible: self.log_visible,
            keep_alive: self.log.keep_alive_label(),
            transcript: self.log.transcript().to_owned(),
            preferences: self.preferences.clone(),
            recording_devices: self.recording.list().to_vec(),
            recording_device: self.recording.selected().cloned(),
        }
    }

    pub(crate) fn sync_eligible(&self) -> bool {
        is_sync_eligible(self.registry.count())
    }

    pub(crate) fn log_visible(&self) -> bool {
        self.log_visible
    }

    // ── Devices ──────────────────────────────────────────────────

    pub(crate) fn add_device(&mut self, id: DeviceId, name: &str, initial: DeviceState) -> Upserted {
        let was_eligible = self.sync_eligible();
        let outcome = self.registry.upsert(id.clone(), name, initial);

        if let Upserted::Inserted {
            position,
            name_collision,
            ..
        } = outcome
        {
            debug!(device = %id, name, position, "device registered");
            if let Some(entry) = self.registry.get(&id) {
                self.publish(PresentationEvent::DeviceAdded {
                    device: entry.view(),
                    position,
                    name_collision,
                });
            }
            let eligible = self.sync_eligible();
            if eligible != was_eligible {
                info!(devices = self.registry.count(), "sync eligibility changed");
                self.publish(PresentationEvent::SyncEligibilityChanged { eligible });
            }
        }
        outcome
    }

    pub(crate) fn set_device_state(&mut self, id: &DeviceId, state: DeviceState) -> Result<(), CoreError> {
        let device = self.registry.set_state(id, state)?.view();
        debug!(device = %id, %state, "device state updated");
        self.publish(PresentationEvent::DeviceStateChanged { device });
        Ok(())
    }

    /// Forward a sync request when eligible. Returns whether it was forwarded.
    pub(crate) fn toggle_sync(&self) -> bool {
        if !self.sync_eligible() {
            debug!(devices = self.registry.count(), "sync requested below threshold");
            return false;
        }
        self.actions.sync_devices();
        true
    }

    // ── Addresses ────────────────────────────────────────────────

    /// Reconcile tracked addresses against a fresh enumeration.
    pub(crate) fn refresh_addresses(&mut self, enumerated: &[AddressEntry]) -> RefreshOutcome {
        let previous = self.addresses.selection();
        let network = Arc::clone(&self.network);
        let outcome = self
            .addresses
            .refresh(enumerated, previous, || network.resolve_default_address());

        if outcome.changed() {
            self.publish(PresentationEvent::AddressesChanged {
                snapshot: outcome.snapshot.clone(),
                selection: outcome.selection,
            });
        }
        if outcome.reselected {
            if let Some(address) = outcome.selection {
                info!(%address, "address selection changed");
                self.actions.change_ip_address_used(address);
            }
        }
        outcome
    }

    /// Enumerate through the network layer, then reconcile.
    pub(crate) fn reload_addresses(&mut self) -> Result<RefreshOutcome, CoreError> {
        let enumerated = self.network.enumerate_ipv4()?;
        Ok(self.refresh_addresses(&enumerated))
    }

    pub(crate) fn select_address(&mut self, address: IpAddr) -> Result<(), CoreError> {
        if self.addresses.select(address)? {
            self.publish(PresentationEvent::AddressSelected { address });
        }
        self.actions.change_ip_address_used(address);
        Ok(())
    }

    // ── Log ──────────────────────────────────────────────────────

    pub(crate) fn log(&mut self, message: &str) {
        let now = Local::now();
        match self.log.route(message, now) {
            LogRoute::KeepAlive => {
                if let Some(label) = self.log.keep_alive_label() {
                    self.publish(PresentationEvent::KeepAlive { label, at: now });
                }
            }
            LogRoute::Transcript => self.publish(PresentationEvent::LogAppended {
                message: message.to_owned(),
            }),
        }
    }

    /// Hiding the log is one-way; a later `true` does not bring it back.
    pub(crate) fn show_log(&mut self, visible: bool) {
        if visible || !self.log_visible {
            return;
        }
        self.log_visible = false;
        self.publish(PresentationEvent::LogTabHidden);
    }

    // ── Visibility ───────────────────────────────────────────────

    pub(crate) fn set_window_visibility(&mut self, visible: bool, now: Instant) {
        self.preferences.show_window_on_start = visible;
        if visible {
            if self.surface.show() {
                self.publish(PresentationEvent::VisibilityChanged { visible: true });
            }
        } else {
            self.surface.schedule_hide(now, self.config.hide_delay);
            debug!(delay = ?self.config.hide_delay, "hide scheduled");
        }
    }

    pub(crate) fn toggle_visibility(&mut self) -> bool {
        let visible = self.surface.toggle();
        self.publish(PresentationEvent::VisibilityChanged { visible });
        visible
    }

    pub(crate) fn complete_pending_hide(&mut self, now: Instant) {
        if self.surface.complete_pending_hide(now) {
            debug!("surface hidden");
            self.publish(PresentationEvent::VisibilityChanged { visible: false });
        }
    }

    // ── Preferences ──────────────────────────────────────────────

    fn preferences_changed(&self) {
        self.publish(PresentationEvent::PreferencesChanged {
            preferences: self.preferences.clone(),
        });
    }

    /// Set the lag slider from the host. Does not echo back to the sink.
    pub(crate) fn set_lag_value(&mut self, value: u32) -> u32 {
        let value = clamp_lag(value);
        if self.preferences.lag_value != value {
            self.preferences.lag_value = value;
            self.publish(PresentationEvent::LagValueChanged { value });
        }
        value
    }

    /// The user moved the lag slider.
    pub(crate) fn user_changed_lag(&mut self, value: u32) {
        let value = self.set_lag_value(value);
        self.actions.set_lag_threshold(value);
    }

    pub(crate) fn show_lag_control(&mut self, visible: bool) {
        if self.preferences.show_lag_control != visible {
            self.preferences.show_lag_control = visible;
            self.preferences_changed();
        }
    }

    pub(crate) fn set_auto_restart(&mut self, enabled: bool) {
        if self.preferences.auto_restart != enabled {
            self.preferences.auto_restart = enabled;
            self.preferences_changed();
        }
    }

    pub(crate) fn set_auto_start(&mut self, enabled: bool) {
        if self.preferences.auto_start_devices != enabled {
            self.preferences.auto_start_devices = enabled;
            self.preferences_changed();
        }
    }

    pub(crate) fn set_keyboard_hooks(&mut self, enabled: bool) {
        if self.preferences.use_keyboard_shortcuts != enabled {
            self.preferences.use_keyboard_shortcuts = enabled;
            self.preferences_changed();
        }
    }

    pub(crate) fn user_toggled_auto_restart(&mut self, enabled: bool) {
        self.set_auto_restart(enabled);
        self.actions.on_set_auto_restart(enabled);
    }

    pub(crate) fn user_toggled_keyboard_hooks(&mut self, enabled: bool) {
        self.set_keyboard_hooks(enabled);
        self.actions.on_set_hooks(enabled);
    }

    // ── Recording devices ────────────────────────────────────────

    fn recording_changed(&self) {
        self.publish(PresentationEvent::RecordingDevicesChanged {
            devices: self.recording.list().to_vec(),
            selected: self.recording.selected().cloned(),
        });
    }

    pub(crate) fn add_recording_devices(&mut self, devices: &[RecordingDevice], default_id: Option<&str>) {
        if self.recording.add(devices, default_id) {
            self.recording_changed();
        }
    }

    pub(crate) fn select_recording_device(&mut self, id: &str) -> Result<(), CoreError> {
        let changed = self.recording.select(id)?;
        if changed {
            self.recording_changed();
        }
        if let Some(device) = self.recording.selected() {
            self.actions.recording_device_changed(device);
        }
        Ok(())
    }
}

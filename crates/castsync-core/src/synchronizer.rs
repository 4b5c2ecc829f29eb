// ── Presentation synchronizer ──
//
// Lifecycle owner and the single entry point for discovery, the network
// layer, and user actions. Everything that touches presentation state is
// routed through the affinity gate; the synchronizer itself only decides
// whether an operation is admitted.

use std::net::IpAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collab::{ActionSink, NetworkLayer};
use crate::config::{Preferences, SynchronizerConfig};
use crate::error::{CoreError, absorb_teardown};
use crate::event::{PresentationEvent, SyncEvent};
use crate::gate::AffinityGate;
use crate::model::{AddressEntry, DeviceId, DeviceState, DeviceView, RecordingDevice};
use crate::state::{PresentationSnapshot, PresentationState};
use crate::store::{RefreshOutcome, Upserted};
use crate::stream::EventStream;

// ── Lifecycle ────────────────────────────────────────────────────

/// Where the synchronizer is in its one-way lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Lifecycle {
    Uninitialized,
    Active,
    Terminated,
}

// ── Synchronizer ─────────────────────────────────────────────────

/// Entry point for every producer of presentation changes.
///
/// Cheaply cloneable via `Arc<SynchronizerInner>`. Operations submitted
/// before [`start()`](Self::start) are rejected with
/// [`CoreError::LifecycleViolation`]; operations after
/// [`shutdown()`](Self::shutdown) are silent no-ops.
#[derive(Clone)]
pub struct Synchronizer {
    inner: Arc<SynchronizerInner>,
}

struct SynchronizerInner {
    config: SynchronizerConfig,
    preferences: Preferences,
    network: Arc<dyn NetworkLayer>,
    actions: Arc<dyn ActionSink>,
    lifecycle: watch::Sender<Lifecycle>,
    event_tx: broadcast::Sender<PresentationEvent>,
    gate: OnceLock<AffinityGate>,
    cancel: CancellationToken,
    owner_thread: Mutex<Option<std::thread::JoinHandle<()>>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Synchronizer {
    /// Create a synchronizer. Does NOT start the owner context --
    /// call [`start()`](Self::start) first.
    pub fn new(
        config: SynchronizerConfig,
        preferences: Preferences,
        network: Arc<dyn NetworkLayer>,
        actions: Arc<dyn ActionSink>,
    ) -> Self {
        let (lifecycle, _) = watch::channel(Lifecycle::Uninitialized);
        let (event_tx, _) = broadcast::channel(config.event_channel_size.max(1));

        Self {
            inner: Arc::new(SynchronizerInner {
                config,
                preferences,
                network,
                actions,
                lifecycle,
                event_tx,
                gate: OnceLock::new(),
                cancel: CancellationToken::new(),
                owner_thread: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SynchronizerConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        *self.inner.lifecycle.borrow()
    }

    /// Subscribe to lifecycle changes.
    pub fn lifecycle_changes(&self) -> watch::Receiver<Lifecycle> {
        self.inner.lifecycle.subscribe()
    }

    /// Subscribe to presentation events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.inner.event_tx.subscribe())
    }

    /// Start the owner context.
    ///
    /// Spawns the owner thread, performs the initial address load, and
    /// starts the address watcher. Only valid from `Uninitialized`.
    pub async fn start(&self) -> Result<(), CoreError> {
        let current = self.lifecycle();
        if current != Lifecycle::Uninitialized {
            return Err(CoreError::LifecycleViolation {
                operation: "start",
                state: current,
            });
        }

        let state = PresentationState::new(
            self.inner.config.clone(),
            self.inner.preferences.clone(),
            Arc::clone(&self.inner.network),
            Arc::clone(&self.inner.actions),
            self.inner.event_tx.clone(),
        );
        let gate_cancel = self.inner.cancel.child_token();
        let (gate, owner) = AffinityGate::spawn(state, gate_cancel.clone())?;
        if self.inner.gate.set(gate).is_err() {
            gate_cancel.cancel();
            return Err(CoreError::LifecycleViolation {
                operation: "start",
                state: self.lifecycle(),
            });
        }
        *self.inner.owner_thread.lock().await = Some(owner);

        // Initial address load
        if let Some(gate) = self.inner.gate.get() {
            match gate.call(PresentationState::reload_addresses).await {
                Ok(Ok(outcome)) => {
                    debug!(addresses = outcome.snapshot.len(), selection = ?outcome.selection, "initial address load");
                }
                Ok(Err(e)) | Err(e) => warn!(error = %e, "initial address load failed"),
            }
        }

        let activated = self.inner.lifecycle.send_if_modified(|state| {
            if *state == Lifecycle::Uninitialized {
                *state = Lifecycle::Active;
                true
            } else {
                false
            }
        });
        if !activated {
            // Shut down while starting.
            return Err(CoreError::LifecycleViolation {
                operation: "start",
                state: self.lifecycle(),
            });
        }

        let interval = self.inner.config.address_poll_interval;
        if !interval.is_zero() {
            let sync = self.clone();
            let cancel = self.inner.cancel.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(address_watch_task(sync, interval, cancel)));
        }

        let _ = self.inner.event_tx.send(PresentationEvent::LifecycleChanged {
            lifecycle: Lifecycle::Active,
        });
        info!("presentation synchronizer active");
        Ok(())
    }

    /// Tear down the owner context.
    ///
    /// Idempotent. Forwards `close_application` once, cancels the owner loop
    /// and background tasks, and waits for them to finish. Operations
    /// accepted before this call still run; later ones are no-ops.
    pub async fn shutdown(&self) {
        let previous = self.inner.lifecycle.send_replace(Lifecycle::Terminated);
        if previous == Lifecycle::Terminated {
            return;
        }
        if previous == Lifecycle::Active {
            // Queued behind work accepted before teardown.
            let queued = self
                .inner
                .gate
                .get()
                .is_some_and(|gate| gate.post(|s| s.actions.close_application()).is_ok());
            if !queued {
                self.inner.actions.close_application();
            }
        }
        let _ = self.inner.event_tx.send(PresentationEvent::LifecycleChanged {
            lifecycle: Lifecycle::Terminated,
        });

        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        if let Some(owner) = self.inner.owner_thread.lock().await.take() {
            if let Ok(Err(_)) = tokio::task::spawn_blocking(move || owner.join()).await {
                warn!("owner thread panicked during teardown");
            }
        }
        info!("presentation synchronizer terminated");
    }

    // ── Admission ────────────────────────────────────────────────

    /// `Ok(None)` means the operation is absorbed as a teardown no-op.
    fn admit(&self, operation: &'static str) -> Result<Option<&AffinityGate>, CoreError> {
        match self.lifecycle() {
            Lifecycle::Active => Ok(self.inner.gate.get()),
            Lifecycle::Terminated => {
                debug!(operation, "ignored after teardown");
                Ok(None)
            }
            state @ Lifecycle::Uninitialized => {
                warn!(operation, "rejected before start");
                Err(CoreError::LifecycleViolation { operation, state })
            }
        }
    }

    fn post<F>(&self, operation: &'static str, op: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut PresentationState) + Send + 'static,
    {
        let Some(gate) = self.admit(operation)? else {
            return Ok(());
        };
        absorb_teardown(gate.post(op), ())
    }

    async fn call<F, R>(&self, operation: &'static str, fallback: R, op: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut PresentationState) -> R + Send + 'static,
        R: Send + 'static,
    {
        let Some(gate) = self.admit(operation)? else {
            return Ok(fallback);
        };
        absorb_teardown(gate.call(op).await, fallback)
    }

    fn call_blocking<F, R>(&self, operation: &'static str, fallback: R, op: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut PresentationState) -> R + Send + 'static,
        R: Send + 'static,
    {
        let Some(gate) = self.admit(operation)? else {
            return Ok(fallback);
        };
        absorb_teardown(gate.call_blocking(op), fallback)
    }

    // ── Inbound events ───────────────────────────────────────────

    /// Dispatch one inbound event.
    pub async fn handle(&self, event: SyncEvent) -> Result<(), CoreError> {
        match event {
            SyncEvent::DeviceDiscovered { id, name, state } => self.add_device(id, name, state),
            SyncEvent::DeviceStateChanged { id, state } => self.device_state_changed(id, state),
            SyncEvent::NetworkAddressesChanged { addresses } => {
                self.network_addresses_changed(addresses)
            }
            SyncEvent::UserSelectedAddress { address } => self.user_selected_address(address).await,
            SyncEvent::UserToggledSync => self.user_toggled_sync().await.map(|_| ()),
            SyncEvent::Log { message } => {
                self.log(message);
                Ok(())
            }
        }
    }

    /// A newly discovered device, in its initial state.
    pub fn device_discovered(&self, id: DeviceId, name: impl Into<String>) -> Result<(), CoreError> {
        self.add_device(id, name, DeviceState::default())
    }

    /// Register a device. Re-announcing a known identity changes nothing.
    pub fn add_device(
        &self,
        id: DeviceId,
        name: impl Into<String>,
        state: DeviceState,
    ) -> Result<(), CoreError> {
        let name = name.into();
        self.post("add_device", move |s| {
            s.add_device(id, &name, state);
        })
    }

    /// Register a device and report where it landed.
    ///
    /// Returns `None` after teardown.
    pub async fn upsert_device(
        &self,
        id: DeviceId,
        name: impl Into<String>,
        state: DeviceState,
    ) -> Result<Option<Upserted>, CoreError> {
        let name = name.into();
        self.call("upsert_device", None, move |s| Some(s.add_device(id, &name, state)))
            .await
    }

    /// A device reported a new state. Unknown identities are logged and ignored.
    pub fn device_state_changed(&self, id: DeviceId, state: DeviceState) -> Result<(), CoreError> {
        self.post("device_state_changed", move |s| {
            if let Err(e) = s.set_device_state(&id, state) {
                warn!(error = %e, "device state change ignored");
            }
        })
    }

    /// Like [`device_state_changed`](Self::device_state_changed) but reports
    /// [`CoreError::UnknownDevice`] to the caller.
    pub async fn set_device_state(&self, id: DeviceId, state: DeviceState) -> Result<(), CoreError> {
        self.call("set_device_state", Ok(()), move |s| s.set_device_state(&id, state))
            .await?
    }

    /// The network layer reported a fresh enumeration.
    pub fn network_addresses_changed(&self, enumerated: Vec<AddressEntry>) -> Result<(), CoreError> {
        self.post("network_addresses_changed", move |s| {
            s.refresh_addresses(&enumerated);
        })
    }

    /// Reconcile against `enumerated` and return the resulting snapshot.
    pub async fn refresh_addresses(&self, enumerated: Vec<AddressEntry>) -> Result<RefreshOutcome, CoreError> {
        self.call("refresh_addresses", RefreshOutcome::default(), move |s| {
            s.refresh_addresses(&enumerated)
        })
        .await
    }

    /// Re-enumerate local IPv4 addresses and reconcile.
    ///
    /// Enumeration runs on the calling context; a failure leaves the
    /// tracked snapshot untouched.
    pub fn add_ip4_addresses(&self) -> Result<(), CoreError> {
        if self.admit("add_ip4_addresses")?.is_none() {
            return Ok(());
        }
        let enumerated = self.inner.network.enumerate_ipv4().inspect_err(|e| {
            warn!(error = %e, "address enumeration failed");
        })?;
        self.network_addresses_changed(enumerated)
    }

    /// The user picked an address from the list.
    pub async fn user_selected_address(&self, address: IpAddr) -> Result<(), CoreError> {
        self.call("user_selected_address", Ok(()), move |s| s.select_address(address))
            .await?
    }

    /// The user asked to synchronize playback. Returns whether the request
    /// was forwarded; fewer than two devices is a silent no-op.
    pub async fn user_toggled_sync(&self) -> Result<bool, CoreError> {
        self.call("user_toggled_sync", false, |s| s.toggle_sync()).await
    }

    /// Route one log line. Keep-alives update the indicator, everything
    /// else is appended to the transcript. Never fails.
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        if let Err(e) = self.post("log", move |s| s.log(&message)) {
            debug!(error = %e, "log line dropped");
        }
    }

    // ── Surface ──────────────────────────────────────────────────

    /// Show now, or hide after the configured delay. A show arriving
    /// before the delay elapses cancels the hide.
    pub fn set_window_visibility(&self, visible: bool) -> Result<(), CoreError> {
        self.post("set_window_visibility", move |s| {
            s.set_window_visibility(visible, Instant::now());
        })
    }

    /// Flip visibility immediately.
    pub fn toggle_visibility(&self) -> Result<(), CoreError> {
        self.post("toggle_visibility", |s| {
            s.toggle_visibility();
        })
    }

    /// Hide the log tab. One-way: `true` never brings it back.
    pub fn show_log(&self, visible: bool) -> Result<(), CoreError> {
        self.post("show_log", move |s| s.show_log(visible))
    }

    pub fn show_lag_control(&self, visible: bool) -> Result<(), CoreError> {
        self.post("show_lag_control", move |s| s.show_lag_control(visible))
    }

    // ── Preferences ──────────────────────────────────────────────

    /// Set the lag slider, clamped into range.
    pub fn set_lag_value(&self, value: u32) -> Result<(), CoreError> {
        self.post("set_lag_value", move |s| {
            s.set_lag_value(value);
        })
    }

    pub fn set_auto_restart(&self, enabled: bool) -> Result<(), CoreError> {
        self.post("set_auto_restart", move |s| s.set_auto_restart(enabled))
    }

    pub fn set_auto_start(&self, enabled: bool) -> Result<(), CoreError> {
        self.post("set_auto_start", move |s| s.set_auto_start(enabled))
    }

    pub fn set_keyboard_hooks(&self, enabled: bool) -> Result<(), CoreError> {
        self.post("set_keyboard_hooks", move |s| s.set_keyboard_hooks(enabled))
    }

    // ── Recording devices ────────────────────────────────────────

    pub fn add_recording_devices(
        &self,
        devices: Vec<RecordingDevice>,
        default_id: Option<String>,
    ) -> Result<(), CoreError> {
        self.post("add_recording_devices", move |s| {
            s.add_recording_devices(&devices, default_id.as_deref());
        })
    }

    // ── User actions ─────────────────────────────────────────────

    pub fn user_changed_lag(&self, value: u32) -> Result<(), CoreError> {
        self.post("user_changed_lag", move |s| s.user_changed_lag(value))
    }

    pub fn user_toggled_auto_restart(&self, enabled: bool) -> Result<(), CoreError> {
        self.post("user_toggled_auto_restart", move |s| {
            s.user_toggled_auto_restart(enabled);
        })
    }

    pub fn user_toggled_keyboard_hooks(&self, enabled: bool) -> Result<(), CoreError> {
        self.post("user_toggled_keyboard_hooks", move |s| {
            s.user_toggled_keyboard_hooks(enabled);
        })
    }

    pub async fn user_selected_recording_device(&self, id: impl Into<String>) -> Result<(), CoreError> {
        let id = id.into();
        self.call("user_selected_recording_device", Ok(()), move |s| {
            s.select_recording_device(&id)
        })
        .await?
    }

    pub fn volume_up(&self) -> Result<(), CoreError> {
        self.post("volume_up", |s| s.actions.volume_up())
    }

    pub fn volume_down(&self) -> Result<(), CoreError> {
        self.post("volume_down", |s| s.actions.volume_down())
    }

    pub fn volume_mute(&self) -> Result<(), CoreError> {
        self.post("volume_mute", |s| s.actions.volume_mute())
    }

    pub fn scan_for_devices(&self) -> Result<(), CoreError> {
        self.post("scan_for_devices", |s| s.actions.scan_for_devices())
    }

    pub fn reset_settings(&self) -> Result<(), CoreError> {
        self.post("reset_settings", |s| s.actions.reset_settings())
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Everything the surface shows, in one consistent read.
    pub async fn snapshot(&self) -> Result<PresentationSnapshot, CoreError> {
        self.call("snapshot", PresentationSnapshot::default(), |s| s.snapshot())
            .await
    }

    /// Blocking variant of [`snapshot()`](Self::snapshot) for non-async
    /// callers. Must not be used from inside a runtime worker.
    pub fn snapshot_blocking(&self) -> Result<PresentationSnapshot, CoreError> {
        self.call_blocking("snapshot", PresentationSnapshot::default(), |s| s.snapshot())
    }

    /// Devices in display order.
    pub async fn devices(&self) -> Result<Vec<DeviceView>, CoreError> {
        self.call("devices", Vec::new(), |s| s.registry.views()).await
    }

    pub async fn device_count(&self) -> Result<usize, CoreError> {
        self.call("device_count", 0, |s| s.registry.count()).await
    }

    pub async fn is_sync_eligible(&self) -> Result<bool, CoreError> {
        self.call("is_sync_eligible", false, |s| s.sync_eligible()).await
    }

    pub async fn addresses(&self) -> Result<Vec<AddressEntry>, CoreError> {
        self.call("addresses", Vec::new(), |s| s.addresses.snapshot().to_vec())
            .await
    }

    pub async fn selected_address(&self) -> Result<Option<IpAddr>, CoreError> {
        self.call("selected_address", None, |s| s.addresses.selection())
            .await
    }

    pub async fn transcript(&self) -> Result<String, CoreError> {
        self.call("transcript", String::new(), |s| s.log.transcript().to_owned())
            .await
    }

    pub async fn keep_alive_label(&self) -> Result<Option<String>, CoreError> {
        self.call("keep_alive_label", None, |s| s.log.keep_alive_label())
            .await
    }

    pub async fn is_visible(&self) -> Result<bool, CoreError> {
        self.call("is_visible", false, |s| s.surface.is_visible()).await
    }

    pub async fn is_log_visible(&self) -> Result<bool, CoreError> {
        self.call("is_log_visible", false, |s| s.log_visible()).await
    }

    pub async fn preferences(&self) -> Result<Preferences, CoreError> {
        let fallback = self.inner.preferences.clone();
        self.call("preferences", fallback, |s| s.preferences.clone())
            .await
    }

    pub async fn lag_value(&self) -> Result<u32, CoreError> {
        Ok(self.preferences().await?.lag_value)
    }

    pub async fn show_window_on_start(&self) -> Result<bool, CoreError> {
        Ok(self.preferences().await?.show_window_on_start)
    }

    pub async fn auto_restart(&self) -> Result<bool, CoreError> {
        Ok(self.preferences().await?.auto_restart)
    }

    pub async fn auto_start_devices(&self) -> Result<bool, CoreError> {
        Ok(self.preferences().await?.auto_start_devices)
    }

    pub async fn use_keyboard_shortcuts(&self) -> Result<bool, CoreError> {
        Ok(self.preferences().await?.use_keyboard_shortcuts)
    }

    pub async fn recording_device(&self) -> Result<Option<RecordingDevice>, CoreError> {
        self.call("recording_device", None, |s| s.recording.selected().cloned())
            .await
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically re-enumerate local addresses.
async fn address_watch_task(sync: Synchronizer, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = sync.add_ip4_addresses() {
                    debug!(error = %e, "address poll skipped");
                }
            }
        }
    }
    debug!("address watcher stopped");
}

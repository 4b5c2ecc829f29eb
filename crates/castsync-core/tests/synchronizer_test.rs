#![allow(clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use castsync_core::{
    ActionSink, AddressEntry, CoreError, DeviceId, DeviceState, Lifecycle, NetworkLayer,
    PresentationEvent, Preferences, RecordingDevice, SyncEvent, Synchronizer, SynchronizerConfig,
};
use pretty_assertions::assert_eq;

// ── Fakes ────────────────────────────────────────────────────────

struct FakeNetwork {
    addresses: Mutex<Vec<AddressEntry>>,
    default: Mutex<Option<IpAddr>>,
    fail: Mutex<bool>,
}

impl FakeNetwork {
    fn new(addresses: Vec<AddressEntry>, default: Option<IpAddr>) -> Arc<Self> {
        Arc::new(Self {
            addresses: Mutex::new(addresses),
            default: Mutex::new(default),
            fail: Mutex::new(false),
        })
    }
}

impl NetworkLayer for FakeNetwork {
    fn enumerate_ipv4(&self) -> Result<Vec<AddressEntry>, CoreError> {
        if *self.fail.lock().unwrap() {
            return Err(CoreError::NetworkEnumeration {
                reason: "adapter query failed".into(),
            });
        }
        Ok(self.addresses.lock().unwrap().clone())
    }

    fn resolve_default_address(&self) -> Option<IpAddr> {
        *self.default.lock().unwrap()
    }
}

#[derive(Default)]
struct RecordingActions {
    calls: Mutex<Vec<String>>,
    /// How long `volume_up` keeps the owner busy.
    volume_delay: Duration,
}

impl RecordingActions {
    fn with_volume_delay(volume_delay: Duration) -> Self {
        Self {
            volume_delay,
            ..Self::default()
        }
    }

    fn push(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ActionSink for RecordingActions {
    fn change_ip_address_used(&self, address: IpAddr) {
        self.push(format!("change_ip:{address}"));
    }
    fn set_lag_threshold(&self, value: u32) {
        self.push(format!("lag:{value}"));
    }
    fn on_set_hooks(&self, enabled: bool) {
        self.push(format!("hooks:{enabled}"));
    }
    fn recording_device_changed(&self, device: &RecordingDevice) {
        self.push(format!("recording:{}", device.id));
    }
    fn close_application(&self) {
        self.push("close");
    }
    fn volume_up(&self) {
        std::thread::sleep(self.volume_delay);
        self.push("volume_up");
    }
    fn volume_down(&self) {
        self.push("volume_down");
    }
    fn sync_devices(&self) {
        self.push("sync");
    }
}

fn ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
}

fn entry(last: u8) -> AddressEntry {
    AddressEntry::new(ip(last), "eth0")
}

fn test_config() -> SynchronizerConfig {
    SynchronizerConfig {
        hide_delay: Duration::from_millis(50),
        address_poll_interval: Duration::ZERO,
        ..SynchronizerConfig::default()
    }
}

async fn started(
    network: Arc<FakeNetwork>,
) -> (Synchronizer, Arc<RecordingActions>) {
    let actions = Arc::new(RecordingActions::default());
    let sync = started_with(test_config(), network, actions.clone()).await;
    (sync, actions)
}

async fn started_with(
    config: SynchronizerConfig,
    network: Arc<FakeNetwork>,
    actions: Arc<RecordingActions>,
) -> Synchronizer {
    let sync = Synchronizer::new(config, Preferences::default(), network, actions);
    sync.start().await.unwrap();
    sync
}

/// Owner kept busy by a slow `volume_up` well past a short call timeout.
fn busy_owner() -> (SynchronizerConfig, Arc<RecordingActions>) {
    let config = SynchronizerConfig {
        call_timeout: Duration::from_millis(100),
        ..test_config()
    };
    let actions = Arc::new(RecordingActions::with_volume_delay(Duration::from_millis(600)));
    (config, actions)
}

// ── Registry ─────────────────────────────────────────────────────

#[tokio::test]
async fn devices_are_listed_in_name_order() {
    let (sync, _) = started(FakeNetwork::new(Vec::new(), None)).await;
    sync.device_discovered(DeviceId::from("d1"), "Zeta").unwrap();
    sync.device_discovered(DeviceId::from("d2"), "Alpha").unwrap();

    let names: Vec<String> = sync.devices().await.unwrap().into_iter().map(|d| d.name).collect();
    assert_eq!(names, vec!["Alpha", "Zeta"]);
    sync.shutdown().await;
}

#[tokio::test]
async fn rediscovery_keeps_position_and_name() {
    let (sync, _) = started(FakeNetwork::new(Vec::new(), None)).await;
    sync.device_discovered(DeviceId::from("d1"), "Mu").unwrap();
    sync.device_discovered(DeviceId::from("d2"), "Alpha").unwrap();
    let again = sync
        .upsert_device(DeviceId::from("d1"), "Zz renamed", DeviceState::Playing)
        .await
        .unwrap()
        .unwrap();

    assert!(!again.is_new());
    assert_eq!(again.position(), 1);
    let devices = sync.devices().await.unwrap();
    assert_eq!(devices[1].name, "Mu");
    assert_eq!(devices[1].state, DeviceState::NotConnected);
    sync.shutdown().await;
}

#[tokio::test]
async fn state_change_for_unknown_device_is_reported() {
    let (sync, _) = started(FakeNetwork::new(Vec::new(), None)).await;
    let err = sync
        .set_device_state(DeviceId::from("ghost"), DeviceState::Playing)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::UnknownDevice { .. }));

    // The fire-and-forget form only logs.
    sync.device_state_changed(DeviceId::from("ghost"), DeviceState::Playing)
        .unwrap();
    assert_eq!(sync.device_count().await.unwrap(), 0);
    sync.shutdown().await;
}

// ── Sync eligibility ─────────────────────────────────────────────

#[tokio::test]
async fn second_device_makes_sync_eligible() {
    let (sync, actions) = started(FakeNetwork::new(Vec::new(), None)).await;
    sync.device_discovered(DeviceId::from("d1"), "Kitchen").unwrap();
    assert!(!sync.is_sync_eligible().await.unwrap());
    assert!(!sync.user_toggled_sync().await.unwrap());

    sync.device_discovered(DeviceId::from("d2"), "Office").unwrap();
    assert!(sync.is_sync_eligible().await.unwrap());
    assert!(sync.user_toggled_sync().await.unwrap());

    assert_eq!(actions.calls().iter().filter(|c| *c == "sync").count(), 1);
    sync.shutdown().await;
}

// ── Addresses ────────────────────────────────────────────────────

#[tokio::test]
async fn start_loads_addresses_and_forwards_selection() {
    let (sync, actions) = started(FakeNetwork::new(vec![entry(2), entry(3)], Some(ip(3)))).await;
    assert_eq!(sync.selected_address().await.unwrap(), Some(ip(3)));
    assert_eq!(sync.addresses().await.unwrap().len(), 2);
    assert!(actions.calls().contains(&"change_ip:10.0.0.3".to_owned()));
    sync.shutdown().await;
}

#[tokio::test]
async fn stale_selection_is_replaced_by_default() {
    let network = FakeNetwork::new(vec![entry(2)], Some(ip(2)));
    let (sync, actions) = started(network.clone()).await;
    assert_eq!(sync.selected_address().await.unwrap(), Some(ip(2)));

    *network.default.lock().unwrap() = Some(ip(5));
    let outcome = sync.refresh_addresses(vec![entry(5)]).await.unwrap();

    assert_eq!(outcome.snapshot, vec![entry(5)]);
    assert_eq!(outcome.selection, Some(ip(5)));
    assert_eq!(outcome.removed, vec![ip(2)]);
    assert_eq!(
        actions.calls(),
        vec!["change_ip:10.0.0.2".to_owned(), "change_ip:10.0.0.5".to_owned()]
    );
    sync.shutdown().await;
}

#[tokio::test]
async fn repeated_refresh_is_idempotent() {
    let (sync, _) = started(FakeNetwork::new(Vec::new(), Some(ip(2)))).await;
    let first = sync.refresh_addresses(vec![entry(2), entry(7)]).await.unwrap();
    let second = sync.refresh_addresses(vec![entry(2), entry(7)]).await.unwrap();
    assert_eq!(first.snapshot, second.snapshot);
    assert_eq!(first.selection, second.selection);
    assert!(!second.changed());
    sync.shutdown().await;
}

#[tokio::test]
async fn failed_enumeration_leaves_snapshot() {
    let network = FakeNetwork::new(vec![entry(2)], Some(ip(2)));
    let (sync, _) = started(network.clone()).await;
    *network.fail.lock().unwrap() = true;

    let err = sync.add_ip4_addresses().unwrap_err();
    assert!(matches!(err, CoreError::NetworkEnumeration { .. }));
    assert_eq!(sync.addresses().await.unwrap(), vec![entry(2)]);
    sync.shutdown().await;
}

#[tokio::test]
async fn selecting_untracked_address_fails() {
    let (sync, actions) = started(FakeNetwork::new(vec![entry(2), entry(3)], Some(ip(2)))).await;
    let err = sync.user_selected_address(ip(9)).await.unwrap_err();
    assert!(matches!(err, CoreError::AddressNotTracked { .. }));

    sync.user_selected_address(ip(3)).await.unwrap();
    assert_eq!(sync.selected_address().await.unwrap(), Some(ip(3)));
    assert_eq!(actions.calls().last().unwrap(), "change_ip:10.0.0.3");
    sync.shutdown().await;
}

// ── Log routing ──────────────────────────────────────────────────

#[tokio::test]
async fn keep_alives_skip_the_transcript() {
    let (sync, _) = started(FakeNetwork::new(Vec::new(), None)).await;
    sync.log(r#"{"type":"PING"}"#);
    sync.log("hello");

    assert_eq!(sync.transcript().await.unwrap(), "hello\n\n");
    let label = sync.keep_alive_label().await.unwrap().unwrap();
    assert!(label.starts_with("Latest keep-alive message:"));
    sync.shutdown().await;
}

#[tokio::test]
async fn inbound_events_dispatch() {
    let (sync, _) = started(FakeNetwork::new(Vec::new(), None)).await;
    let lines = [
        r#"{"type":"device_discovered","id":"d1","name":"Kitchen"}"#,
        r#"{"type":"device_state_changed","id":"d1","state":"playing"}"#,
        r#"{"type":"log","message":"connected"}"#,
    ];
    for line in lines {
        let event: SyncEvent = serde_json::from_str(line).unwrap();
        sync.handle(event).await.unwrap();
    }
    let snapshot = sync.snapshot().await.unwrap();
    assert_eq!(snapshot.devices[0].state, DeviceState::Playing);
    assert_eq!(snapshot.transcript, "connected\n\n");
    sync.shutdown().await;
}

// ── Surface ──────────────────────────────────────────────────────

#[tokio::test]
async fn show_before_delay_cancels_hide() {
    let (sync, _) = started(FakeNetwork::new(Vec::new(), None)).await;
    sync.set_window_visibility(false).unwrap();
    sync.set_window_visibility(true).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(sync.is_visible().await.unwrap());
    sync.shutdown().await;
}

#[tokio::test]
async fn hide_applies_after_delay() {
    let (sync, _) = started(FakeNetwork::new(Vec::new(), None)).await;
    sync.set_window_visibility(false).unwrap();
    assert!(sync.is_visible().await.unwrap());
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!sync.is_visible().await.unwrap());
    assert!(!sync.show_window_on_start().await.unwrap());
    sync.shutdown().await;
}

#[tokio::test]
async fn log_tab_stays_hidden() {
    let (sync, _) = started(FakeNetwork::new(Vec::new(), None)).await;
    sync.show_log(false).unwrap();
    sync.show_log(true).unwrap();
    assert!(!sync.is_log_visible().await.unwrap());
    sync.shutdown().await;
}

// ── Preferences and actions ──────────────────────────────────────

#[tokio::test]
async fn user_actions_are_forwarded() {
    let (sync, actions) = started(FakeNetwork::new(Vec::new(), None)).await;
    sync.add_recording_devices(
        vec![RecordingDevice::new("mic", "Mic"), RecordingDevice::new("line", "Line in")],
        Some("mic".into()),
    )
    .unwrap();
    sync.user_selected_recording_device("line").await.unwrap();
    sync.user_changed_lag(2500).unwrap();
    sync.user_toggled_keyboard_hooks(true).unwrap();
    sync.volume_up().unwrap();

    assert_eq!(sync.recording_device().await.unwrap().unwrap().id, "line");
    assert_eq!(sync.lag_value().await.unwrap(), 2500);
    assert!(sync.use_keyboard_shortcuts().await.unwrap());
    assert_eq!(
        actions.calls(),
        vec!["recording:line", "lag:2500", "hooks:true", "volume_up"]
    );
    sync.shutdown().await;
}

#[tokio::test]
async fn host_settings_do_not_echo() {
    let (sync, actions) = started(FakeNetwork::new(Vec::new(), None)).await;
    sync.set_lag_value(99_999).unwrap();
    sync.set_auto_start(true).unwrap();
    sync.set_auto_restart(true).unwrap();
    sync.show_lag_control(false).unwrap();

    let prefs = sync.preferences().await.unwrap();
    assert_eq!(prefs.lag_value, castsync_core::LAG_MAX);
    assert!(prefs.auto_start_devices);
    assert!(prefs.auto_restart);
    assert!(!prefs.show_lag_control);
    assert!(actions.calls().is_empty());
    sync.shutdown().await;
}

// ── Lifecycle ────────────────────────────────────────────────────

#[tokio::test]
async fn operations_before_start_violate_lifecycle() {
    let sync = Synchronizer::new(
        test_config(),
        Preferences::default(),
        FakeNetwork::new(Vec::new(), None),
        Arc::new(RecordingActions::default()),
    );
    let err = sync.devices().await.unwrap_err();
    assert!(matches!(err, CoreError::LifecycleViolation { .. }));
}

#[tokio::test]
async fn operations_after_shutdown_are_silent() {
    let (sync, actions) = started(FakeNetwork::new(Vec::new(), None)).await;
    sync.device_discovered(DeviceId::from("d1"), "Kitchen").unwrap();
    sync.shutdown().await;
    sync.shutdown().await;

    assert_eq!(sync.lifecycle(), Lifecycle::Terminated);
    sync.device_discovered(DeviceId::from("d2"), "Office").unwrap();
    sync.log("late line");
    sync.set_window_visibility(false).unwrap();
    assert_eq!(sync.device_count().await.unwrap(), 0);
    assert!(sync.user_selected_address(ip(1)).await.is_ok());
    assert_eq!(actions.calls().iter().filter(|c| *c == "close").count(), 1);
}

#[tokio::test]
async fn events_follow_transitions() {
    let (sync, _) = started(FakeNetwork::new(Vec::new(), None)).await;
    let mut events = sync.events();
    sync.device_discovered(DeviceId::from("d1"), "Kitchen").unwrap();
    sync.device_discovered(DeviceId::from("d2"), "Attic").unwrap();

    let mut seen = Vec::new();
    while seen.len() < 3 {
        seen.push(events.next_event().await.unwrap());
    }
    assert!(matches!(
        seen[1],
        PresentationEvent::DeviceAdded { position: 0, .. }
    ));
    assert_eq!(
        seen[2],
        PresentationEvent::SyncEligibilityChanged { eligible: true }
    );
    sync.shutdown().await;
}

// ── Owner context ────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_read_is_bounded_by_call_timeout() {
    let (config, actions) = busy_owner();
    let sync = started_with(config, FakeNetwork::new(Vec::new(), None), actions).await;
    sync.volume_up().unwrap();

    let reader = sync.clone();
    let (result, waited) = tokio::task::spawn_blocking(move || {
        let began = std::time::Instant::now();
        let result = reader.snapshot_blocking();
        (result, began.elapsed())
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(CoreError::Timeout { timeout_ms: 100 })));
    assert!(waited < Duration::from_millis(500), "waited {waited:?}");
    sync.shutdown().await;
}

#[tokio::test]
async fn timed_out_selection_is_never_applied() {
    let (config, actions) = busy_owner();
    let network = FakeNetwork::new(vec![entry(2), entry(3)], Some(ip(2)));
    let sync = started_with(config, network, actions.clone()).await;
    sync.volume_up().unwrap();

    let err = sync.user_selected_address(ip(3)).await.unwrap_err();
    assert!(matches!(err, CoreError::Timeout { .. }));

    // Let the owner work through its queue.
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(sync.selected_address().await.unwrap(), Some(ip(2)));
    assert!(!actions.calls().contains(&"change_ip:10.0.0.3".to_owned()));
    sync.shutdown().await;
}

#[tokio::test]
async fn work_accepted_before_shutdown_still_runs() {
    let actions = Arc::new(RecordingActions::with_volume_delay(Duration::from_millis(200)));
    let sync = started_with(test_config(), FakeNetwork::new(Vec::new(), None), actions.clone()).await;

    sync.volume_up().unwrap();
    sync.volume_down().unwrap();
    sync.shutdown().await;

    assert_eq!(actions.calls(), vec!["volume_up", "volume_down", "close"]);
    sync.volume_down().unwrap();
    assert_eq!(actions.calls().len(), 3);
}
